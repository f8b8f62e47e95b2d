use governor_core::config::{ConfigError, ConfigProperties, ConfigValue, GovernorConfig, PropertyMeta};

#[test]
fn empty_config_missing_key_errors() {
    let config = GovernorConfig::empty();
    assert!(config.get::<String>("nonexistent").is_err());
}

#[test]
fn set_and_get_roundtrip() {
    let mut config = GovernorConfig::empty();
    config.set("app.name", ConfigValue::String("governor".into()));
    assert_eq!(config.get::<String>("app.name").unwrap(), "governor");
}

#[test]
fn get_or_falls_back_to_default() {
    let config = GovernorConfig::empty();
    assert_eq!(config.get_or("missing", 42i64), 42);
}

#[test]
fn type_conversions_between_scalar_kinds() {
    let mut config = GovernorConfig::empty();
    config.set("int_val", ConfigValue::Integer(42));
    config.set("float_val", ConfigValue::Float(3.14));
    config.set("bool_val", ConfigValue::Bool(true));
    config.set("null_val", ConfigValue::Null);

    assert_eq!(config.get::<i64>("int_val").unwrap(), 42);
    assert_eq!(config.get::<f64>("float_val").unwrap(), 3.14);
    assert!(config.get::<bool>("bool_val").unwrap());
    assert_eq!(config.get::<String>("int_val").unwrap(), "42");
    assert!(config.get::<Option<String>>("null_val").unwrap().is_none());
}

#[test]
fn flatten_yaml_dot_separates_nested_keys() {
    let yaml = r#"
db:
  postgres:
    host: "localhost"
    pool_size: 10
events:
  backend: "nats"
"#;
    let config = GovernorConfig::from_yaml_str(yaml, "test").unwrap();
    assert_eq!(config.get::<String>("db.postgres.host").unwrap(), "localhost");
    assert_eq!(config.get::<i64>("db.postgres.pool_size").unwrap(), 10);
    assert_eq!(config.get::<String>("events.backend").unwrap(), "nats");
}

#[test]
fn flatten_yaml_list_is_addressable_whole_and_indexed() {
    let yaml = r#"
gate:
  allowed_algorithms:
    - "RS256"
    - "EdDSA"
"#;
    let config = GovernorConfig::from_yaml_str(yaml, "test").unwrap();
    let all: Vec<String> = config.get("gate.allowed_algorithms").unwrap();
    assert_eq!(all, vec!["RS256", "EdDSA"]);
    assert_eq!(config.get::<String>("gate.allowed_algorithms.0").unwrap(), "RS256");
}

struct DbSectionConfig {
    url: String,
    pool_size: i64,
}

impl ConfigProperties for DbSectionConfig {
    fn prefix() -> &'static str {
        "db"
    }

    fn properties_metadata() -> Vec<PropertyMeta> {
        vec![
            PropertyMeta {
                key: "url".into(),
                full_key: "db.url".into(),
                type_name: "String",
                required: true,
                default_value: None,
                description: None,
            },
            PropertyMeta {
                key: "pool_size".into(),
                full_key: "db.pool_size".into(),
                type_name: "i64",
                required: false,
                default_value: Some("10".into()),
                description: None,
            },
        ]
    }

    fn from_config(config: &GovernorConfig) -> Result<Self, ConfigError> {
        Ok(DbSectionConfig {
            url: config.get("db.url")?,
            pool_size: config.get_or("db.pool_size", 10),
        })
    }
}

#[test]
fn typed_section_deref_gives_field_access() {
    let mut raw = GovernorConfig::empty();
    raw.set("db.url", ConfigValue::String("postgres://localhost/gov".into()));
    let typed = raw.with_typed::<DbSectionConfig>().unwrap();
    assert_eq!(typed.url, "postgres://localhost/gov");
    assert_eq!(typed.pool_size, 10);
}

#[test]
fn typed_section_missing_required_key_errors() {
    let raw = GovernorConfig::empty();
    let err = raw.with_typed::<DbSectionConfig>().unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(key) if key == "db.url"));
}

#[test]
fn registering_a_section_exposes_its_metadata() {
    governor_core::config::register_section::<DbSectionConfig>();
    let sections = governor_core::config::registered_sections();
    assert!(sections.iter().any(|s| s.prefix == "db"));
}

#[test]
fn validate_section_reports_missing_required_keys() {
    let raw = GovernorConfig::empty();
    let errors = governor_core::config::validate_section::<DbSectionConfig>(&raw);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].key, "db.url");
}
