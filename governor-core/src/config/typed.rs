use super::{ConfigError, GovernorConfig};

/// Metadata about a single configuration property.
#[derive(Debug, Clone)]
pub struct PropertyMeta {
    /// Relative key (e.g., `"pool_size"`).
    pub key: String,
    /// Absolute key (e.g., `"app.database.pool_size"`).
    pub full_key: String,
    /// Rust type name (e.g., `"i64"`).
    pub type_name: &'static str,
    /// Whether the property is required (no default and not `Option`).
    pub required: bool,
    /// Default value as a string, if any.
    pub default_value: Option<String>,
    /// Description from doc comments.
    pub description: Option<String>,
}

/// Trait for strongly-typed configuration sections.
///
/// Each service implements this by hand for its own config struct, reading
/// fields off the raw [`super::GovernorConfig`] and filling in the defaults
/// enumerated per-service (e.g. `hbinterval="5s"`, `sslmode=false`):
///
/// ```ignore
/// pub struct DatabaseConfig {
///     pub url: String,
///     pub pool_size: i64,
/// }
///
/// impl ConfigProperties for DatabaseConfig {
///     fn prefix() -> &'static str { "db" }
///     fn properties_metadata() -> Vec<PropertyMeta> { vec![/* ... */] }
///     fn from_config(config: &GovernorConfig) -> Result<Self, ConfigError> {
///         Ok(DatabaseConfig {
///             url: config.get("db.url")?,
///             pool_size: config.get_or("db.pool_size", 10),
///         })
///     }
/// }
/// ```
pub trait ConfigProperties: Sized {
    /// The configuration key prefix (e.g., `"app.database"`).
    fn prefix() -> &'static str;

    /// Metadata about all expected properties.
    fn properties_metadata() -> Vec<PropertyMeta>;

    /// Construct from an `GovernorConfig` instance.
    fn from_config(config: &GovernorConfig) -> Result<Self, ConfigError>;
}
