use governor_core::{ErrorKind, GovernorError};

#[derive(Debug)]
struct FakeDriverError(String);

impl std::fmt::Display for FakeDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for FakeDriverError {}

governor_core::map_error! {
    FakeDriverError => Client,
}

#[test]
fn map_error_macro_bridges_vendor_error_into_kind() {
    let vendor = FakeDriverError("connection refused".into());
    let err: GovernorError = vendor.into();
    assert_eq!(err.kind(), ErrorKind::Client);
    assert!(err.to_string().contains("connection refused"));
}

#[test]
fn constructors_set_expected_kind() {
    assert_eq!(GovernorError::not_found("x").kind(), ErrorKind::NotFound);
    assert_eq!(GovernorError::connection("x").kind(), ErrorKind::Connection);
    assert_eq!(GovernorError::client("x").kind(), ErrorKind::Client);
    assert_eq!(GovernorError::invalid_config("x").kind(), ErrorKind::InvalidConfig);
}

#[test]
fn config_error_converts_to_invalid_config_kind() {
    let cfg_err = governor_core::ConfigError::NotFound("db.url".into());
    let err: GovernorError = cfg_err.into();
    assert_eq!(err.kind(), ErrorKind::InvalidConfig);
}
