pub mod config;
pub mod error;
pub mod health;
pub mod kernel;
pub mod lifecycle;
pub mod prelude;
pub mod secret;

pub use config::{
    ConfigError, ConfigProperties, ConfigValidationError, ConfigValue, DefaultSecretResolver,
    FromConfigValue, GovernorConfig, MissingKeyError, PropertyMeta, RegisteredSection,
    SecretResolver, register_section, registered_sections, validate_keys, validate_section,
};
pub use error::{ErrorKind, GovernorError};
pub use health::{HealthCheck, HealthIndicator, HealthReport, HealthState, HealthStatus};
pub use kernel::{ConfigReader, ConfigRegistrar, FirstUser, Kernel, KernelError, Kit, ReqSetup, Service};
pub use lifecycle::Lifecycle;
pub use secret::{InMemorySecretReader, SecretReader, StaticSecretReader};
