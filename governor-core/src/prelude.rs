//! Import everything a service implementation typically needs with a single `use`.

pub use crate::config::{ConfigError, ConfigProperties, ConfigValue, FromConfigValue, GovernorConfig};
pub use crate::error::{ErrorKind, GovernorError};
pub use crate::health::{HealthIndicator, HealthReport, HealthStatus};
pub use crate::kernel::{ConfigReader, ConfigRegistrar, FirstUser, Kernel, KernelError, Kit, ReqSetup, Service};
pub use crate::lifecycle::Lifecycle;
pub use crate::secret::{SecretReader, StaticSecretReader};
