//! Connection options for the NATS JetStream backend.

#[derive(Debug, Clone)]
pub struct NatsConfig {
    pub url: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        NatsConfig { url: "nats://localhost:4222".to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_localhost() {
        assert_eq!(NatsConfig::default().url, "nats://localhost:4222");
    }
}
