/// What `HandlerRegistry` does when a second handler is registered for a
/// contract that already has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Refuse the registration with `RegistryError::DuplicateHandler`.
    #[default]
    Reject,
    /// Keep the newest registration and log a warning.
    Replace,
}

/// Handler registry configuration.
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    pub duplicate_policy: DuplicatePolicy,
}

/// Log output configuration for binaries embedding the dispatchers.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directives. `RUST_LOG` takes precedence when set.
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default)]
pub struct DispatchConfig {
    pub registry: RegistryConfig,
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_reject_duplicates_and_log_at_info() {
        let config = DispatchConfig::default();
        assert_eq!(config.registry.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(config.logging.filter, "info");
        assert!(!config.logging.json);
    }
}
