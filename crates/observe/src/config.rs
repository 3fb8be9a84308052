use tracing::Level;

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `EnvFilter` directives, e.g. `warn,settlement=debug`.
    pub env_filter: String,
    /// Minimum level threshold for stderr output, `ERROR` if unset.
    pub stderr_threshold: Option<Level>,
    pub use_json_format: bool,
}

impl Config {
    pub fn with_env_filter(self, env_filter: &str) -> Self {
        Self {
            env_filter: env_filter.to_string(),
            ..self
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env_filter: "warn,settlement=info".to_string(),
            stderr_threshold: None,
            use_json_format: false,
        }
    }
}
