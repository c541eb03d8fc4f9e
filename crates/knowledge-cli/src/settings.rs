//! Configuration for the `km` binary.

use std::time::Duration;

use knowledge_graph::GraphConfig;
use serde::Deserialize;

/// Top-level configuration.
///
/// Loaded from `knowledge.toml` (optional) overlaid by `KNOWLEDGE__`
/// environment variables, e.g. `KNOWLEDGE__NEO4J__URI`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub neo4j: GraphConfig,

    #[serde(default)]
    pub repository: RepositoryConfig,
}

/// Repository behavior knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryConfig {
    /// Deadline for a single repository operation, in milliseconds. 0 disables it.
    #[serde(default = "default_timeout_ms")]
    pub operation_timeout_ms: u64,
}

impl RepositoryConfig {
    pub fn operation_timeout(&self) -> Option<Duration> {
        (self.operation_timeout_ms > 0).then(|| Duration::from_millis(self.operation_timeout_ms))
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            operation_timeout_ms: default_timeout_ms(),
        }
    }
}

/// Load configuration from `<file_prefix>.toml` and the environment.
pub fn load(file_prefix: &str) -> Result<AppConfig, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("KNOWLEDGE")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}
