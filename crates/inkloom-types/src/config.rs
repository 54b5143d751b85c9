//! Global configuration loaded from `config.toml`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Engine behavior tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Opt-in wave-parallel dispatch of independent branches. Off by
    /// default: baseline execution is strictly sequential in topological
    /// order.
    #[serde(default)]
    pub parallel_branches: bool,

    /// Stream agent responses chunk-by-chunk (streamed calls bypass the
    /// cache and the retry loop).
    #[serde(default)]
    pub stream_responses: bool,

    /// Validate agent outputs against the role schema registry.
    #[serde(default = "default_validate_outputs")]
    pub validate_outputs: bool,

    /// Bounded follow-up requests for missing required fields.
    #[serde(default = "default_max_compensation_rounds")]
    pub max_compensation_rounds: u32,
}

fn default_validate_outputs() -> bool {
    true
}

fn default_max_compensation_rounds() -> u32 {
    1
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel_branches: false,
            stream_responses: false,
            validate_outputs: default_validate_outputs(),
            max_compensation_rounds: default_max_compensation_rounds(),
        }
    }
}

/// HTTP server binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8640
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Top-level configuration (`{data_dir}/config.toml`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    /// Path of the model configuration store; defaults to
    /// `{data_dir}/models.json` when unset.
    #[serde(default)]
    pub models_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sequential_and_validating() {
        let config = GlobalConfig::default();
        assert!(!config.engine.parallel_branches);
        assert!(!config.engine.stream_responses);
        assert!(config.engine.validate_outputs);
        assert_eq!(config.engine.max_compensation_rounds, 1);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8640);
        assert!(config.models_path.is_none());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: GlobalConfig = toml::from_str(
            r#"
[engine]
parallel_branches = true
"#,
        )
        .unwrap();
        assert!(config.engine.parallel_branches);
        assert!(config.engine.validate_outputs);
        assert_eq!(config.server.port, 8640);
    }
}
