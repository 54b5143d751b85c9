//! Global configuration loader for Inkloom.
//!
//! Reads `config.toml` from the data directory (`~/.inkloom/` in production)
//! and deserializes it into [`GlobalConfig`]. Falls back to defaults when
//! the file is missing or malformed.

use std::path::{Path, PathBuf};

use inkloom_types::config::GlobalConfig;

/// Load global configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`GlobalConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_global_config(data_dir: &Path) -> GlobalConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GlobalConfig::default();
        }
    };

    match toml::from_str::<GlobalConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GlobalConfig::default()
        }
    }
}

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `INKLOOM_DATA_DIR` environment variable
/// 2. Platform home directory (`~/.inkloom`)
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("INKLOOM_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".inkloom");
    }

    // Last resort: current directory
    PathBuf::from(".inkloom")
}

/// Resolve the model store path: the `models_path` override from config
/// when present, otherwise `{data_dir}/models.json`.
pub fn resolve_models_path(data_dir: &Path, config: &GlobalConfig) -> PathBuf {
    config
        .models_path
        .clone()
        .unwrap_or_else(|| data_dir.join("models.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_global_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.server.port, 8640);
        assert!(!config.engine.parallel_branches);
        assert!(config.engine.validate_outputs);
    }

    #[tokio::test]
    async fn load_global_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        tokio::fs::write(
            &config_path,
            r#"
models_path = "/tmp/custom-models.json"

[server]
port = 9000

[engine]
parallel_branches = true
max_compensation_rounds = 2
"#,
        )
        .await
        .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.server.port, 9000);
        assert!(config.engine.parallel_branches);
        assert_eq!(config.engine.max_compensation_rounds, 2);
        assert_eq!(
            config.models_path.as_deref(),
            Some(Path::new("/tmp/custom-models.json"))
        );
    }

    #[tokio::test]
    async fn load_global_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        tokio::fs::write(&config_path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_global_config(tmp.path()).await;
        assert_eq!(config.server.port, 8640);
        assert!(config.models_path.is_none());
    }

    #[test]
    fn resolve_data_dir_from_env() {
        // SAFETY: This test is single-threaded and restores the env var immediately.
        unsafe {
            std::env::set_var("INKLOOM_DATA_DIR", "/tmp/test-inkloom");
        }
        let dir = resolve_data_dir();
        assert_eq!(dir, PathBuf::from("/tmp/test-inkloom"));
        unsafe {
            std::env::remove_var("INKLOOM_DATA_DIR");
        }
    }

    #[test]
    fn resolve_models_path_defaults_next_to_config() {
        let config = GlobalConfig::default();
        let path = resolve_models_path(Path::new("/data/inkloom"), &config);
        assert_eq!(path, PathBuf::from("/data/inkloom/models.json"));
    }

    #[test]
    fn resolve_models_path_honors_override() {
        let config = GlobalConfig {
            models_path: Some(PathBuf::from("/srv/models.json")),
            ..GlobalConfig::default()
        };
        let path = resolve_models_path(Path::new("/data/inkloom"), &config);
        assert_eq!(path, PathBuf::from("/srv/models.json"));
    }
}
