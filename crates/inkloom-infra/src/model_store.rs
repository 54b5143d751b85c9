//! File-backed persistence for model configurations.
//!
//! Stores the full configuration list as a single JSON document
//! (`models.json` in the data directory by default). Saves go through a
//! sibling `.tmp` file followed by a rename so a crash mid-write never
//! leaves a truncated store behind.

use std::path::{Path, PathBuf};

use inkloom_types::error::ModelConfigError;
use inkloom_types::model::ModelConfig;

/// JSON-file store for [`ModelConfig`] entries.
///
/// The store holds the whole list; callers load, mutate through the
/// in-memory registry, and save the full list back.
#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
}

impl ModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all model configurations.
    ///
    /// A missing file is an empty store, not an error.
    pub async fn load(&self) -> Result<Vec<ModelConfig>, ModelConfigError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(ModelConfigError::Storage {
                    message: format!("failed to read {}: {err}", self.path.display()),
                });
            }
        };

        serde_json::from_str(&content).map_err(|err| ModelConfigError::Storage {
            message: format!("failed to parse {}: {err}", self.path.display()),
        })
    }

    /// Persist the full configuration list, replacing the previous contents.
    ///
    /// Creates parent directories on first save.
    pub async fn save(&self, configs: &[ModelConfig]) -> Result<(), ModelConfigError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| ModelConfigError::Storage {
                    message: format!("failed to create {}: {err}", parent.display()),
                })?;
        }

        let json =
            serde_json::to_string_pretty(configs).map_err(|err| ModelConfigError::Storage {
                message: format!("failed to serialize model configurations: {err}"),
            })?;

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|err| ModelConfigError::Storage {
                message: format!("failed to write {}: {err}", tmp_path.display()),
            })?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|err| ModelConfigError::Storage {
                message: format!("failed to replace {}: {err}", self.path.display()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample(id: &str, is_default: bool) -> ModelConfig {
        ModelConfig {
            id: id.to_string(),
            name: format!("Model {id}"),
            model_id: "claude-sonnet-4-20250514".to_string(),
            api_key: "test-key-not-real".to_string(),
            api_url: None,
            is_default,
        }
    }

    #[tokio::test]
    async fn test_load_missing_file_returns_empty() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("models.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("models.json"));

        store
            .save(&[sample("m1", true), sample("m2", false)])
            .await
            .unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "m1");
        assert!(loaded[0].is_default);
        assert!(!loaded[1].is_default);
    }

    #[tokio::test]
    async fn test_save_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("nested").join("deep").join("models.json"));

        store.save(&[sample("m1", true)]).await.unwrap();
        assert_eq!(store.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_replaces_previous_contents() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("models.json"));

        store
            .save(&[sample("m1", true), sample("m2", false)])
            .await
            .unwrap();
        store.save(&[sample("m3", true)]).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "m3");
    }

    #[tokio::test]
    async fn test_save_leaves_no_tmp_file() {
        let dir = tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("models.json"));

        store.save(&[sample("m1", true)]).await.unwrap();
        assert!(!dir.path().join("models.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_load_malformed_json_is_storage_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("models.json");
        tokio::fs::write(&path, "this is not json").await.unwrap();

        let err = ModelStore::new(path).load().await.unwrap_err();
        match err {
            ModelConfigError::Storage { message } => {
                assert!(message.contains("failed to parse"));
            }
            other => panic!("expected Storage error, got {other}"),
        }
    }
}
