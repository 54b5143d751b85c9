//! Application state wiring the engine to its infrastructure.
//!
//! AppState holds the workflow engine and its collaborators. The engine is
//! generic over the provider factory trait, but AppState pins it to the
//! HTTP-backed infra implementation.

use std::path::PathBuf;
use std::sync::Arc;

use inkloom_core::event::EventBus;
use inkloom_core::llm::ModelRegistry;
use inkloom_core::resilience::ResilienceShell;
use inkloom_core::schema::SchemaRegistry;
use inkloom_core::workflow::WorkflowEngine;
use inkloom_infra::config::{load_global_config, resolve_data_dir, resolve_models_path};
use inkloom_infra::llm::HttpProviderFactory;
use inkloom_infra::model_store::ModelStore;
use inkloom_types::config::GlobalConfig;
use inkloom_types::error::ModelConfigError;

/// Broadcast capacity of the run event bus.
const EVENT_BUS_CAPACITY: usize = 256;

/// Shared application state holding the engine and its collaborators.
///
/// Used by both CLI commands and REST API handlers. Cloning is cheap; all
/// the heavy members are shared.
#[derive(Clone)]
pub struct AppState {
    pub engine: WorkflowEngine,
    pub models: Arc<ModelRegistry>,
    pub store: ModelStore,
    pub config: GlobalConfig,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state: resolve the data directory, load
    /// configuration and the persisted model list, and wire the engine.
    pub async fn init(data_dir_override: Option<PathBuf>) -> anyhow::Result<Self> {
        Self::init_with_engine_flags(data_dir_override, false, false).await
    }

    /// As [`Self::init`], with CLI flag overrides: `stream` and `parallel`
    /// force the corresponding engine options on regardless of what
    /// `config.toml` says. Flags never force an option off.
    pub async fn init_with_engine_flags(
        data_dir_override: Option<PathBuf>,
        stream: bool,
        parallel: bool,
    ) -> anyhow::Result<Self> {
        let data_dir = data_dir_override.unwrap_or_else(resolve_data_dir);
        tokio::fs::create_dir_all(&data_dir).await?;

        let mut config = load_global_config(&data_dir).await;
        config.engine.stream_responses |= stream;
        config.engine.parallel_branches |= parallel;

        let store = ModelStore::new(resolve_models_path(&data_dir, &config));
        let models = Arc::new(ModelRegistry::from_configs(store.load().await?));

        let engine = WorkflowEngine::new(
            models.clone(),
            Arc::new(SchemaRegistry::with_builtins()),
            Arc::new(HttpProviderFactory::new()),
            Arc::new(ResilienceShell::new()),
            EventBus::new(EVENT_BUS_CAPACITY),
            config.engine.clone(),
        );

        Ok(Self {
            engine,
            models,
            store,
            config,
            data_dir,
        })
    }

    /// Persist the registry's current contents through the model store.
    ///
    /// Called after every registry mutation so the file stays the source
    /// of truth across restarts.
    pub async fn persist_models(&self) -> Result<(), ModelConfigError> {
        self.store.save(&self.models.list().await).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkloom_types::model::ModelConfig;
    use tempfile::tempdir;

    #[tokio::test]
    async fn init_with_empty_data_dir_starts_clean() {
        let dir = tempdir().unwrap();
        let state = AppState::init(Some(dir.path().to_path_buf())).await.unwrap();
        assert!(state.models.list().await.is_empty());
        assert!(!state.config.engine.parallel_branches);
        assert_eq!(state.data_dir, dir.path());
    }

    #[tokio::test]
    async fn engine_flags_force_options_on() {
        let dir = tempdir().unwrap();
        let state =
            AppState::init_with_engine_flags(Some(dir.path().to_path_buf()), true, true)
                .await
                .unwrap();
        assert!(state.config.engine.stream_responses);
        assert!(state.config.engine.parallel_branches);
    }

    #[tokio::test]
    async fn persist_models_survives_reinit() {
        let dir = tempdir().unwrap();
        let state = AppState::init(Some(dir.path().to_path_buf())).await.unwrap();
        state
            .models
            .upsert(ModelConfig {
                id: "m1".to_string(),
                name: "Claude".to_string(),
                model_id: "claude-sonnet-4-20250514".to_string(),
                api_key: "test-key-not-real".to_string(),
                api_url: None,
                is_default: true,
            })
            .await;
        state.persist_models().await.unwrap();

        let reloaded = AppState::init(Some(dir.path().to_path_buf())).await.unwrap();
        let models = reloaded.models.list().await;
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].id, "m1");
        assert!(models[0].is_default);
    }
}
