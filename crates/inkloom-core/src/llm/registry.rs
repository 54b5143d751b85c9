//! Model configuration registry.
//!
//! Holds the active set of [`ModelConfig`] entries and maintains the
//! sole-default invariant: whenever the set is non-empty, exactly one entry
//! has `is_default = true`. Any mutation that would remove the sole default
//! promotes another entry instead of leaving the set defaultless.

use tokio::sync::RwLock;
use tracing::{info, warn};

use inkloom_types::error::ModelConfigError;
use inkloom_types::model::ModelConfig;

/// Runtime registry of model configurations.
///
/// The engine resolves node model references through this registry; the API
/// layer mutates it and persists the resulting list through the external
/// store.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: RwLock<Vec<ModelConfig>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a persisted list, repairing the default flag
    /// if the stored data violates the sole-default invariant.
    pub fn from_configs(mut models: Vec<ModelConfig>) -> Self {
        enforce_sole_default(&mut models, None);
        Self {
            models: RwLock::new(models),
        }
    }

    /// Insert or replace a configuration by `id`.
    ///
    /// An entry arriving with `is_default = true` displaces the previous
    /// default; the first entry ever inserted becomes the default regardless
    /// of its flag.
    pub async fn upsert(&self, config: ModelConfig) {
        let prefer = config.is_default.then(|| config.id.clone());
        let mut models = self.models.write().await;
        match models.iter_mut().find(|m| m.id == config.id) {
            Some(existing) => *existing = config,
            None => models.push(config),
        }
        enforce_sole_default(&mut models, prefer.as_deref());
    }

    /// Remove a configuration by `id`.
    ///
    /// Removing the sole default promotes the first remaining entry.
    pub async fn remove(&self, id: &str) -> Result<ModelConfig, ModelConfigError> {
        let mut models = self.models.write().await;
        let position = models
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| ModelConfigError::NotFound { id: id.to_string() })?;
        let removed = models.remove(position);
        if removed.is_default && !models.is_empty() {
            enforce_sole_default(&mut models, None);
            if let Some(promoted) = models.iter().find(|m| m.is_default) {
                info!(model = %promoted.name, "promoted to default after removing the previous default");
            }
        }
        Ok(removed)
    }

    /// Mark `id` as the sole default.
    pub async fn set_default(&self, id: &str) -> Result<(), ModelConfigError> {
        let mut models = self.models.write().await;
        if !models.iter().any(|m| m.id == id) {
            return Err(ModelConfigError::NotFound { id: id.to_string() });
        }
        enforce_sole_default(&mut models, Some(id));
        Ok(())
    }

    /// Resolve a node's model reference to a configuration.
    ///
    /// `None` or an unresolvable id falls back to the current default; the
    /// unresolvable case is logged as a fallback, not surfaced as an error.
    pub async fn resolve(&self, model_id: Option<&str>) -> Result<ModelConfig, ModelConfigError> {
        let models = self.models.read().await;
        if let Some(id) = model_id.filter(|id| !id.is_empty()) {
            if let Some(found) = models
                .iter()
                .find(|m| m.id == id)
                .or_else(|| models.iter().find(|m| m.model_id == id))
            {
                return Ok(found.clone());
            }
            warn!(model_id = %id, "model reference not found, falling back to default");
        }
        default_of(&models)
    }

    /// The current default configuration.
    pub async fn default_model(&self) -> Result<ModelConfig, ModelConfigError> {
        let models = self.models.read().await;
        default_of(&models)
    }

    pub async fn get(&self, id: &str) -> Option<ModelConfig> {
        let models = self.models.read().await;
        models.iter().find(|m| m.id == id).cloned()
    }

    pub async fn list(&self) -> Vec<ModelConfig> {
        self.models.read().await.clone()
    }
}

fn default_of(models: &[ModelConfig]) -> Result<ModelConfig, ModelConfigError> {
    if models.is_empty() {
        return Err(ModelConfigError::Empty);
    }
    Ok(models
        .iter()
        .find(|m| m.is_default)
        .unwrap_or(&models[0])
        .clone())
}

/// Repair the default flag so exactly one entry carries it.
///
/// `prefer` names the entry that should win; otherwise the first currently
/// flagged entry keeps the flag, or the first entry overall when none is
/// flagged.
fn enforce_sole_default(models: &mut [ModelConfig], prefer: Option<&str>) {
    if models.is_empty() {
        return;
    }
    let chosen = prefer
        .and_then(|id| models.iter().position(|m| m.id == id))
        .or_else(|| models.iter().position(|m| m.is_default))
        .unwrap_or(0);
    for (index, model) in models.iter_mut().enumerate() {
        model.is_default = index == chosen;
    }
}
