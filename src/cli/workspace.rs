use anyhow::{Result, anyhow};
use uuid::Uuid;

use crate::ai::ModelRegistry;
use crate::core::AppConfig;
use crate::session::{SharedStore, ThreadSeed, shared, snapshot};

/// Everything a command needs: config, available models and the store
/// loaded from the local snapshot.
pub struct Workspace {
    pub config: AppConfig,
    pub registry: ModelRegistry,
    pub store: SharedStore,
}

impl Workspace {
    pub fn open(config: AppConfig) -> Result<Self> {
        let registry = ModelRegistry::from_config(&config);
        Self::open_with_registry(config, registry)
    }

    pub fn open_with_registry(config: AppConfig, registry: ModelRegistry) -> Result<Self> {
        let mut store = snapshot::load(&config.snapshot_path())?;
        store.set_seed(ThreadSeed {
            system_message: config.system_message.clone(),
            default_model: registry.default_model().map(str::to_string),
        });
        Ok(Self {
            config,
            registry,
            store: shared(store),
        })
    }

    pub fn save(&self) -> Result<()> {
        let state = self.store.read().expect("Unable to read shared state");
        snapshot::save(&state, &self.config.snapshot_path())
    }

    /// Use the given thread or fall back to the active one.
    pub fn thread_or_active(&self, thread: Option<Uuid>) -> Result<Uuid> {
        let state = self.store.read().expect("Unable to read shared state");
        let id = match thread {
            Some(id) => id,
            None => state
                .active_thread_id()
                .ok_or(anyhow!("No active thread. Create one with `new`."))?,
        };
        if state.thread(id).is_none() {
            return Err(anyhow!("Thread not found: {}", id));
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &std::path::Path) -> AppConfig {
        AppConfig {
            storage_path: dir.display().to_string(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_open_seeds_default_model_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::open(test_config(dir.path())).unwrap();
        let id = workspace.store.write().unwrap().create_thread();
        workspace.save().unwrap();

        let reopened = Workspace::open(test_config(dir.path())).unwrap();
        assert_eq!(reopened.thread_or_active(None).unwrap(), id);
        let state = reopened.store.read().unwrap();
        let thread = state.thread(id).unwrap();
        assert_eq!(
            thread.messages[2],
            crate::session::Message::model_choice(Some("claude-3-7-sonnet-latest"))
        );
    }

    #[test]
    fn test_thread_or_active_without_threads() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::open(test_config(dir.path())).unwrap();
        assert!(workspace.thread_or_active(None).is_err());
        assert!(workspace.thread_or_active(Some(Uuid::new_v4())).is_err());
    }
}
