use crate::config::{ServerConfig, load_structured_file};
use crate::directory::Directory;
use crate::dispatcher::NotificationDispatcher;
use crate::mail::{MailTransport, build_transport};
use crate::metrics::METRICS;
use crate::model::DirectorySeed;
use crate::store::InMemoryDirectoryStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// Shared application state: configuration plus the wired-up directory.
pub struct AppState {
    config: Arc<ServerConfig>,
    directory: Arc<Directory>,
}

impl AppState {
    /// Loads the seed (if any), builds the mail transport and registers the
    /// notification dispatcher on the directory.
    pub fn from_config(config: Arc<ServerConfig>) -> Result<Self> {
        let store = match config.seed_file.as_deref() {
            Some(path) => {
                let seed: DirectorySeed = load_structured_file(path, "seed")?;
                let store = InMemoryDirectoryStore::from_seed(seed)
                    .with_context(|| format!("invalid seed file {:?}", path))?;
                info!(
                    seed = %path.display(),
                    employees = store.employee_count(),
                    extensions = store.extension_count(),
                    "directory seeded"
                );
                store
            }
            None => InMemoryDirectoryStore::new(),
        };
        let transport = build_transport(&config.mail)?;
        Ok(Self::with_parts(config, Arc::new(store), transport))
    }

    pub fn with_parts(
        config: Arc<ServerConfig>,
        store: Arc<InMemoryDirectoryStore>,
        transport: Arc<dyn MailTransport>,
    ) -> Self {
        let dispatcher = NotificationDispatcher::new(
            store.clone(),
            transport,
            config.mail.from_address.clone(),
            config.mail.signature.clone(),
        );
        METRICS.set_extension_count(store.extension_count());
        let directory = Directory::new(store).on_extension_saved(Arc::new(dispatcher));
        Self {
            config,
            directory: Arc::new(directory),
        }
    }

    pub fn config(&self) -> &Arc<ServerConfig> {
        &self.config
    }

    pub fn directory(&self) -> &Arc<Directory> {
        &self.directory
    }
}
