use std::sync::Arc;

use anyhow::bail;
use tutorhub_domain::ports::store::DocumentStore;
use tutorhub_domain::store::InMemoryDocumentStore;

use crate::config::{AppConfig, BACKEND_MEMORY, BACKEND_SURREAL};
use crate::db::{DbConfig, connect};

pub mod surreal;

pub use surreal::SurrealDocumentStore;

/// Selects the document store named by `data_backend`.
pub async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let backend = config.data_backend.trim().to_ascii_lowercase();
    let store: Arc<dyn DocumentStore> = match backend.as_str() {
        BACKEND_MEMORY => Arc::new(InMemoryDocumentStore::new()),
        BACKEND_SURREAL => {
            let client = connect(&DbConfig::from_app_config(config)).await?;
            Arc::new(SurrealDocumentStore::new(Arc::new(client)))
        }
        other => bail!("unknown data_backend '{other}'"),
    };
    tracing::info!(store = store.name(), "document store ready");
    Ok(store)
}
