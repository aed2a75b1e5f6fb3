use std::sync::Arc;

use tutorhub_domain::clock::{Clock, system_clock};
use tutorhub_domain::ports::db::DbAdapter;
use tutorhub_domain::ports::store::DocumentStore;
use tutorhub_domain::services::Services;
use tutorhub_infra::config::AppConfig;
use tutorhub_infra::db::{DbConfig, SurrealAdapter};
use tutorhub_infra::store::build_store;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub services: Services,
    /// Present when the store lives in SurrealDB; probed by `/health`.
    pub db: Option<Arc<dyn DbAdapter>>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let store = build_store(&config).await?;
        let db: Option<Arc<dyn DbAdapter>> = if config.uses_surreal() {
            Some(Arc::new(SurrealAdapter::new(DbConfig::from_app_config(
                &config,
            ))))
        } else {
            None
        };
        Ok(Self {
            services: Services::new(store, system_clock()),
            config,
            db,
        })
    }

    #[allow(dead_code)]
    pub fn with_store(
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            services: Services::new(store, clock),
            db: None,
        }
    }
}
