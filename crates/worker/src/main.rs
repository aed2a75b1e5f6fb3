mod observability;
mod scheduler;

use std::time::Duration;

use tracing::{info, warn};
use tutorhub_domain::clock::system_clock;
use tutorhub_domain::services::Services;
use tutorhub_infra::{config::AppConfig, logging::init_tracing, store::build_store};

use crate::scheduler::FeeScheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config, "tutorhub-worker")?;
    observability::init_metrics()?;

    if isolated_store(&config) {
        warn!(
            backend = %config.data_backend,
            "worker is using a process-local store; fee records will not reach the api"
        );
    }
    let store = build_store(&config).await?;
    let services = Services::new(store, system_clock());
    let scheduler = FeeScheduler::new(
        services.fee_generator.clone(),
        Duration::from_millis(config.fee_job_interval_ms),
        config.fee_job_run_on_start,
    );

    info!(backend = %config.data_backend, "worker starting");
    scheduler
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;
    info!("worker shutdown");

    Ok(())
}

/// A memory-backed worker bills into a store no api process can read.
fn isolated_store(config: &AppConfig) -> bool {
    !config.uses_surreal() && !config.is_test()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_backend_outside_tests_is_flagged() {
        let mut config = AppConfig::for_tests();
        assert!(!isolated_store(&config));

        config.app_env = "development".to_string();
        assert!(isolated_store(&config));

        config.data_backend = "surreal".to_string();
        assert!(!isolated_store(&config));
    }
}
