use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::{MissedTickBehavior, interval_at};
use tracing::{error, info};
use tutorhub_domain::fees::{FeeRecordGenerator, FeeRunReport, FeeRunStatus};

use crate::observability;

/// Runs the fee generator on a fixed period until shutdown.
pub struct FeeScheduler {
    generator: FeeRecordGenerator,
    period: Duration,
    run_on_start: bool,
}

impl FeeScheduler {
    pub fn new(generator: FeeRecordGenerator, period: Duration, run_on_start: bool) -> Self {
        Self {
            generator,
            period: period.max(Duration::from_millis(1)),
            run_on_start,
        }
    }

    pub async fn run_once(&self) -> FeeRunReport {
        let started = Instant::now();
        let report = self.generator.generate().await;
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        observability::register_fee_run(&report, duration_ms);

        match report.status {
            FeeRunStatus::Success => info!(
                month = %report.month,
                created = report.created,
                duplicates = report.duplicates,
                skipped_batches = report.skipped_batches,
                duration_ms,
                "fee run finished"
            ),
            FeeRunStatus::Error => error!(
                month = %report.month,
                created = report.created,
                message = report.message.as_deref().unwrap_or("-"),
                "fee run failed"
            ),
        }
        report
    }

    /// Returns the number of completed runs once `shutdown` resolves.
    pub async fn run_until<F>(&self, shutdown: F) -> usize
    where
        F: Future<Output = ()>,
    {
        let now = tokio::time::Instant::now();
        let start = if self.run_on_start {
            now
        } else {
            now + self.period
        };
        let mut timer = interval_at(start, self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(
            period_ms = self.period.as_millis() as u64,
            run_on_start = self.run_on_start,
            "fee scheduler started"
        );
        let mut runs = 0;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = timer.tick() => {
                    self.run_once().await;
                    runs += 1;
                }
            }
        }
        info!(runs, "fee scheduler stopped");
        runs
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::macros::datetime;
    use tokio::sync::oneshot;
    use tutorhub_domain::batches::BatchCreate;
    use tutorhub_domain::clock::FixedClock;
    use tutorhub_domain::services::Services;
    use tutorhub_domain::store::InMemoryDocumentStore;
    use tutorhub_domain::students::{BatchRef, StudentCreate};

    use super::*;

    async fn seeded_services() -> Services {
        let services = Services::new(
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(FixedClock(datetime!(2026-10-19 09:00:00 UTC))),
        );
        let batch = services
            .batches
            .create(BatchCreate {
                teacher_id: "t-1".into(),
                name: "Physics".into(),
                payment_amount: Some(700.0),
                ..BatchCreate::default()
            })
            .await
            .expect("batch");
        services
            .students
            .create(StudentCreate {
                name: "Asha".into(),
                batches: vec![BatchRef::Id(batch.id)],
                ..StudentCreate::default()
            })
            .await
            .expect("student");
        services
    }

    #[tokio::test]
    async fn run_once_reports_the_generator_outcome() {
        let services = seeded_services().await;
        let scheduler =
            FeeScheduler::new(services.fee_generator.clone(), Duration::from_secs(60), true);

        let report = scheduler.run_once().await;
        assert_eq!(report.status, FeeRunStatus::Success);
        assert_eq!(report.created, 1);

        let again = scheduler.run_once().await;
        assert_eq!(again.created, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn runs_on_start_and_stops_on_shutdown() {
        let services = seeded_services().await;
        let scheduler =
            FeeScheduler::new(services.fee_generator.clone(), Duration::from_secs(3600), true);
        let (stop, stopped) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            scheduler
                .run_until(async {
                    let _ = stopped.await;
                })
                .await
        });
        tokio::time::sleep(Duration::from_secs(10)).await;
        let _ = stop.send(());

        let runs = handle.await.expect("scheduler task");
        assert_eq!(runs, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deferred_start_waits_for_the_first_period() {
        let services = seeded_services().await;
        let scheduler =
            FeeScheduler::new(services.fee_generator.clone(), Duration::from_secs(3600), false);
        let (stop, stopped) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            scheduler
                .run_until(async {
                    let _ = stopped.await;
                })
                .await
        });
        tokio::time::sleep(Duration::from_secs(10)).await;
        let _ = stop.send(());

        assert_eq!(handle.await.expect("scheduler task"), 0);
    }
}
