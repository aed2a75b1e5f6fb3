use std::sync::OnceLock;

use anyhow::Result;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tutorhub_domain::fees::{FeeRunReport, FeeRunStatus};

const FEE_RUNS_TOTAL: &str = "tutorhub_worker_fee_runs_total";
const FEE_RUN_DURATION_MS: &str = "tutorhub_worker_fee_run_duration_ms";
const FEE_RECORDS_CREATED_TOTAL: &str = "tutorhub_worker_fee_records_created_total";
const FEE_RECORDS_DUPLICATE_TOTAL: &str = "tutorhub_worker_fee_records_duplicate_total";
const FEE_BATCHES_SKIPPED_GAUGE: &str = "tutorhub_worker_fee_batches_skipped";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn init_metrics() -> Result<()> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = METRICS_HANDLE.set(handle);
    Ok(())
}

pub fn register_fee_run(report: &FeeRunReport, duration_ms: f64) {
    let result = match report.status {
        FeeRunStatus::Success => "success",
        FeeRunStatus::Error => "error",
    };

    counter!(FEE_RUNS_TOTAL, "result" => result).increment(1);
    histogram!(FEE_RUN_DURATION_MS, "result" => result).record(duration_ms.max(0.0));
    counter!(FEE_RECORDS_CREATED_TOTAL).increment(report.created as u64);
    counter!(FEE_RECORDS_DUPLICATE_TOTAL).increment(report.duplicates as u64);
    gauge!(FEE_BATCHES_SKIPPED_GAUGE).set(report.skipped_batches as f64);
}
