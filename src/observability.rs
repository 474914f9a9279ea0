use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::model::ConflictReport;

/// Counter: admission decisions. Labels: outcome (admitted, rejected).
pub const ADMISSIONS_TOTAL: &str = "slotguard_admissions_total";

/// Histogram: time spent under the admission lock, in seconds.
pub const ADMISSION_DURATION_SECONDS: &str = "slotguard_admission_duration_seconds";

/// Counter: payloads rejected by field validation.
pub const VALIDATION_FAILURES_TOTAL: &str = "slotguard_validation_failures_total";

/// Counter: conflicting pairs found by audits.
pub const AUDIT_CONFLICTS_TOTAL: &str = "slotguard_audit_conflicts_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a decision to a short label for metrics.
pub fn outcome_label(report: &ConflictReport) -> &'static str {
    match report {
        ConflictReport::Admitted => "admitted",
        ConflictReport::Rejected(_) => "rejected",
    }
}
