use crate::modules::pipeline::service::{PendingReport, PipelineService};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info, warn};

pub fn parse_schedule(expression: &str) -> Result<Schedule> {
    Schedule::from_str(expression)
        .map_err(|e| anyhow!("Invalid reconcile schedule {:?}: {}", expression, e))
}

fn until_next(schedule: &Schedule, now: DateTime<Utc>) -> Option<Duration> {
    schedule
        .after(&now)
        .next()
        .and_then(|next| (next - now).to_std().ok())
}

/// Periodically reports originals stuck before conversion and staging
/// objects nobody relocated. Report only, nothing is deleted.
pub async fn start_reconciler(service: PipelineService, schedule: Schedule, grace: Duration) {
    info!(grace_secs = grace.as_secs(), "🧹 Starting reconciliation sweep");

    loop {
        let wait = match until_next(&schedule, Utc::now()) {
            Some(wait) => wait,
            None => {
                warn!("Reconcile schedule has no upcoming runs, sweep disabled");
                return;
            }
        };
        tokio::time::sleep(wait).await;

        match service.pending_conversions(Some(grace)).await {
            Ok(report) => log_report(&report),
            Err(e) => error!(error = %e, "Reconciliation sweep failed"),
        }
    }
}

fn log_report(report: &PendingReport) {
    if report.awaiting_conversion.is_empty() && report.staging_leftovers.is_empty() {
        info!("Reconciliation sweep clean");
        return;
    }

    for object in &report.awaiting_conversion {
        warn!(key = %object.key, size_bytes = object.size, "Original still awaiting conversion");
    }
    for object in &report.staging_leftovers {
        warn!(key = %object.key, size_bytes = object.size, "Staged output never relocated");
    }
    info!(
        awaiting = report.awaiting_conversion.len(),
        leftovers = report.staging_leftovers.len(),
        "Reconciliation sweep finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn default_schedule_runs_every_half_hour() {
        let schedule = parse_schedule("0 */30 * * * *").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 10, 0).unwrap();
        assert_eq!(until_next(&schedule, now), Some(Duration::from_secs(20 * 60)));
    }

    #[test]
    fn bad_expression_is_rejected() {
        assert!(parse_schedule("every half hour").is_err());
    }
}
