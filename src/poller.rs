use crate::evaluator::QualityEvaluator;
use crate::measurement::MetricKind;
use crate::quality::QualityLevel;
use crate::reading::Reading;
use futures::future;
use std::sync::Arc;
use tokio::time::{Duration, MissedTickBehavior};

/// One round of reads, issued the way the host issues them: quality and the
/// four metrics at once.
#[derive(Debug)]
pub struct Snapshot {
    pub air_quality: Reading<QualityLevel>,
    pub metrics: Vec<(MetricKind, Reading<f64>)>,
}

impl Snapshot {
    fn log(&self) {
        match &self.air_quality {
            Reading::Value(level) => {
                let values: Vec<String> = self
                    .metrics
                    .iter()
                    .map(|(kind, reading)| format!("{kind}={}", reading.value_or_sentinel()))
                    .collect();
                tracing::info!(
                    quality = %level,
                    metrics = %values.join(" "),
                    "pool water quality"
                );
            }
            other => {
                tracing::warn!(
                    status = ?other.status(),
                    detail = ?other.detail(),
                    "pool water quality unavailable"
                );
            }
        }
    }
}

pub async fn poll_once(evaluator: &QualityEvaluator) -> Snapshot {
    let metric_reads = MetricKind::ALL
        .into_iter()
        .map(|kind| async move { (kind, evaluator.read_metric(kind).await) });
    let (air_quality, metrics) =
        tokio::join!(evaluator.read_air_quality(), future::join_all(metric_reads));
    Snapshot {
        air_quality,
        metrics,
    }
}

pub async fn run(evaluator: Arc<QualityEvaluator>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        poll_once(&evaluator).await.log();
    }
}
