use bigdecimal::{BigDecimal, ToPrimitive};
use std::collections::BTreeMap;

use crate::{db::RecordStore, error::AppResult, models::MonitoringSummary};

/// Average latency and rating distribution over the latest `sample_size` records
pub async fn summarize_recent(
    store: &dyn RecordStore,
    sample_size: usize,
) -> AppResult<MonitoringSummary> {
    let records = store.recent(sample_size).await?;

    let latencies: Vec<f64> = records.iter().filter_map(|r| r.latency.to_f64()).collect();
    let ratings: Vec<&BigDecimal> = records.iter().map(|r| &r.predicted_rating).collect();

    let summary = summarize(&latencies, &ratings);
    tracing::debug!(
        sample_size = summary.sample_size,
        average_latency_seconds = summary.average_latency_seconds,
        "Monitoring summary computed"
    );
    Ok(summary)
}

fn summarize(latencies: &[f64], ratings: &[&BigDecimal]) -> MonitoringSummary {
    let average_latency_seconds = if latencies.is_empty() {
        0.0
    } else {
        latencies.iter().sum::<f64>() / latencies.len() as f64
    };

    let mut rating_distribution = BTreeMap::new();
    for rating in ratings {
        let bucket = format!("{:.1}", rating.to_f64().unwrap_or(0.0));
        *rating_distribution.entry(bucket).or_insert(0) += 1;
    }

    MonitoringSummary {
        sample_size: ratings.len(),
        average_latency_seconds,
        rating_distribution,
    }
}
