use super::domain::{AggregateOutcome, AggregateStats, KpiAggregate, RecordResult};
use super::registry::MetricRegistry;

/// Distribution summary of `values`; empty input reports no data.
///
/// Mean and median stay finite for any finite input. A sum that overflows is reported as
/// `None`.
pub fn describe(values: &[f64]) -> AggregateOutcome {
    if values.is_empty() {
        return AggregateOutcome::NoData;
    }

    let count = values.len() as f64;
    let sum: f64 = values.iter().sum();
    let mean = if sum.is_finite() {
        sum / count
    } else {
        values.iter().map(|value| value / count).sum()
    };

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let middle = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        sorted[middle - 1] / 2.0 + sorted[middle] / 2.0
    } else {
        sorted[middle]
    };

    AggregateOutcome::Summary(AggregateStats {
        count: values.len(),
        mean,
        median,
        sum: sum.is_finite().then_some(sum),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
    })
}

pub(crate) fn summarize(
    selected: &[String],
    registry: &MetricRegistry,
    records: &[RecordResult],
) -> Vec<KpiAggregate> {
    selected
        .iter()
        .filter_map(|id| registry.get(id).ok())
        .map(|definition| {
            let values: Vec<f64> = records
                .iter()
                .filter_map(|record| record.value(definition.id))
                .collect();

            KpiAggregate {
                metric: definition.id.to_string(),
                unit: definition.unit,
                available: values.len(),
                unavailable: records.len() - values.len(),
                statistics: describe(&values),
            }
        })
        .collect()
}
