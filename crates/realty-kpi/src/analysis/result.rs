use super::currency::CurrencyCode;
use super::domain::{IssueReason, KpiAggregate, RecordResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of one `analyze` call. Built once by the analyzer and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    selected_kpis: Vec<String>,
    working_currency: CurrencyCode,
    records: Vec<RecordResult>,
    aggregates: Vec<KpiAggregate>,
}

impl AnalysisResult {
    pub(crate) fn new(
        selected_kpis: Vec<String>,
        working_currency: CurrencyCode,
        records: Vec<RecordResult>,
        aggregates: Vec<KpiAggregate>,
    ) -> Self {
        Self {
            selected_kpis,
            working_currency,
            records,
            aggregates,
        }
    }

    pub fn selected_kpis(&self) -> &[String] {
        &self.selected_kpis
    }

    pub fn working_currency(&self) -> &CurrencyCode {
        &self.working_currency
    }

    pub fn records(&self) -> &[RecordResult] {
        &self.records
    }

    pub fn record(&self, index: usize) -> Option<&RecordResult> {
        self.records.get(index)
    }

    pub fn aggregates(&self) -> &[KpiAggregate] {
        &self.aggregates
    }

    pub fn aggregate(&self, metric: &str) -> Option<&KpiAggregate> {
        self.aggregates
            .iter()
            .find(|aggregate| aggregate.metric == metric)
    }

    /// Per-record values of `metric` in input order, `None` where unavailable.
    pub fn values(&self, metric: &str) -> Vec<Option<f64>> {
        self.records
            .iter()
            .map(|record| record.value(metric))
            .collect()
    }

    /// Counts of records that could not produce each selected metric, grouped by reason.
    pub fn diagnostics(&self) -> Vec<DiagnosticSummary> {
        let total_records = self.records.len();
        let mut summaries = Vec::new();

        for metric in &self.selected_kpis {
            let mut affected: BTreeMap<IssueReason, BTreeSet<usize>> = BTreeMap::new();

            for record in &self.records {
                let Some(result) = record.metric(metric) else {
                    continue;
                };
                for issue in result.issues() {
                    affected
                        .entry(issue.reason)
                        .or_default()
                        .insert(record.record_index);
                }
            }

            summaries.extend(affected.into_iter().map(|(reason, indices)| {
                let affected_records = indices.len();
                DiagnosticSummary {
                    metric: metric.clone(),
                    reason,
                    affected_records,
                    total_records,
                    message: format!(
                        "{affected_records} of {total_records} records {} for {metric}",
                        reason.summary_phrase()
                    ),
                }
            }));
        }

        summaries
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticSummary {
    pub metric: String,
    pub reason: IssueReason,
    pub affected_records: usize,
    pub total_records: usize,
    pub message: String,
}
