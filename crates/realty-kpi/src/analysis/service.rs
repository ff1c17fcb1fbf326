use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::analyzer::{AnalysisError, AnalysisRequest, Analyzer};
use super::currency::{CurrencyCode, ExchangeRates};
use super::domain::PropertyRecord;
use super::registry::{FieldSpec, KpiDefinitionView, MetricRegistry};
use super::result::{AnalysisResult, DiagnosticSummary};
use crate::history::{
    AnalysisHistoryService, HistoryEntry, HistoryError, HistoryId, HistoryRepository,
    HistorySummary,
};

/// Analysis request as submitted by the upload or manual-entry collaborators.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisSubmission {
    pub records: Vec<PropertyRecord>,
    pub kpis: Vec<String>,
    #[serde(default)]
    pub exchange_rates: ExchangeRates,
    #[serde(default)]
    pub target_currency: Option<CurrencyCode>,
    /// Saves the result to history under this name when present.
    #[serde(default)]
    pub save_as: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    pub diagnostics: Vec<DiagnosticSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<HistorySummary>,
}

/// Service composing the analyzer with the history store.
pub struct PortfolioAnalysisService<R> {
    analyzer: Arc<Analyzer>,
    history: AnalysisHistoryService<R>,
}

impl<R> PortfolioAnalysisService<R>
where
    R: HistoryRepository + 'static,
{
    pub fn new(analyzer: Arc<Analyzer>, history: AnalysisHistoryService<R>) -> Self {
        Self { analyzer, history }
    }

    pub fn registry(&self) -> &MetricRegistry {
        self.analyzer.registry()
    }

    pub fn catalog(&self) -> Vec<KpiDefinitionView> {
        self.registry()
            .definitions()
            .iter()
            .map(|definition| definition.to_view())
            .collect()
    }

    pub fn input_fields(&self, kpis: &[String]) -> Result<Vec<&FieldSpec>, AnalysisError> {
        Ok(self.registry().input_fields(kpis)?)
    }

    /// Run the analysis and, when `save_as` is set, persist the result at `now`.
    pub fn submit(
        &self,
        submission: AnalysisSubmission,
        now: DateTime<Utc>,
    ) -> Result<AnalysisOutcome, AnalysisServiceError> {
        let mut request = AnalysisRequest::new(&submission.records, &submission.kpis)
            .with_exchange_rates(&submission.exchange_rates);
        if let Some(target) = submission.target_currency.as_ref() {
            request = request.with_target_currency(target);
        }

        let result = self.analyzer.analyze_with(request)?;
        let history = match submission.save_as.as_deref() {
            Some(name) => Some(self.history.save(Some(name), &result, now)?),
            None => None,
        };

        Ok(AnalysisOutcome {
            diagnostics: result.diagnostics(),
            result,
            history,
        })
    }

    pub fn history(&self) -> Result<Vec<HistorySummary>, AnalysisServiceError> {
        Ok(self.history.list()?)
    }

    pub fn saved(&self, id: &HistoryId) -> Result<HistoryEntry, AnalysisServiceError> {
        Ok(self.history.get(id)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisServiceError {
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    History(#[from] HistoryError),
}
