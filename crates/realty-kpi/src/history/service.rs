use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::domain::{HistoryEntry, HistoryId, HistorySummary, StoredAnalysis};
use super::repository::{HistoryRepository, RepositoryError};
use crate::analysis::AnalysisResult;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

static HISTORY_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_history_id() -> HistoryId {
    let id = HISTORY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    HistoryId(format!("analysis-{id:06}"))
}

/// Name used when the caller saves without one.
pub fn default_name(saved_at: DateTime<Utc>) -> String {
    format!("Analysis {}", saved_at.format("%Y-%m-%d %H:%M"))
}

/// Serializes analysis results into the history store and reads them back.
pub struct AnalysisHistoryService<R> {
    repository: Arc<R>,
    list_limit: usize,
}

impl<R> AnalysisHistoryService<R>
where
    R: HistoryRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self::with_limit(repository, DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_limit(repository: Arc<R>, list_limit: usize) -> Self {
        Self {
            repository,
            list_limit,
        }
    }

    /// Persist `result` under `name`, or under a timestamped default when `name` is blank.
    pub fn save(
        &self,
        name: Option<&str>,
        result: &AnalysisResult,
        saved_at: DateTime<Utc>,
    ) -> Result<HistorySummary, HistoryError> {
        let name = name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_name(saved_at));

        let record = StoredAnalysis {
            id: next_history_id(),
            name,
            saved_at,
            selected_kpis: result.selected_kpis().to_vec(),
            record_count: result.records().len(),
            payload: serde_json::to_string(result)?,
        };

        let stored = self.repository.insert(record)?;
        debug!(id = %stored.id, name = %stored.name, "analysis saved to history");
        Ok(stored.summary())
    }

    pub fn get(&self, id: &HistoryId) -> Result<HistoryEntry, HistoryError> {
        let stored = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        let result: AnalysisResult = serde_json::from_str(&stored.payload)?;

        Ok(HistoryEntry {
            id: stored.id,
            name: stored.name,
            saved_at: stored.saved_at,
            result,
        })
    }

    /// Newest first, capped at the configured listing limit.
    pub fn list(&self) -> Result<Vec<HistorySummary>, HistoryError> {
        let records = self.repository.list(self.list_limit)?;
        Ok(records.iter().map(StoredAnalysis::summary).collect())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("stored analysis could not be encoded: {0}")]
    Serialization(#[from] serde_json::Error),
}
