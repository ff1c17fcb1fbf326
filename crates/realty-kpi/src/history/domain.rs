use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryId(pub String);

impl fmt::Display for HistoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Row handed to the storage collaborator. `payload` is the JSON-encoded `AnalysisResult`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAnalysis {
    pub id: HistoryId,
    pub name: String,
    pub saved_at: DateTime<Utc>,
    pub selected_kpis: Vec<String>,
    pub record_count: usize,
    pub payload: String,
}

impl StoredAnalysis {
    pub fn summary(&self) -> HistorySummary {
        HistorySummary {
            id: self.id.clone(),
            name: self.name.clone(),
            saved_at: self.saved_at,
            selected_kpis: self.selected_kpis.clone(),
            record_count: self.record_count,
        }
    }
}

/// Listing view of a saved analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub id: HistoryId,
    pub name: String,
    pub saved_at: DateTime<Utc>,
    pub selected_kpis: Vec<String>,
    pub record_count: usize,
}

/// Saved analysis with its result rehydrated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub id: HistoryId,
    pub name: String,
    pub saved_at: DateTime<Utc>,
    pub result: AnalysisResult,
}
