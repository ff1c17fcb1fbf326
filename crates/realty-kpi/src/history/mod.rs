//! Saved analyses: the storage contract and the service that names, serializes and
//! rehydrates results. The storage engine is supplied by the embedding application.

pub mod domain;
pub mod repository;
pub mod service;

pub use domain::{HistoryEntry, HistoryId, HistorySummary, StoredAnalysis};
pub use repository::{HistoryRepository, InMemoryHistoryRepository, RepositoryError};
pub use service::{default_name, AnalysisHistoryService, HistoryError, DEFAULT_HISTORY_LIMIT};
