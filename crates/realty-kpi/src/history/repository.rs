use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::domain::{HistoryId, StoredAnalysis};

/// Storage abstraction for saved analyses.
pub trait HistoryRepository: Send + Sync {
    fn insert(&self, record: StoredAnalysis) -> Result<StoredAnalysis, RepositoryError>;
    fn fetch(&self, id: &HistoryId) -> Result<Option<StoredAnalysis>, RepositoryError>;
    /// Most recently saved first, at most `limit` entries.
    fn list(&self, limit: usize) -> Result<Vec<StoredAnalysis>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Process-local history store.
#[derive(Debug, Default, Clone)]
pub struct InMemoryHistoryRepository {
    records: Arc<Mutex<HashMap<HistoryId, StoredAnalysis>>>,
}

impl InMemoryHistoryRepository {
    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<HistoryId, StoredAnalysis>>, RepositoryError>
    {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("history mutex poisoned".to_string()))
    }
}

impl HistoryRepository for InMemoryHistoryRepository {
    fn insert(&self, record: StoredAnalysis) -> Result<StoredAnalysis, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &HistoryId) -> Result<Option<StoredAnalysis>, RepositoryError> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn list(&self, limit: usize) -> Result<Vec<StoredAnalysis>, RepositoryError> {
        let guard = self.lock()?;
        let mut records: Vec<StoredAnalysis> = guard.values().cloned().collect();
        records.sort_by(|a, b| b.saved_at.cmp(&a.saved_at).then_with(|| b.id.cmp(&a.id)));
        records.truncate(limit);
        Ok(records)
    }
}
