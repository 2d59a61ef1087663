//! Per-parse deduplication of commit records.

use std::collections::HashMap;
use std::sync::Arc;

use crate::commit::CommitRecord;

/// Commit records seen so far in one parse, keyed by commit id.
///
/// Each record is built once and shared by every group or entry that
/// refers to it. A cache belongs to exactly one parse.
#[derive(Debug, Default)]
pub struct CommitCache {
    records: HashMap<String, Arc<CommitRecord>>,
}

impl CommitCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a record by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<CommitRecord>> {
        self.records.get(id).cloned()
    }

    /// Whether a record for `id` exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Return the cached record for `id`, building it with `create` on a miss.
    ///
    /// `create` runs at most once per id; an existing record is never replaced.
    ///
    /// # Errors
    /// Propagates the error from `create`; nothing is cached in that case.
    pub fn get_or_try_insert_with<E>(
        &mut self,
        id: &str,
        create: impl FnOnce() -> Result<CommitRecord, E>,
    ) -> Result<Arc<CommitRecord>, E> {
        if let Some(record) = self.records.get(id) {
            return Ok(Arc::clone(record));
        }

        let record = Arc::new(create()?);
        tracing::debug!(id, author = %record.author.name, "new commit record");
        self.records.insert(id.to_string(), Arc::clone(&record));
        Ok(record)
    }

    /// Number of distinct commits seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no commit has been seen yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
