//! `TodoDbContext` — per-request unit of work over a `Database` handle.
//!
//! Reads go straight to the store. Writes are staged in memory and only
//! reach the store when `save()` commits them as one atomic batch.

use std::sync::Arc;

use tracing::debug;

use crate::error::DatabaseError;
use crate::store::traits::{Change, Database};
use crate::todos::model::TodoItem;

/// Outcome of a `save()` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveSummary {
    /// Inserted rows with their store-assigned ids, in the order they were added.
    pub added: Vec<TodoItem>,
    pub modified: usize,
    pub removed: usize,
}

impl SaveSummary {
    /// Total number of rows written.
    pub fn total(&self) -> usize {
        self.added.len() + self.modified + self.removed
    }
}

/// Data context for todo items.
pub struct TodoDbContext {
    db: Arc<dyn Database>,
    pending: Vec<Change>,
}

impl TodoDbContext {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self {
            db,
            pending: Vec::new(),
        }
    }

    /// The store this context writes to.
    #[cfg(test)]
    fn database(&self) -> &Arc<dyn Database> {
        &self.db
    }

    /// Stage a new item. Its id is assigned on `save()`.
    pub fn add(&mut self, item: TodoItem) {
        self.pending.push(Change::Added(item));
    }

    /// Stage several new items.
    pub fn add_range(&mut self, items: impl IntoIterator<Item = TodoItem>) {
        self.pending.extend(items.into_iter().map(Change::Added));
    }

    /// Stage a replacement of title and description for `item.id`.
    pub fn update(&mut self, item: TodoItem) {
        self.pending.push(Change::Modified(item));
    }

    /// Stage removal of `item`.
    pub fn remove(&mut self, item: &TodoItem) {
        self.pending.push(Change::Removed(item.id));
    }

    /// Look up a persisted item by id, as it will look after `save()`.
    ///
    /// Staged updates and removals of that id are taken into account; staged
    /// inserts have no id yet and are never returned.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<TodoItem>, DatabaseError> {
        for change in self.pending.iter().rev() {
            match change {
                Change::Removed(removed) if *removed == id => return Ok(None),
                Change::Modified(item) if item.id == id => {
                    return Ok(self.db.get_todo(id).await?.map(|mut stored| {
                        stored.apply(item);
                        stored
                    }));
                }
                _ => {}
            }
        }
        self.db.get_todo(id).await
    }

    /// All committed items, ordered by id.
    pub async fn query_all(&self) -> Result<Vec<TodoItem>, DatabaseError> {
        self.db.list_todos().await
    }

    /// Number of committed items.
    pub async fn count(&self) -> Result<usize, DatabaseError> {
        self.db.count_todos().await
    }

    /// Whether any change is waiting for `save()`.
    pub fn has_changes(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Commit every pending change.
    ///
    /// Does not touch the store when nothing is pending. On failure the
    /// pending changes are kept.
    pub async fn save(&mut self) -> Result<SaveSummary, DatabaseError> {
        if self.pending.is_empty() {
            return Ok(SaveSummary::default());
        }

        let added = self.db.apply_changes(&self.pending).await?;
        let mut summary = SaveSummary {
            added,
            ..SaveSummary::default()
        };
        for change in self.pending.drain(..) {
            match change {
                Change::Added(_) => {}
                Change::Modified(_) => summary.modified += 1,
                Change::Removed(_) => summary.removed += 1,
            }
        }

        debug!(
            total = summary.total(),
            added = summary.added.len(),
            modified = summary.modified,
            removed = summary.removed,
            "Context saved"
        );
        Ok(summary)
    }
}
