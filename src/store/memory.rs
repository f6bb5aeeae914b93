//! In-process `Database` implementation backed by an ordered map.
//!
//! Nothing is written to disk. Used by unit tests and by the server when
//! `TODO_LIST_DB_BACKEND=memory`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::DatabaseError;
use crate::store::traits::{Change, Database};
use crate::todos::model::TodoItem;

#[derive(Debug, Default)]
struct Tables {
    todos: BTreeMap<i64, TodoItem>,
    /// Last id handed out. Never decreases, so ids are not reused.
    last_id: i64,
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<Tables>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Database for MemoryBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn get_todo(&self, id: i64) -> Result<Option<TodoItem>, DatabaseError> {
        Ok(self.tables.read().await.todos.get(&id).cloned())
    }

    async fn list_todos(&self) -> Result<Vec<TodoItem>, DatabaseError> {
        Ok(self.tables.read().await.todos.values().cloned().collect())
    }

    async fn count_todos(&self) -> Result<usize, DatabaseError> {
        Ok(self.tables.read().await.todos.len())
    }

    async fn apply_changes(&self, changes: &[Change]) -> Result<Vec<TodoItem>, DatabaseError> {
        let mut tables = self.tables.write().await;

        // Work on a copy so a failing change leaves the committed state intact.
        let mut todos = tables.todos.clone();
        let mut last_id = tables.last_id;
        let mut added = Vec::new();

        for change in changes {
            match change {
                Change::Added(item) => {
                    last_id += 1;
                    let row = TodoItem {
                        id: last_id,
                        ..item.clone()
                    };
                    todos.insert(row.id, row.clone());
                    added.push(row);
                }
                Change::Modified(item) => {
                    let row = todos
                        .get_mut(&item.id)
                        .ok_or_else(|| DatabaseError::todo_not_found(item.id))?;
                    row.apply(item);
                }
                Change::Removed(id) => {
                    todos
                        .remove(id)
                        .ok_or_else(|| DatabaseError::todo_not_found(*id))?;
                }
            }
        }

        tables.todos = todos;
        tables.last_id = last_id;
        debug!(changes = changes.len(), "Changes committed to memory store");
        Ok(added)
    }

    async fn clear(&self) -> Result<(), DatabaseError> {
        self.tables.write().await.todos.clear();
        Ok(())
    }
}
