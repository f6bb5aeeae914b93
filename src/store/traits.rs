//! `Database` trait — single async interface for todo persistence.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::todos::model::TodoItem;

/// A pending write, as staged by a `TodoDbContext`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Insert a new row. The item's id is ignored; the store assigns one.
    Added(TodoItem),
    /// Replace title and description of the row with the item's id.
    Modified(TodoItem),
    /// Delete the row with this id.
    Removed(i64),
}

/// Backend-agnostic database trait.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    /// Get a todo by ID.
    async fn get_todo(&self, id: i64) -> Result<Option<TodoItem>, DatabaseError>;

    /// List every todo, ordered by id.
    async fn list_todos(&self) -> Result<Vec<TodoItem>, DatabaseError>;

    /// Number of stored todos.
    async fn count_todos(&self) -> Result<usize, DatabaseError>;

    /// Apply a batch of changes atomically, in order.
    ///
    /// Returns the inserted rows with their assigned ids, in insertion order.
    /// If any `Modified` or `Removed` change targets a missing row the whole
    /// batch fails with `DatabaseError::NotFound` and nothing is written.
    async fn apply_changes(&self, changes: &[Change]) -> Result<Vec<TodoItem>, DatabaseError>;

    /// Remove every todo.
    async fn clear(&self) -> Result<(), DatabaseError>;
}
