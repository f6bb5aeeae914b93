//! libSQL backend — async `Database` trait implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{Change, Database};
use crate::todos::model::TodoItem;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
/// A write batch holds the connection's only transaction, so readers take
/// the shared side of `lock` and never observe an uncommitted batch.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    lock: RwLock<()>,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        Ok(Self {
            db: Arc::new(db),
            conn,
            lock: RwLock::new(()),
        })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Column list for todo SELECT queries.
const TODO_COLUMNS: &str = "id, title, description";

fn row_to_todo(row: &libsql::Row) -> Result<TodoItem, DatabaseError> {
    let id: i64 = row
        .get(0)
        .map_err(|e| DatabaseError::Query(format!("todo.id: {e}")))?;
    let title: String = row
        .get(1)
        .map_err(|e| DatabaseError::Query(format!("todo.title: {e}")))?;
    let description: String = row
        .get(2)
        .map_err(|e| DatabaseError::Query(format!("todo.description: {e}")))?;

    Ok(TodoItem {
        id,
        title,
        description,
    })
}

/// Apply each change on `conn`, which is expected to be inside a transaction.
async fn apply_in(conn: &Connection, changes: &[Change]) -> Result<Vec<TodoItem>, DatabaseError> {
    let mut added = Vec::new();

    for change in changes {
        match change {
            Change::Added(item) => {
                conn.execute(
                    "INSERT INTO todo_items (title, description) VALUES (?1, ?2)",
                    params![item.title.as_str(), item.description.as_str()],
                )
                .await
                .map_err(|e| DatabaseError::Query(format!("insert_todo: {e}")))?;

                let id = conn.last_insert_rowid();
                debug!(id, "Todo inserted");
                added.push(TodoItem {
                    id,
                    ..item.clone()
                });
            }
            Change::Modified(item) => {
                let count = conn
                    .execute(
                        "UPDATE todo_items SET title = ?1, description = ?2 WHERE id = ?3",
                        params![item.title.as_str(), item.description.as_str(), item.id],
                    )
                    .await
                    .map_err(|e| DatabaseError::Query(format!("update_todo: {e}")))?;
                if count == 0 {
                    return Err(DatabaseError::todo_not_found(item.id));
                }
                debug!(id = item.id, "Todo updated");
            }
            Change::Removed(id) => {
                let count = conn
                    .execute("DELETE FROM todo_items WHERE id = ?1", params![*id])
                    .await
                    .map_err(|e| DatabaseError::Query(format!("delete_todo: {e}")))?;
                if count == 0 {
                    return Err(DatabaseError::todo_not_found(*id));
                }
                debug!(id = *id, "Todo deleted");
            }
        }
    }

    Ok(added)
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn get_todo(&self, id: i64) -> Result<Option<TodoItem>, DatabaseError> {
        let _guard = self.lock.read().await;
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {TODO_COLUMNS} FROM todo_items WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_todo: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_todo(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_todo row: {e}"))),
        }
    }

    async fn list_todos(&self) -> Result<Vec<TodoItem>, DatabaseError> {
        let _guard = self.lock.read().await;
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {TODO_COLUMNS} FROM todo_items ORDER BY id ASC"),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_todos: {e}")))?;

        let mut todos = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_todos row: {e}")))?
        {
            todos.push(row_to_todo(&row)?);
        }
        Ok(todos)
    }

    async fn count_todos(&self) -> Result<usize, DatabaseError> {
        let _guard = self.lock.read().await;
        let conn = self.conn();
        let mut rows = conn
            .query("SELECT COUNT(*) FROM todo_items", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("count_todos: {e}")))?;

        let count: i64 = match rows.next().await {
            Ok(Some(row)) => row
                .get(0)
                .map_err(|e| DatabaseError::Query(format!("count_todos row: {e}")))?,
            Ok(None) => 0,
            Err(e) => return Err(DatabaseError::Query(format!("count_todos: {e}"))),
        };
        Ok(count as usize)
    }

    async fn apply_changes(&self, changes: &[Change]) -> Result<Vec<TodoItem>, DatabaseError> {
        let _guard = self.lock.write().await;

        let tx = self
            .conn()
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("begin transaction: {e}")))?;

        match apply_in(&tx, changes).await {
            Ok(added) => {
                tx.commit()
                    .await
                    .map_err(|e| DatabaseError::Query(format!("commit: {e}")))?;
                debug!(changes = changes.len(), "Changes committed");
                Ok(added)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn clear(&self) -> Result<(), DatabaseError> {
        let _guard = self.lock.write().await;
        self.conn()
            .execute("DELETE FROM todo_items", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("clear: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    fn make_todo(title: &str) -> TodoItem {
        TodoItem::new(title, format!("{title} description"))
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let db = test_db().await;
        let added = db
            .apply_changes(&[
                Change::Added(make_todo("Item 1")),
                Change::Added(make_todo("Item 2")),
            ])
            .await
            .unwrap();

        assert_eq!(added.len(), 2);
        assert_eq!(added[0].id, 1);
        assert_eq!(added[1].id, 2);
        assert_eq!(added[1].title, "Item 2");
    }

    #[tokio::test]
    async fn insert_and_get_by_id() {
        let db = test_db().await;
        let added = db
            .apply_changes(&[Change::Added(make_todo("Item"))])
            .await
            .unwrap();
        let id = added[0].id;

        let fetched = db.get_todo(id).await.unwrap().unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.title, "Item");
        assert_eq!(fetched.description, "Item description");
    }

    #[tokio::test]
    async fn get_by_id_not_found() {
        let db = test_db().await;
        assert!(db.get_todo(100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_ordered_by_id() {
        let db = test_db().await;
        db.apply_changes(&[
            Change::Added(make_todo("b")),
            Change::Added(make_todo("a")),
            Change::Added(make_todo("c")),
        ])
        .await
        .unwrap();

        let todos = db.list_todos().await.unwrap();
        let titles: Vec<&str> = todos.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["b", "a", "c"]);
        assert_eq!(db.count_todos().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn modify_and_remove() {
        let db = test_db().await;
        let added = db
            .apply_changes(&[Change::Added(make_todo("one")), Change::Added(make_todo("two"))])
            .await
            .unwrap();

        let mut first = added[0].clone();
        first.title = "one (edited)".into();
        db.apply_changes(&[Change::Modified(first), Change::Removed(added[1].id)])
            .await
            .unwrap();

        let todos = db.list_todos().await.unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].title, "one (edited)");
    }

    #[tokio::test]
    async fn failing_batch_is_rolled_back() {
        let db = test_db().await;
        let err = db
            .apply_changes(&[Change::Added(make_todo("kept?")), Change::Removed(42)])
            .await
            .unwrap_err();

        assert!(matches!(err, DatabaseError::NotFound { .. }));
        assert_eq!(db.count_todos().await.unwrap(), 0);

        // The connection is usable again after the rollback.
        db.apply_changes(&[Change::Added(make_todo("after"))])
            .await
            .unwrap();
        assert_eq!(db.count_todos().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn modify_missing_row_is_not_found() {
        let db = test_db().await;
        let ghost = TodoItem {
            id: 7,
            ..make_todo("ghost")
        };
        let err = db.apply_changes(&[Change::Modified(ghost)]).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { ref id, .. } if id == "7"));
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let db = test_db().await;
        let added = db
            .apply_changes(&[Change::Added(make_todo("first"))])
            .await
            .unwrap();
        db.apply_changes(&[Change::Removed(added[0].id)]).await.unwrap();

        let again = db
            .apply_changes(&[Change::Added(make_todo("second"))])
            .await
            .unwrap();
        assert!(again[0].id > added[0].id);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let db = test_db().await;
        db.apply_changes(&[Change::Added(make_todo("x")), Change::Added(make_todo("y"))])
            .await
            .unwrap();
        db.clear().await.unwrap();
        assert_eq!(db.count_todos().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn readers_never_see_uncommitted_batch() {
        let db = Arc::new(test_db().await);

        let writer = {
            let db = Arc::clone(&db);
            tokio::spawn(async move {
                for _ in 0..20 {
                    let mut batch: Vec<Change> =
                        (0..200).map(|i| Change::Added(make_todo(&format!("t{i}")))).collect();
                    batch.push(Change::Removed(9_999_999));
                    assert!(db.apply_changes(&batch).await.is_err());
                }
            })
        };

        let reader = {
            let db = Arc::clone(&db);
            tokio::spawn(async move {
                let mut max_seen = 0;
                for _ in 0..500 {
                    max_seen = max_seen.max(db.count_todos().await.unwrap());
                    max_seen = max_seen.max(db.list_todos().await.unwrap().len());
                    tokio::task::yield_now().await;
                }
                max_seen
            })
        };

        writer.await.unwrap();
        let max_seen = reader.await.unwrap();

        assert_eq!(db.count_todos().await.unwrap(), 0);
        assert_eq!(max_seen, 0, "reader observed rows from a rolled-back batch");
    }

    #[tokio::test]
    async fn undecodable_description_is_a_query_error() {
        let db = test_db().await;
        db.conn()
            .execute(
                "INSERT INTO todo_items (title, description) VALUES ('blob', X'00FF')",
                (),
            )
            .await
            .unwrap();

        let err = db.list_todos().await.unwrap_err();
        assert!(
            matches!(err, DatabaseError::Query(ref msg) if msg.contains("todo.description"))
        );
    }

    #[tokio::test]
    async fn open_in_memory_creates_tables() {
        let db = test_db().await;
        let mut rows = db
            .conn()
            .query(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='todo_items'",
                (),
            )
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        let count: i64 = row.get(0).unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn local_file_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("todos.db");

        {
            let db = LibSqlBackend::new_local(&path).await.unwrap();
            db.apply_changes(&[Change::Added(make_todo("durable"))])
                .await
                .unwrap();
        }

        let db = LibSqlBackend::new_local(&path).await.unwrap();
        let todos = db.list_todos().await.unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].title, "durable");
    }
}
