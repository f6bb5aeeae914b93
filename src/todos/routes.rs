//! REST endpoints for todo items.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use tracing::debug;

use super::controller::{ActionResult, TodoController};
use super::model::TodoItem;
use crate::error::ApiError;
use crate::store::{Database, TodoDbContext};

/// Shared state for todo routes.
#[derive(Clone)]
pub struct TodoRouteState {
    pub db: Arc<dyn Database>,
}

impl TodoRouteState {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// A controller over a fresh context for one request.
    fn controller(&self) -> TodoController {
        TodoController::new(TodoDbContext::new(Arc::clone(&self.db)))
    }
}

/// Turn an extractor rejection into a JSON 400 instead of axum's plain-text body.
fn rejected<T>(reason: impl std::fmt::Display) -> Result<ActionResult<T>, ApiError> {
    debug!(%reason, "Request rejected");
    Ok(ActionResult::BadRequest(reason.to_string()))
}

/// GET /api/todoitems
async fn list_todo_items(
    State(state): State<TodoRouteState>,
) -> Result<ActionResult<Vec<TodoItem>>, ApiError> {
    state.controller().get_todo_items().await
}

/// GET /api/todoitems/{id}
async fn get_todo_item(
    State(state): State<TodoRouteState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ActionResult<TodoItem>, ApiError> {
    let Path(id) = match id {
        Ok(id) => id,
        Err(e) => return rejected(e.body_text()),
    };
    state.controller().get_todo_item(id).await
}

/// POST /api/todoitems
async fn create_todo_item(
    State(state): State<TodoRouteState>,
    item: Result<Json<TodoItem>, JsonRejection>,
) -> Result<ActionResult<TodoItem>, ApiError> {
    let Json(item) = match item {
        Ok(item) => item,
        Err(e) => return rejected(e.body_text()),
    };
    state.controller().create_todo_item(item).await
}

/// PUT /api/todoitems/{id}
async fn update_todo_item(
    State(state): State<TodoRouteState>,
    id: Result<Path<i64>, PathRejection>,
    item: Result<Json<TodoItem>, JsonRejection>,
) -> Result<ActionResult<()>, ApiError> {
    let (Path(id), Json(item)) = match (id, item) {
        (Ok(id), Ok(item)) => (id, item),
        (Err(e), _) => return rejected(e.body_text()),
        (_, Err(e)) => return rejected(e.body_text()),
    };
    state.controller().update_todo_item(id, item).await
}

/// DELETE /api/todoitems/{id}
async fn delete_todo_item(
    State(state): State<TodoRouteState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<ActionResult<()>, ApiError> {
    let Path(id) = match id {
        Ok(id) => id,
        Err(e) => return rejected(e.body_text()),
    };
    state.controller().delete_todo_item(id).await
}

/// Build the todo item REST routes.
pub fn todo_routes(state: TodoRouteState) -> Router {
    Router::new()
        .route(
            "/api/todoitems",
            get(list_todo_items).post(create_todo_item),
        )
        .route(
            "/api/todoitems/{id}",
            get(get_todo_item)
                .put(update_todo_item)
                .delete(delete_todo_item),
        )
        .with_state(state)
}
