//! Todo controller — maps the five REST verbs onto a `TodoDbContext`.

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{info, warn};

use super::model::TodoItem;
use crate::error::{ApiError, DatabaseError};
use crate::store::TodoDbContext;

/// Base path of the todo item resource.
pub const TODO_ITEMS_PATH: &str = "/api/todoitems";

/// Outcome of a controller action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult<T> {
    /// 200 with a body.
    Ok(T),
    /// 201 with a `Location` header and the created body.
    Created { location: String, body: T },
    /// 204, no body.
    NoContent,
    /// 404.
    NotFound,
    /// 400 with a reason.
    BadRequest(String),
}

impl<T> ActionResult<T> {
    pub fn status(&self) -> StatusCode {
        match self {
            ActionResult::Ok(_) => StatusCode::OK,
            ActionResult::Created { .. } => StatusCode::CREATED,
            ActionResult::NoContent => StatusCode::NO_CONTENT,
            ActionResult::NotFound => StatusCode::NOT_FOUND,
            ActionResult::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// The body, for `Ok` and `Created`.
    pub fn into_value(self) -> Option<T> {
        match self {
            ActionResult::Ok(body) | ActionResult::Created { body, .. } => Some(body),
            _ => None,
        }
    }
}

impl<T: Serialize> IntoResponse for ActionResult<T> {
    fn into_response(self) -> Response {
        match self {
            ActionResult::Ok(body) => (StatusCode::OK, Json(body)).into_response(),
            ActionResult::Created { location, body } => (
                StatusCode::CREATED,
                [(header::LOCATION, location)],
                Json(body),
            )
                .into_response(),
            ActionResult::NoContent => StatusCode::NO_CONTENT.into_response(),
            ActionResult::NotFound => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({"error": "Todo item not found"})),
            )
                .into_response(),
            ActionResult::BadRequest(reason) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": reason})),
            )
                .into_response(),
        }
    }
}

/// Location of a single todo item.
pub fn todo_item_location(id: i64) -> String {
    format!("{TODO_ITEMS_PATH}/{id}")
}

/// Controller over one data context.
pub struct TodoController {
    context: TodoDbContext,
}

impl TodoController {
    pub fn new(context: TodoDbContext) -> Self {
        Self { context }
    }

    #[cfg(test)]
    fn context(&self) -> &TodoDbContext {
        &self.context
    }

    /// GET /api/todoitems
    pub async fn get_todo_items(&self) -> Result<ActionResult<Vec<TodoItem>>, ApiError> {
        let items = self.context.query_all().await?;
        Ok(ActionResult::Ok(items))
    }

    /// GET /api/todoitems/{id}
    pub async fn get_todo_item(&self, id: i64) -> Result<ActionResult<TodoItem>, ApiError> {
        Ok(match self.context.find_by_id(id).await? {
            Some(item) => ActionResult::Ok(item),
            None => ActionResult::NotFound,
        })
    }

    /// POST /api/todoitems
    ///
    /// Any id in the body is ignored; the store assigns one.
    pub async fn create_todo_item(
        &mut self,
        item: TodoItem,
    ) -> Result<ActionResult<TodoItem>, ApiError> {
        self.context.add(TodoItem { id: 0, ..item });
        let created = self
            .context
            .save()
            .await?
            .added
            .pop()
            .ok_or_else(|| DatabaseError::Query("insert returned no row".to_string()))?;

        info!(id = created.id, title = %created.title, "Todo item created");
        Ok(ActionResult::Created {
            location: todo_item_location(created.id),
            body: created,
        })
    }

    /// PUT /api/todoitems/{id}
    ///
    /// The body may omit its id (or send 0); a different non-zero id is
    /// rejected.
    pub async fn update_todo_item(
        &mut self,
        id: i64,
        item: TodoItem,
    ) -> Result<ActionResult<()>, ApiError> {
        if item.id != 0 && item.id != id {
            warn!(path_id = id, body_id = item.id, "Todo item id mismatch");
            return Ok(ActionResult::BadRequest(format!(
                "Body id {} does not match path id {id}",
                item.id
            )));
        }

        let Some(mut existing) = self.context.find_by_id(id).await? else {
            return Ok(ActionResult::NotFound);
        };

        existing.apply(&item);
        self.context.update(existing);
        self.context.save().await?;

        info!(id, "Todo item updated");
        Ok(ActionResult::NoContent)
    }

    /// DELETE /api/todoitems/{id}
    pub async fn delete_todo_item(&mut self, id: i64) -> Result<ActionResult<()>, ApiError> {
        let Some(existing) = self.context.find_by_id(id).await? else {
            return Ok(ActionResult::NotFound);
        };

        self.context.remove(&existing);
        self.context.save().await?;

        info!(id, "Todo item deleted");
        Ok(ActionResult::NoContent)
    }
}
