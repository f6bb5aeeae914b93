//! Todo items — entity, controller, and HTTP routes.

pub mod controller;
pub mod model;
pub mod routes;

pub use controller::{ActionResult, TODO_ITEMS_PATH, TodoController};
pub use model::TodoItem;
pub use routes::{TodoRouteState, todo_routes};
