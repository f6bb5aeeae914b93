//! Todo List — CRUD HTTP API over a libSQL-backed store.

pub mod config;
pub mod error;
pub mod server;
pub mod store;
pub mod todos;
