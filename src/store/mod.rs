//! Persistence layer — the `Database` trait, its backends, and the data context.

pub mod context;
pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod traits;

pub use context::{SaveSummary, TodoDbContext};
pub use libsql_backend::LibSqlBackend;
pub use memory::MemoryBackend;
pub use traits::{Change, Database};
