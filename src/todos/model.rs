//! Todo data model.

use serde::{Deserialize, Serialize};

/// A single to-do item.
///
/// `id` is assigned by the store when the item is first saved. Request bodies
/// may omit it, in which case it deserializes to `0` ("not yet assigned").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    /// Store-assigned identifier.
    #[serde(default)]
    pub id: i64,
    /// Short title.
    pub title: String,
    /// Longer description.
    pub description: String,
}

impl TodoItem {
    /// Create an unsaved todo.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: 0,
            title: title.into(),
            description: description.into(),
        }
    }

    /// Whether the store has assigned an id yet.
    pub fn is_persisted(&self) -> bool {
        self.id > 0
    }

    /// Copy the mutable fields of `other` onto `self`, keeping the id.
    pub fn apply(&mut self, other: &TodoItem) {
        self.title.clone_from(&other.title);
        self.description.clone_from(&other.description);
    }
}
