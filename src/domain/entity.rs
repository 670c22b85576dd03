use serde::{Deserialize, Serialize};

use super::ids::EntityId;

/// Metadata of a rated entity, as far as the profile join needs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub title: String,
    pub category: String,
}

impl Entity {
    pub fn new(id: EntityId, title: &str, category: &str) -> Self {
        Self {
            id,
            title: title.trim().to_string(),
            category: category.trim().to_string(),
        }
    }
}
