//! Prompt rows

use serde::{Deserialize, Serialize};

/// A prompt row joined with its category, as the storage layer returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRecord {
    /// Internal numeric id (never leaves the process)
    pub id: i64,
    /// Title
    pub title: String,
    /// Optional free-text description
    #[serde(default)]
    pub description: Option<String>,
    /// Prompt body, may contain `{{variable}}` placeholders
    pub content: String,
    /// Joined category name
    #[serde(default, alias = "category")]
    pub category_name: Option<String>,
    /// Joined category color
    #[serde(default)]
    pub category_color: Option<String>,
    /// Tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Favorite flag
    #[serde(default)]
    pub is_favorite: bool,
    /// Creation timestamp as stored
    #[serde(default)]
    pub created_at: String,
    /// Last update timestamp as stored
    #[serde(default)]
    pub updated_at: String,
}

impl PromptRecord {
    /// Minimal record with only the required fields set.
    pub fn new(id: i64, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            content: content.into(),
            category_name: None,
            category_color: None,
            tags: Vec::new(),
            is_favorite: false,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_category_alias_and_defaults() {
        let record: PromptRecord = serde_json::from_value(serde_json::json!({
            "id": 5,
            "title": "Test",
            "content": "Hi {{name}}",
            "category": "Greetings"
        }))
        .unwrap();

        assert_eq!(record.id, 5);
        assert_eq!(record.category_name.as_deref(), Some("Greetings"));
        assert!(record.tags.is_empty());
        assert!(!record.is_favorite);
        assert!(record.description.is_none());
    }
}
