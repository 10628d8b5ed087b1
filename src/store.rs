//! File-backed prompt catalog for the standalone binary
//!
//! The embedding application normally supplies its own [`PromptStore`]
//! over its database. When the gateway runs on its own, prompts are read
//! once from a YAML or JSON file:
//!
//! ```yaml
//! prompts:
//!   - id: 5
//!     title: Test
//!     content: "Hi {{name}}"
//!     category: General
//!     tags: [greeting]
//! ```
//!
//! [`PromptStore`]: prompt_gateway_core::PromptStore

use std::path::Path;

use prompt_gateway_core::{InMemoryPromptStore, PromptRecord};
use serde::Deserialize;

use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct PromptCatalog {
    #[serde(default)]
    prompts: Vec<PromptRecord>,
}

/// Load a catalog file into an in-memory store.
///
/// `.json` files are parsed as JSON, anything else as YAML.
pub fn load_prompt_file(path: &Path) -> Result<InMemoryPromptStore> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read prompts file {}: {e}", path.display()))
    })?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let catalog: PromptCatalog = if is_json {
        serde_json::from_str(&raw)?
    } else {
        serde_yaml::from_str(&raw)?
    };

    tracing::debug!(path = %path.display(), count = catalog.prompts.len(), "Loaded prompt catalog");
    Ok(InMemoryPromptStore::from_records(catalog.prompts))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use prompt_gateway_core::PromptStore;

    use super::*;

    #[tokio::test]
    async fn loads_yaml_catalog() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(
            concat!(
                "prompts:\n",
                "  - id: 5\n",
                "    title: Test\n",
                "    content: \"Hi {{name}}\"\n",
                "    category: General\n",
                "    tags: [greeting]\n",
            )
            .as_bytes(),
        )
        .unwrap();

        let store = load_prompt_file(file.path()).unwrap();
        let prompt = store.get_prompt_by_id(5).await.unwrap().unwrap();
        assert_eq!(prompt.content, "Hi {{name}}");
        assert_eq!(prompt.category_name.as_deref(), Some("General"));
        assert_eq!(prompt.tags, vec!["greeting".to_string()]);
    }

    #[tokio::test]
    async fn loads_json_catalog() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(
            br#"{"prompts": [{"id": 1, "title": "One", "content": "first", "is_favorite": true}]}"#,
        )
        .unwrap();

        let store = load_prompt_file(file.path()).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get_prompt_by_id(1).await.unwrap().unwrap().is_favorite);
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = load_prompt_file(Path::new("/nonexistent/prompts.yaml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn invalid_yaml_is_reported() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "prompts: [{{id: not-a-number}}]").unwrap();
        assert!(matches!(load_prompt_file(file.path()), Err(Error::Yaml(_))));
    }
}
