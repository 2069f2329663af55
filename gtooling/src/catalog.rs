//! Ordered catalog of callable tool schemas.
//!
//! The catalog only describes tools; it never runs them.
//!
//! ```rust
//! use gprovider::ToolDefinition;
//! use gtooling::ToolCatalog;
//!
//! let mut catalog = ToolCatalog::new();
//! catalog
//!     .register(ToolDefinition {
//!         name: "read_file".to_string(),
//!         description: "Read a project file".to_string(),
//!         input_schema: r#"{"type":"object","required":["path"]}"#.to_string(),
//!     })
//!     .expect("schema is valid JSON");
//!
//! assert!(catalog.contains("read_file"));
//! assert_eq!(catalog.definitions().len(), 1);
//! ```

use gcommon::Registry;
use gprovider::ToolDefinition;
use serde_json::Value;

use crate::ToolError;

#[derive(Debug, Clone)]
struct CatalogEntry {
    definition: ToolDefinition,
    schema: Value,
}

#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Registry<String, CatalogEntry>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_definitions(
        definitions: impl IntoIterator<Item = ToolDefinition>,
    ) -> Result<Self, ToolError> {
        let mut catalog = Self::new();
        for definition in definitions {
            catalog.register(definition)?;
        }
        Ok(catalog)
    }

    /// Adds or replaces a tool. The schema must be a JSON object.
    pub fn register(&mut self, definition: ToolDefinition) -> Result<(), ToolError> {
        if definition.name.trim().is_empty() {
            return Err(ToolError::invalid_arguments("tool name must not be empty"));
        }

        let schema = serde_json::from_str::<Value>(&definition.input_schema)
            .ok()
            .filter(Value::is_object)
            .ok_or_else(|| {
                ToolError::invalid_arguments("tool input schema must be a JSON object")
                    .with_tool_name(definition.name.clone())
            })?;

        self.tools
            .insert(definition.name.clone(), CatalogEntry { definition, schema });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name).map(|entry| &entry.definition)
    }

    pub fn schema(&self, name: &str) -> Option<&Value> {
        self.tools.get(name).map(|entry| &entry.schema)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|entry| entry.definition.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
