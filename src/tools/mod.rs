//! Tool definitions advertised to the model and their local executors.
//!
//! The registry is built once at startup and shared read-only. Every
//! definition is forwarded to the provider; only tools with an executor are
//! run by the relay when the model calls them.
//!
//! - [`weather`]: Built-in `get_current_weather` tool (Open-Meteo)

pub mod weather;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::ToolsConfig;
use crate::error::Result;

/// A function tool as described to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema for the arguments object.
    pub parameters: Value,
}

/// Provider wire shape: `{"type": "function", "function": {...}}`.
#[derive(Debug, Serialize)]
pub struct ProviderTool<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: &'a ToolDefinition,
}

/// Runs a tool locally with the model-supplied arguments.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, args: Value) -> Result<Value>;
}

/// Immutable set of tools for the lifetime of the process.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
    executors: HashMap<String, Arc<dyn ToolExecutor>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("definitions", &self.definitions)
            .field("executors", &self.executors.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry described by the config.
    pub fn from_config(config: &ToolsConfig, client: reqwest::Client) -> Self {
        let mut registry = Self::new();
        if config.builtin_weather {
            let tool = weather::WeatherTool::new(client, &config.weather_base_url);
            registry = registry.with_executor(weather::definition(), Arc::new(tool));
        }
        for definition in &config.extra {
            registry = registry.with_definition(definition.clone());
        }
        registry
    }

    /// Add a definition without an executor. A definition with the same name
    /// replaces the earlier one.
    pub fn with_definition(mut self, definition: ToolDefinition) -> Self {
        self.executors.remove(&definition.name);
        self.insert(definition);
        self
    }

    /// Add a definition together with its executor.
    pub fn with_executor(mut self, definition: ToolDefinition, executor: Arc<dyn ToolExecutor>) -> Self {
        self.executors.insert(definition.name.clone(), executor);
        self.insert(definition);
        self
    }

    fn insert(&mut self, definition: ToolDefinition) {
        match self.definitions.iter_mut().find(|d| d.name == definition.name) {
            Some(existing) => {
                warn!(tool = %definition.name, "Replacing duplicate tool definition");
                *existing = definition;
            }
            None => self.definitions.push(definition),
        }
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn has_executor(&self, name: &str) -> bool {
        self.executors.contains_key(name)
    }

    /// Definitions in the provider's request shape.
    pub fn provider_tools(&self) -> Vec<ProviderTool<'_>> {
        self.definitions
            .iter()
            .map(|function| ProviderTool {
                kind: "function",
                function,
            })
            .collect()
    }

    /// Run the named tool. Returns `None` when the tool has no executor; a
    /// failing executor yields `{"error": message}` so the stream can go on.
    pub async fn execute(&self, name: &str, args: Value) -> Option<Value> {
        let executor = self.executors.get(name)?;
        debug!(tool = name, "Executing tool");
        match executor.execute(args).await {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(tool = name, error = %e, "Tool execution failed");
                Some(json!({ "error": e.to_string() }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RelayError;

    struct Echo;

    #[async_trait]
    impl ToolExecutor for Echo {
        async fn execute(&self, args: Value) -> Result<Value> {
            Ok(json!({ "echo": args }))
        }
    }

    struct Broken;

    #[async_trait]
    impl ToolExecutor for Broken {
        async fn execute(&self, _args: Value) -> Result<Value> {
            Err(RelayError::Tool {
                name: "broken".into(),
                message: "boom".into(),
            })
        }
    }

    fn def(name: &str) -> ToolDefinition {
        ToolDefinition {
            name: name.to_string(),
            description: format!("{name} tool"),
            parameters: json!({"type": "object", "properties": {}}),
        }
    }

    #[tokio::test]
    async fn test_execute_dispatches_by_name() {
        let registry = ToolRegistry::new()
            .with_executor(def("echo"), Arc::new(Echo))
            .with_definition(def("client_only"));

        assert_eq!(
            registry.execute("echo", json!({"a": 1})).await,
            Some(json!({"echo": {"a": 1}}))
        );
        assert_eq!(registry.execute("client_only", json!({})).await, None);
        assert_eq!(registry.execute("missing", json!({})).await, None);
    }

    #[tokio::test]
    async fn test_failing_executor_reports_error_value() {
        let registry = ToolRegistry::new().with_executor(def("broken"), Arc::new(Broken));
        let result = registry.execute("broken", json!({})).await.unwrap();
        assert_eq!(result, json!({"error": "tool broken failed: boom"}));
    }

    #[test]
    fn test_duplicate_definition_replaces_executor() {
        let registry = ToolRegistry::new()
            .with_executor(def("echo"), Arc::new(Echo))
            .with_definition(def("echo"));
        assert_eq!(registry.definitions().len(), 1);
        assert!(!registry.has_executor("echo"));
    }

    #[test]
    fn test_provider_tool_shape() {
        let registry = ToolRegistry::new().with_definition(def("lookup"));
        let value = serde_json::to_value(registry.provider_tools()).unwrap();
        assert_eq!(
            value,
            json!([{
                "type": "function",
                "function": {
                    "name": "lookup",
                    "description": "lookup tool",
                    "parameters": {"type": "object", "properties": {}}
                }
            }])
        );
    }

    #[test]
    fn test_from_config_registers_builtin_weather() {
        let config = ToolsConfig {
            extra: vec![def("search")],
            ..ToolsConfig::default()
        };
        let registry = ToolRegistry::from_config(&config, reqwest::Client::new());
        let names: Vec<_> = registry.definitions().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec![weather::NAME, "search"]);
        assert!(registry.has_executor(weather::NAME));
        assert!(!registry.has_executor("search"));
    }

    #[test]
    fn test_disabled_weather_leaves_registry_empty() {
        let config = ToolsConfig {
            builtin_weather: false,
            ..ToolsConfig::default()
        };
        let registry = ToolRegistry::from_config(&config, reqwest::Client::new());
        assert!(registry.is_empty());
        assert!(registry.provider_tools().is_empty());
    }
}
