use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use super::traits::{Tool, ToolError, ToolSpec};

/// Name-indexed set of tools with a bounded invocation path.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its own name. A later registration replaces an
    /// earlier one with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|t| t.spec()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke `name` with `input`, failing with [`ToolError::Timeout`] if the
    /// call does not finish within `timeout`.
    pub async fn invoke(
        &self,
        name: &str,
        input: &str,
        timeout: Duration,
    ) -> Result<String, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tokio::time::timeout(timeout, tool.invoke(input))
            .await
            .map_err(|_| ToolError::Timeout(timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echo the input"
        }
        async fn invoke(&self, input: &str) -> Result<String, ToolError> {
            Ok(format!("echo: {input}"))
        }
    }

    struct Stall;

    #[async_trait]
    impl Tool for Stall {
        fn name(&self) -> &str {
            "stall"
        }
        fn description(&self) -> &str {
            "Never answers in time"
        }
        async fn invoke(&self, _input: &str) -> Result<String, ToolError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(String::new())
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo));
        registry.register(Arc::new(Stall));
        registry
    }

    #[test]
    fn lists_registered_tools_sorted() {
        let registry = registry();
        assert_eq!(registry.names(), vec!["echo", "stall"]);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("echo"));
        assert_eq!(registry.specs()[0].description, "Echo the input");
    }

    #[tokio::test]
    async fn invokes_by_name() {
        let out = registry()
            .invoke("echo", "hi", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(out, "echo: hi");
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let err = registry()
            .invoke("missing", "hi", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(name) if name == "missing"));
    }

    #[tokio::test]
    async fn slow_tool_times_out() {
        let err = registry()
            .invoke("stall", "hi", Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Timeout(_)));
    }
}
