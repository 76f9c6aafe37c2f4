use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Description of a tool, as exposed over the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("no tool registered under '{0}'")]
    NotFound(String),
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned status {status}")]
    Status { endpoint: String, status: u16 },
    #[error("tool timed out after {0:?}")]
    Timeout(Duration),
}

/// A backend capability the dialogue layer can invoke.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Safe, user-facing sentence explaining that this tool is unavailable.
    fn failure_message(&self) -> &str {
        "The service is currently unavailable."
    }

    /// Run the tool with the user's query or a synthesized summary.
    async fn invoke(&self, input: &str) -> Result<String, ToolError>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
        }
    }
}
