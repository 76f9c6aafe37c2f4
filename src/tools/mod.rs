//! Backend tools the dialogue manager dispatches fulfilled intents to.
//!
//! Each tool implements [`Tool`]. [`default_tools`] assembles a
//! [`ToolRegistry`] with one [`BankingApiTool`] per banking endpoint, all
//! sharing a single HTTP client bounded by the configured timeout.
//!
//! # Extension
//!
//! To route another intent to a backend, add an entry to
//! [`BANKING_ENDPOINTS`] or register a custom [`Tool`] on the registry.

pub mod banking;
pub mod registry;
pub mod traits;

pub use banking::{BankingApiTool, BankingEndpoint, BANKING_ENDPOINTS};
pub use registry::ToolRegistry;
pub use traits::{Tool, ToolError, ToolSpec};

use crate::config::ToolsConfig;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Create the default registry: every banking endpoint at `config.base_url`.
pub fn default_tools(config: &ToolsConfig) -> Result<ToolRegistry> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let mut registry = ToolRegistry::new();
    for endpoint in BANKING_ENDPOINTS {
        registry.register(Arc::new(BankingApiTool::new(
            *endpoint,
            &config.base_url,
            client.clone(),
        )));
    }
    Ok(registry)
}
