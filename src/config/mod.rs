pub mod schema;

pub use schema::{
    config_dir, ClassifierConfig, Config, ContextBackend, ContextConfig, DialogueConfig,
    GatewayConfig, ToolsConfig,
};
