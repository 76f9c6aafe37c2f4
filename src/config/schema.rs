use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
#[cfg(unix)]
use tokio::fs::File;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

const CONFIG_FILE_NAME: &str = "config.toml";

// ── Top-level config ──────────────────────────────────────────────

/// Top-level router configuration, loaded from `config.toml`.
///
/// Resolution order: `IVR_CONFIG_DIR` env → `~/.ivr-router/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Routing thresholds and transfer limits (`[dialogue]`).
    #[serde(default)]
    pub dialogue: DialogueConfig,

    /// Intent classifier backend (`[classifier]`).
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Transcript storage (`[context]`).
    #[serde(default)]
    pub context: ContextConfig,

    /// Banking backend tools (`[tools]`).
    #[serde(default)]
    pub tools: ToolsConfig,

    /// HTTP gateway (`[gateway]`).
    #[serde(default)]
    pub gateway: GatewayConfig,
}

// ── Dialogue ──────────────────────────────────────────────────────

/// Dialogue routing configuration (`[dialogue]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueConfig {
    /// Minimum confidence to route a new intent. Default: `0.5`.
    #[serde(default = "default_routing_threshold")]
    pub routing_threshold: f64,
    /// Minimum confidence to abandon an active flow for a different intent.
    /// Default: `0.8`.
    #[serde(default = "default_switch_threshold")]
    pub switch_threshold: f64,
    /// Largest amount a single transfer may move. Default: `10000`.
    #[serde(default = "default_max_transfer_amount")]
    pub max_transfer_amount: u64,
    /// Symbol shown in transfer prompts. Default: `"$"`.
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_routing_threshold() -> f64 {
    0.5
}

fn default_switch_threshold() -> f64 {
    0.8
}

fn default_max_transfer_amount() -> u64 {
    10_000
}

fn default_currency_symbol() -> String {
    "$".into()
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            routing_threshold: default_routing_threshold(),
            switch_threshold: default_switch_threshold(),
            max_transfer_amount: default_max_transfer_amount(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

// ── Classifier ────────────────────────────────────────────────────

/// Intent classifier configuration (`[classifier]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Inference endpoint. When unset the built-in keyword classifier is used.
    /// Overridden by `IVR_CLASSIFIER_URL`.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Request timeout for the inference endpoint. Default: `10`.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maps `LABEL_<n>` model outputs (keyed by `n`) to intent names.
    #[serde(default)]
    pub id2label: HashMap<String, String>,
    /// Longest accepted utterance, in characters. Default: `500`.
    #[serde(default = "default_max_query_chars")]
    pub max_query_chars: usize,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_query_chars() -> usize {
    crate::security::DEFAULT_MAX_QUERY_CHARS
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_timeout_secs(),
            id2label: HashMap::new(),
            max_query_chars: default_max_query_chars(),
        }
    }
}

// ── Context ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContextBackend {
    #[default]
    Memory,
    Sqlite,
}

/// Transcript storage configuration (`[context]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// `"memory"` | `"sqlite"`. Default: `"memory"`.
    #[serde(default)]
    pub backend: ContextBackend,
    /// Transcript lines passed to the classifier as context. Default: `5`.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
    /// SQLite database file. Default: `context.db` beside `config.toml`.
    #[serde(default)]
    pub sqlite_path: Option<PathBuf>,
}

fn default_recent_limit() -> usize {
    5
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            backend: ContextBackend::default(),
            recent_limit: default_recent_limit(),
            sqlite_path: None,
        }
    }
}

// ── Tools ─────────────────────────────────────────────────────────

/// Banking backend configuration (`[tools]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Base URL of the banking REST backend. Overridden by `IVR_TOOLS_URL`.
    #[serde(default = "default_tools_base_url")]
    pub base_url: String,
    /// Per-call timeout, applied to the HTTP client and to each invocation.
    /// Default: `10`.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_tools_base_url() -> String {
    "http://localhost:5001".into()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            base_url: default_tools_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ── Gateway ───────────────────────────────────────────────────────

/// Gateway server configuration (`[gateway]` section).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway host (default: 127.0.0.1)
    #[serde(default = "default_gateway_host")]
    pub host: String,
    /// Gateway port (default: 5000)
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Whole-request timeout (default: 30)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Largest accepted request body (default: 64 KiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_gateway_host() -> String {
    "127.0.0.1".into()
}

fn default_gateway_port() -> u16 {
    5000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    65_536
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            request_timeout_secs: default_request_timeout_secs(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

// ── Config impl ──────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());

        Self {
            config_path: home.join(".ivr-router").join(CONFIG_FILE_NAME),
            dialogue: DialogueConfig::default(),
            classifier: ClassifierConfig::default(),
            context: ContextConfig::default(),
            tools: ToolsConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Directory holding `config.toml`: `IVR_CONFIG_DIR` if set, else `~/.ivr-router`.
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("IVR_CONFIG_DIR") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .context("Could not find home directory")?;
    Ok(home.join(".ivr-router"))
}

impl Config {
    pub async fn load_or_init() -> Result<Self> {
        Self::load_or_init_in(&config_dir()?).await
    }

    /// Load `config.toml` from `dir`, writing defaults first if it is absent.
    pub async fn load_or_init_in(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        fs::create_dir_all(dir).await.with_context(|| {
            format!("Failed to create config directory: {}", dir.display())
        })?;

        let initialized = !config_path.exists();
        let mut config = if initialized {
            let mut config = Config::default();
            config.config_path = config_path.clone();
            config.save().await?;
            config
        } else {
            let contents = fs::read_to_string(&config_path)
                .await
                .context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            // Set computed paths that are skipped during serialization
            config.config_path = config_path.clone();
            config
        };

        config.apply_env_overrides();
        config.validate()?;
        tracing::info!(
            path = %config.config_path.display(),
            initialized,
            "Config loaded"
        );
        Ok(config)
    }

    /// Directory holding `config.toml` and default data files.
    pub fn data_dir(&self) -> PathBuf {
        self.config_path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
    }

    /// Validate configuration values that would cause runtime failures.
    pub fn validate(&self) -> Result<()> {
        // Dialogue
        let d = &self.dialogue;
        for (name, value) in [
            ("dialogue.routing_threshold", d.routing_threshold),
            ("dialogue.switch_threshold", d.switch_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("{name} must be within [0, 1] (got {value})");
            }
        }
        if d.switch_threshold < d.routing_threshold {
            anyhow::bail!(
                "dialogue.switch_threshold ({}) must not be below dialogue.routing_threshold ({})",
                d.switch_threshold,
                d.routing_threshold
            );
        }
        if d.max_transfer_amount == 0 {
            anyhow::bail!("dialogue.max_transfer_amount must be greater than 0");
        }

        // Classifier
        if self.classifier.max_query_chars == 0 {
            anyhow::bail!("classifier.max_query_chars must be greater than 0");
        }

        // Tools
        if self.tools.base_url.trim().is_empty() {
            anyhow::bail!("tools.base_url must not be empty");
        }

        // Gateway
        if self.gateway.host.trim().is_empty() {
            anyhow::bail!("gateway.host must not be empty");
        }

        Ok(())
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        // Classifier endpoint: IVR_CLASSIFIER_URL
        if let Ok(url) = std::env::var("IVR_CLASSIFIER_URL") {
            let url = url.trim();
            self.classifier.endpoint = (!url.is_empty()).then(|| url.to_string());
        }

        // Banking backend: IVR_TOOLS_URL
        if let Ok(url) = std::env::var("IVR_TOOLS_URL") {
            if !url.trim().is_empty() {
                self.tools.base_url = url.trim().to_string();
            }
        }

        // Gateway port: IVR_GATEWAY_PORT or PORT
        if let Ok(port_str) = std::env::var("IVR_GATEWAY_PORT").or_else(|_| std::env::var("PORT"))
        {
            if let Ok(port) = port_str.parse::<u16>() {
                self.gateway.port = port;
            }
        }

        // Gateway host: IVR_GATEWAY_HOST or HOST
        if let Ok(host) = std::env::var("IVR_GATEWAY_HOST").or_else(|_| std::env::var("HOST")) {
            if !host.is_empty() {
                self.gateway.host = host;
            }
        }
    }

    pub async fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;

        let parent_dir = self
            .config_path
            .parent()
            .context("Config path must have a parent directory")?;

        fs::create_dir_all(parent_dir).await.with_context(|| {
            format!(
                "Failed to create config directory: {}",
                parent_dir.display()
            )
        })?;

        let file_name = self
            .config_path
            .file_name()
            .and_then(|v| v.to_str())
            .unwrap_or(CONFIG_FILE_NAME);
        let temp_path = parent_dir.join(format!(".{file_name}.tmp-{}", uuid::Uuid::new_v4()));
        let backup_path = parent_dir.join(format!("{file_name}.bak"));

        let mut temp_file = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to create temporary config file: {}",
                    temp_path.display()
                )
            })?;
        temp_file
            .write_all(toml_str.as_bytes())
            .await
            .context("Failed to write temporary config contents")?;
        temp_file
            .sync_all()
            .await
            .context("Failed to fsync temporary config file")?;
        drop(temp_file);

        let had_existing_config = self.config_path.exists();
        if had_existing_config {
            fs::copy(&self.config_path, &backup_path)
                .await
                .with_context(|| {
                    format!(
                        "Failed to create config backup before atomic replace: {}",
                        backup_path.display()
                    )
                })?;
        }

        if let Err(e) = fs::rename(&temp_path, &self.config_path).await {
            let _ = fs::remove_file(&temp_path).await;
            if had_existing_config && backup_path.exists() {
                fs::copy(&backup_path, &self.config_path)
                    .await
                    .context("Failed to restore config backup")?;
            }
            anyhow::bail!("Failed to atomically replace config file: {e}");
        }

        sync_directory(parent_dir).await?;

        if had_existing_config {
            let _ = fs::remove_file(&backup_path).await;
        }

        Ok(())
    }
}

async fn sync_directory(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        let dir = File::open(path)
            .await
            .with_context(|| format!("Failed to open directory for fsync: {}", path.display()))?;
        dir.sync_all()
            .await
            .with_context(|| format!("Failed to fsync directory metadata: {}", path.display()))?;
        Ok(())
    }

    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::{Mutex, MutexGuard};
    use tokio::test;

    async fn env_override_lock() -> MutexGuard<'static, ()> {
        static ENV_OVERRIDE_TEST_LOCK: Mutex<()> = Mutex::const_new(());
        ENV_OVERRIDE_TEST_LOCK.lock().await
    }

    fn clear_env_test_vars() {
        for key in [
            "IVR_CLASSIFIER_URL",
            "IVR_TOOLS_URL",
            "IVR_GATEWAY_PORT",
            "IVR_GATEWAY_HOST",
            "PORT",
            "HOST",
        ] {
            std::env::remove_var(key);
        }
    }

    // ── Defaults ─────────────────────────────────────────────

    #[test]
    async fn config_default_has_sane_values() {
        let c = Config::default();
        assert!((c.dialogue.routing_threshold - 0.5).abs() < f64::EPSILON);
        assert!((c.dialogue.switch_threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(c.dialogue.max_transfer_amount, 10_000);
        assert_eq!(c.classifier.max_query_chars, 500);
        assert!(c.classifier.endpoint.is_none());
        assert_eq!(c.context.backend, ContextBackend::Memory);
        assert_eq!(c.tools.base_url, "http://localhost:5001");
        assert_eq!(c.gateway.port, 5000);
        assert!(c.config_path.to_string_lossy().contains("config.toml"));
        assert!(c.validate().is_ok());
    }

    #[test]
    async fn partial_toml_fills_defaults() {
        let raw = r#"
            [dialogue]
            switch_threshold = 0.9

            [context]
            backend = "sqlite"

            [classifier.id2label]
            0 = "balance"
            1 = "transfer"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert!((config.dialogue.switch_threshold - 0.9).abs() < f64::EPSILON);
        assert!((config.dialogue.routing_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.context.backend, ContextBackend::Sqlite);
        assert_eq!(config.context.recent_limit, 5);
        assert_eq!(
            config.classifier.id2label.get("1").map(String::as_str),
            Some("transfer")
        );
        assert_eq!(config.gateway.host, "127.0.0.1");
    }

    // ── Validation ───────────────────────────────────────────

    #[test]
    async fn validate_rejects_out_of_range_thresholds() {
        let mut c = Config::default();
        c.dialogue.routing_threshold = 1.5;
        assert!(c.validate().is_err());

        let mut c = Config::default();
        c.dialogue.switch_threshold = 0.3;
        let err = c.validate().unwrap_err().to_string();
        assert!(err.contains("switch_threshold"));
    }

    #[test]
    async fn validate_rejects_zero_limits_and_empty_host() {
        let mut c = Config::default();
        c.dialogue.max_transfer_amount = 0;
        assert!(c.validate().is_err());

        let mut c = Config::default();
        c.gateway.host = "  ".into();
        assert!(c.validate().is_err());
    }

    // ── Env overrides ────────────────────────────────────────

    #[test]
    async fn env_override_endpoints() {
        let _env_guard = env_override_lock().await;
        clear_env_test_vars();
        let mut config = Config::default();

        std::env::set_var("IVR_CLASSIFIER_URL", "http://model:8000/classify");
        std::env::set_var("IVR_TOOLS_URL", "http://bank:5001");
        config.apply_env_overrides();
        assert_eq!(
            config.classifier.endpoint.as_deref(),
            Some("http://model:8000/classify")
        );
        assert_eq!(config.tools.base_url, "http://bank:5001");

        clear_env_test_vars();
    }

    #[test]
    async fn env_override_gateway_with_fallbacks() {
        let _env_guard = env_override_lock().await;
        clear_env_test_vars();
        let mut config = Config::default();

        std::env::set_var("PORT", "8080");
        std::env::set_var("HOST", "0.0.0.0");
        config.apply_env_overrides();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.host, "0.0.0.0");

        std::env::set_var("IVR_GATEWAY_PORT", "9090");
        std::env::set_var("PORT", "not-a-port");
        config.apply_env_overrides();
        assert_eq!(config.gateway.port, 9090);

        clear_env_test_vars();
    }

    #[test]
    async fn env_override_blank_classifier_url_clears_endpoint() {
        let _env_guard = env_override_lock().await;
        clear_env_test_vars();
        let mut config = Config::default();
        config.classifier.endpoint = Some("http://old".into());

        std::env::set_var("IVR_CLASSIFIER_URL", "");
        config.apply_env_overrides();
        assert!(config.classifier.endpoint.is_none());

        clear_env_test_vars();
    }

    // ── Persistence ──────────────────────────────────────────

    #[test]
    async fn load_or_init_creates_then_reloads() {
        let _env_guard = env_override_lock().await;
        clear_env_test_vars();
        let tmp = tempfile::TempDir::new().unwrap();

        let first = Config::load_or_init_in(tmp.path()).await.unwrap();
        assert!(tmp.path().join("config.toml").exists());
        assert_eq!(first.data_dir(), tmp.path());

        let mut edited = first.clone();
        edited.dialogue.max_transfer_amount = 2_500;
        edited.save().await.unwrap();

        let reloaded = Config::load_or_init_in(tmp.path()).await.unwrap();
        assert_eq!(reloaded.dialogue.max_transfer_amount, 2_500);
        assert_eq!(reloaded.config_path, tmp.path().join("config.toml"));
    }

    #[test]
    async fn save_leaves_no_temp_or_backup_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.config_path = tmp.path().join("config.toml");
        config.save().await.unwrap();
        config.save().await.unwrap();

        let mut names = Vec::new();
        let mut entries = fs::read_dir(tmp.path()).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["config.toml".to_string()]);
    }

    #[test]
    async fn invalid_file_is_reported() {
        let _env_guard = env_override_lock().await;
        clear_env_test_vars();
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("config.toml"),
            "[dialogue]\nrouting_threshold = 0.9\nswitch_threshold = 0.6\n",
        )
        .unwrap();
        assert!(Config::load_or_init_in(tmp.path()).await.is_err());
    }
}
