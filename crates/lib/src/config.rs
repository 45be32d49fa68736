//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.wa-orchestrator/config.json`) and environment.
//! Environment variables override file values; secrets may also come from `<VAR>_FILE`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_APP_NAME: &str = "alma";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const ALLOWED_ENVS: [&str; 3] = ["dev", "qa", "prod"];

/// Top-level application config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Deployment environment: "dev", "qa" or "prod". Overridden by ENV.
    #[serde(default = "default_env")]
    pub env: String,

    /// Downstream agent service.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Channel settings (WhatsApp Business).
    #[serde(default)]
    pub channels: ChannelsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            env: default_env(),
            agent: AgentConfig::default(),
            channels: ChannelsConfig::default(),
        }
    }
}

/// Server bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 8080). Overridden by PORT.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Agent endpoint. When `url` is unset (and AGENT_URL is empty) inbound messages are only logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    /// Full URL the agent request is POSTed to. Overridden by AGENT_URL.
    pub url: Option<String>,

    /// `appName` sent with every agent request. Overridden by AGENT_APP_NAME.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            url: None,
            app_name: default_app_name(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Per-channel config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsConfig {
    #[serde(default)]
    pub whatsapp: WhatsAppChannelConfig,
}

/// WhatsApp Business config. Replies are relayed only when both `api_url` and `access_token` resolve.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppChannelConfig {
    /// Send-message endpoint (e.g. https://graph.facebook.com/v21.0/<phone-number-id>/messages). Overridden by WHATSAPP_API_URL.
    pub api_url: Option<String>,
    /// Bearer token for the send-message endpoint. Overridden by WHATSAPP_ACCESS_TOKEN or WHATSAPP_ACCESS_TOKEN_FILE.
    pub access_token: Option<String>,
    /// Token Meta echoes back in `hub.verify_token` when subscribing the webhook. Overridden by WHATSAPP_VERIFY_TOKEN or WHATSAPP_VERIFY_TOKEN_FILE.
    pub verify_token: Option<String>,
    /// Send-message timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WhatsAppChannelConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            access_token: None,
            verify_token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_env() -> String {
    "dev".to_string()
}

fn default_app_name() -> String {
    DEFAULT_APP_NAME.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Settings resolved once at startup (config file + environment). Immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct Settings {
    pub env: String,
    pub bind: String,
    pub port: u16,
    pub agent_url: Option<String>,
    pub agent_app_name: String,
    pub agent_timeout: Duration,
    pub whatsapp_api_url: Option<String>,
    pub whatsapp_access_token: Option<String>,
    pub whatsapp_verify_token: Option<String>,
    pub whatsapp_timeout: Duration,
}

impl Settings {
    /// Resolve all settings from config and the process environment, then validate.
    pub fn resolve(config: &Config) -> Result<Self> {
        Self::resolve_with(config, |var| std::env::var(var).ok())
    }

    /// Like [`Settings::resolve`], reading variables through `lookup` instead of the process environment.
    pub fn resolve_with<F>(config: &Config, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |var: &str| non_blank(lookup(var));
        let port = match env("PORT") {
            Some(p) => p
                .parse::<u16>()
                .with_context(|| format!("PORT is not a valid port: {}", p))?,
            None => config.gateway.port,
        };
        let settings = Self {
            env: prefer(env("ENV"), Some(config.env.as_str())).unwrap_or_else(default_env),
            bind: config.gateway.bind.trim().to_string(),
            port,
            agent_url: prefer(env("AGENT_URL"), config.agent.url.as_deref()),
            agent_app_name: prefer(env("AGENT_APP_NAME"), Some(config.agent.app_name.as_str()))
                .unwrap_or_else(default_app_name),
            agent_timeout: Duration::from_secs(config.agent.timeout_secs),
            whatsapp_api_url: prefer(
                env("WHATSAPP_API_URL"),
                config.channels.whatsapp.api_url.as_deref(),
            ),
            whatsapp_access_token: prefer(
                env_or_file(&env, "WHATSAPP_ACCESS_TOKEN")?,
                config.channels.whatsapp.access_token.as_deref(),
            ),
            whatsapp_verify_token: prefer(
                env_or_file(&env, "WHATSAPP_VERIFY_TOKEN")?,
                config.channels.whatsapp.verify_token.as_deref(),
            ),
            whatsapp_timeout: Duration::from_secs(config.channels.whatsapp.timeout_secs),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Check values that serde cannot: env name and non-zero timeouts.
    pub fn validate(&self) -> Result<()> {
        if !ALLOWED_ENVS.contains(&self.env.as_str()) {
            anyhow::bail!(
                "invalid env {:?} (expected one of {})",
                self.env,
                ALLOWED_ENVS.join(", ")
            );
        }
        if self.agent_timeout.is_zero() {
            anyhow::bail!("agent.timeoutSecs must be greater than 0");
        }
        if self.whatsapp_timeout.is_zero() {
            anyhow::bail!("channels.whatsapp.timeoutSecs must be greater than 0");
        }
        Ok(())
    }
}

/// First non-blank value: the override (already trimmed) or the trimmed config value.
fn prefer(env_value: Option<String>, config_value: Option<&str>) -> Option<String> {
    env_value.or_else(|| {
        config_value
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Read `VAR`, or the contents of the file named by `VAR_FILE`. A `_FILE` pointing at a missing file is an error.
fn env_or_file(env: &dyn Fn(&str) -> Option<String>, var: &str) -> Result<Option<String>> {
    if let Some(v) = env(var) {
        return Ok(Some(v));
    }
    match env(&format!("{}_FILE", var)) {
        Some(path) => read_secret_file(Path::new(&path))
            .with_context(|| format!("{}_FILE points to an unreadable file: {}", var, path)),
        None => Ok(None),
    }
}

fn read_secret_file(path: &Path) -> Result<Option<String>> {
    let s = std::fs::read_to_string(path)?;
    let t = s.trim();
    Ok(if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("WA_ORCHESTRATOR_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".wa-orchestrator").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path (or the default). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
