//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `relay.toml`.
//!     loads configuration from file or falls back to defaults, then applies
//!     environment overrides.
//!
//! structure:
//!     - ServerConfig: Where the http listener binds.
//!     - GenAiConfig: Model, endpoint and timeout of the generation service.
//!     - CorsConfig: Allowed browser origins (empty = any).
//!     - LoggingConfig: Default log level and payload logging toggle.
//!
//! secrets:
//!     the api key is read from GENAI_API_KEY (or genai.api_key in the file).
//!     there is no built-in fallback key: startup fails when none is set.
//!
//! ==============================================================================

use crate::error::ConfigError;

use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const ENV_API_KEY: &str = "GENAI_API_KEY";
pub const ENV_MODEL: &str = "GENAI_MODEL";
pub const ENV_BIND_ADDR: &str = "RELAY_BIND_ADDR";
pub const ENV_CONFIG_PATH: &str = "RELAY_CONFIG";

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub genai: GenAiConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct GenAiConfig {
    pub model: String,
    pub base_url: String,
    pub timeout_seconds: u64,
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CorsConfig {
    /// empty (or `["*"]`) allows any origin
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:8000".to_string() }
    }
}

impl Default for GenAiConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout_seconds: 30,
            api_key: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_sensor_data: true }
    }
}

// keep the key out of debug output
impl fmt::Debug for GenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenAiConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl CorsConfig {
    pub fn allows_any(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }
}

impl RelayConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Read {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from the first config file found, or defaults when there is none.
    /// A file that exists but does not parse is an error.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        let mut paths = Vec::new();
        if let Ok(explicit) = std::env::var(ENV_CONFIG_PATH) {
            paths.push(PathBuf::from(explicit));
        }
        paths.push(PathBuf::from("config").join("relay.toml"));
        paths.push(PathBuf::from("..").join("config").join("relay.toml"));

        for path in &paths {
            if path.exists() {
                let config = Self::load(path)?;
                println!("[CONFIG] Loaded from {}", path.display());
                return Ok(config);
            }
        }

        println!("[CONFIG] No config file found - using defaults");
        Ok(Self::default())
    }

    /// Apply environment overrides. `lookup` is `std::env::var` in production.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY) {
            self.genai.api_key = Some(key);
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.genai.model = model;
        }
        if let Some(addr) = lookup(ENV_BIND_ADDR) {
            self.server.bind_addr = addr;
        }
    }

    /// The configured api key, or an error when it is missing or blank.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        match self.genai.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key.to_string()),
            _ => Err(ConfigError::MissingApiKey),
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind_addr
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(self.server.bind_addr.clone()))
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        let origins = if self.cors.allows_any() {
            "*".to_string()
        } else {
            self.cors.allowed_origins.join(", ")
        };
        println!("┌─────────────────────────────────────────┐");
        println!("│          RELAY CONFIGURATION            │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Bind: {}", self.server.bind_addr);
        println!("│ Model: {}", self.genai.model);
        println!("│ Timeout: {}s", self.genai.timeout_seconds);
        println!("│ CORS Origins: {}", origins);
        println!("│ Log Level: {}", self.logging.level);
        println!("└─────────────────────────────────────────┘");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.server.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.genai.model, "gemini-1.5-flash");
        assert!(config.cors.allows_any());
        assert!(config.bind_addr().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = RelayConfig::from_toml_str(
            r#"
            [genai]
            model = "gemini-2.0-flash"

            [cors]
            allowed_origins = ["https://estacao.example"]
            "#,
        )
        .unwrap();
        assert_eq!(config.genai.model, "gemini-2.0-flash");
        assert_eq!(config.genai.timeout_seconds, 30);
        assert_eq!(config.server.bind_addr, "0.0.0.0:8000");
        assert!(!config.cors.allows_any());
    }

    #[test]
    fn test_bad_toml_is_an_error() {
        assert!(matches!(
            RelayConfig::from_toml_str("[server\nbind_addr = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_api_key_fails() {
        let config = RelayConfig::default();
        assert!(matches!(config.api_key(), Err(ConfigError::MissingApiKey)));

        let mut blank = RelayConfig::default();
        blank.genai.api_key = Some("   ".to_string());
        assert!(matches!(blank.api_key(), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = RelayConfig::from_toml_str(
            r#"
            [genai]
            api_key = "from-file"
            "#,
        )
        .unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_KEY, "from-env"),
            (ENV_BIND_ADDR, "127.0.0.1:9000"),
        ]);
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.api_key().unwrap(), "from-env");
        assert_eq!(config.bind_addr().unwrap().port(), 9000);
        assert_eq!(config.genai.model, "gemini-1.5-flash");
    }

    #[test]
    fn test_invalid_bind_addr() {
        let mut config = RelayConfig::default();
        config.server.bind_addr = "not-an-addr".to_string();
        assert!(matches!(config.bind_addr(), Err(ConfigError::InvalidBindAddr(_))));
    }

    #[test]
    fn test_debug_redacts_key() {
        let mut config = RelayConfig::default();
        config.genai.api_key = Some("secret-key".to_string());
        assert!(!format!("{:?}", config).contains("secret-key"));
    }
}
