use anyhow::{Result, anyhow};
use serde::Deserialize;
use std::env;
use tracing::{info, warn};

// Import logging macros
use crate::{log_system_event, log_validation};

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub providers: ProviderConfig,
    pub server: ServerConfig,
    pub playback: PlaybackConfig,
    pub logging: LoggingConfig,
}

/// API credentials for the three external providers
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub deepgram_api_key: String,
    pub groq_api_key: String,
    pub murf_api_key: String,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Browser origin allowed by the CORS layer.
    pub frontend_origin: String,
}

/// Local audio playback configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// Explicit player binary; when unset an installed player is detected.
    pub player: Option<String>,
}

/// Logging system configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading application configuration from environment variables");

        let config = Config {
            providers: ProviderConfig::from_env(),
            server: ServerConfig::from_env()?,
            playback: PlaybackConfig::from_env(),
            logging: LoggingConfig::from_env(),
        };

        log_system_event!(config, "Configuration loaded successfully");
        config.log_configuration_summary();

        Ok(config)
    }

    /// Log a summary of loaded configuration (without sensitive data)
    fn log_configuration_summary(&self) {
        info!(
            deepgram_key_masked = %mask_sensitive_data(&self.providers.deepgram_api_key),
            groq_key_masked = %mask_sensitive_data(&self.providers.groq_api_key),
            murf_key_masked = %mask_sensitive_data(&self.providers.murf_api_key),
            server_address = %format!("{}:{}", self.server.host, self.server.port),
            frontend_origin = %self.server.frontend_origin,
            log_level = %self.logging.level,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("Server port must be greater than 0"));
        }

        for (name, key) in [
            ("DEEPGRAM_API_KEY", &self.providers.deepgram_api_key),
            ("GROQ_API_KEY", &self.providers.groq_api_key),
            ("MURF_API_KEY", &self.providers.murf_api_key),
        ] {
            if key.is_empty() {
                warn!("{} is not set - the matching provider calls will fail", name);
            }
        }

        if !["trace", "debug", "info", "warn", "error"]
            .iter()
            .any(|level| self.logging.level.to_lowercase().starts_with(level))
            && !self.logging.level.contains('=')
        {
            warn!("Unusual log level '{}' - EnvFilter may reject it", self.logging.level);
        }

        log_validation!(success, "configuration", "Configuration validation completed");
        Ok(())
    }
}

impl ProviderConfig {
    fn from_env() -> Self {
        ProviderConfig {
            deepgram_api_key: env::var("DEEPGRAM_API_KEY").unwrap_or_default(),
            groq_api_key: env::var("GROQ_API_KEY").unwrap_or_default(),
            murf_api_key: env::var("MURF_API_KEY").unwrap_or_default(),
        }
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self> {
        let port_str = env::var("PORT").unwrap_or_else(|_| "5000".to_string());

        let port = port_str.parse::<u16>().map_err(|_| {
            anyhow!("Invalid PORT value: '{}'. Must be a number between 1-65535", port_str)
        })?;

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let frontend_origin =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());

        Ok(ServerConfig {
            port,
            host,
            frontend_origin,
        })
    }
}

impl PlaybackConfig {
    fn from_env() -> Self {
        PlaybackConfig {
            player: env::var("AUDIO_PLAYER").ok(),
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info,eduvoice=debug".to_string());

        let file_enabled = env::var("LOG_FILE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let console_enabled = env::var("LOG_CONSOLE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let log_directory = env::var("LOG_DIRECTORY").unwrap_or_else(|_| "logs".to_string());

        LoggingConfig {
            level,
            file_enabled,
            console_enabled,
            log_directory,
        }
    }
}

/// Mask sensitive data in configuration for safe logging
fn mask_sensitive_data(data: &str) -> String {
    if data.len() <= 8 {
        "*".repeat(data.len())
    } else {
        format!("{}***{}", &data[..4], &data[data.len() - 4..])
    }
}
