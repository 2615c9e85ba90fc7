//! Configuration file management for sous.
//!
//! Provides a TOML-based config file at `~/.config/sous/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default bind address for `sous serve`.
pub const DEFAULT_BIND: &str = "127.0.0.1";

/// Default port for `sous serve`.
pub const DEFAULT_PORT: u16 = 8094;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the sous config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/sous` or `~/.config/sous`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("sous");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("sous")
}

/// Return the path to the sous config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;
    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServeConfig {
    pub bind: String,
    pub port: u16,
}

impl ServeConfig {
    /// Resolve using the chain: CLI flag > env var > config file > default.
    ///
    /// - Bind: `cli_bind` > `SOUS_BIND` > `config.server.bind` > `127.0.0.1`
    /// - Port: `cli_port` > `SOUS_PORT` > `config.server.port` > `8094`
    pub fn resolve(cli_bind: Option<&str>, cli_port: Option<u16>) -> Result<Self> {
        let file_config = load_config().ok();

        let bind = if let Some(bind) = cli_bind {
            bind.to_string()
        } else if let Ok(bind) = std::env::var("SOUS_BIND") {
            bind
        } else if let Some(ref cfg) = file_config {
            cfg.server.bind.clone()
        } else {
            DEFAULT_BIND.to_string()
        };

        let port = if let Some(port) = cli_port {
            port
        } else if let Ok(port) = std::env::var("SOUS_PORT") {
            port.parse::<u16>()
                .context("SOUS_PORT env var is not a valid port number")?
        } else if let Some(ref cfg) = file_config {
            cfg.server.port
        } else {
            DEFAULT_PORT
        };

        Ok(Self { bind, port })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
