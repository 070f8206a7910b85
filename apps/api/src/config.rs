//! # Server Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     WARREN_PORT=8080                                                   │
//! │     WARREN_ADMIN_TOKEN=...                                             │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     $WARREN_CONFIG, or ~/.config/warren/server.toml (Linux)            │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     0.0.0.0:3000, data dir database, ฿50 delivery fee                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [server]
//! bind_addr = "127.0.0.1"
//! port = 3000
//! cors_origins = ["http://localhost:5173"]
//!
//! [storage]
//! database_path = "/var/lib/warren/warren.db"
//! uploads_dir = "/var/lib/warren/uploads"
//! max_upload_bytes = 5242880
//!
//! [shop]
//! delivery_fee_cents = 5000
//! low_stock_threshold = 5
//!
//! [admin]
//! token = "change-me"
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use warren_core::{Money, MAX_PRICE_CENTS};

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// Listener and cross-origin settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed to call the API from a browser.
    /// Empty disables the CORS layer (same-origin deployment).
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// Where data lives on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Root of uploaded images and slips, served at `/uploads`.
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,

    /// Largest accepted upload, in bytes. Default: 5 MiB
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn data_dir() -> PathBuf {
    ProjectDirs::from("th", "Warren", "warren")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_database_path() -> PathBuf {
    data_dir().join("warren.db")
}

fn default_uploads_dir() -> PathBuf {
    data_dir().join("uploads")
}

fn default_max_upload_bytes() -> usize {
    5 * 1024 * 1024
}

impl Default for StorageSettings {
    fn default() -> Self {
        StorageSettings {
            database_path: default_database_path(),
            uploads_dir: default_uploads_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Shop-level business settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopSettings {
    /// Flat fee added to orders shipped by delivery. Pickup is free.
    #[serde(default = "default_delivery_fee")]
    pub delivery_fee_cents: i64,

    /// Products at or below this stock level show up on the dashboard.
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i64,
}

fn default_delivery_fee() -> i64 {
    5_000
}

fn default_low_stock_threshold() -> i64 {
    5
}

impl Default for ShopSettings {
    fn default() -> Self {
        ShopSettings {
            delivery_fee_cents: default_delivery_fee(),
            low_stock_threshold: default_low_stock_threshold(),
        }
    }
}

/// Admin route guard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminSettings {
    /// Shared secret expected in `x-admin-token`. `None` leaves the admin
    /// routes open (local development).
    #[serde(default)]
    pub token: Option<String>,
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub shop: ShopSettings,

    #[serde(default)]
    pub admin: AdminSettings,
}

impl ServerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, else the platform default if present)
    /// 3. `WARREN_*` environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = match config_path.or_else(Self::default_config_path) {
            Some(path) if path.exists() => {
                info!(?path, "Loading server config from file");
                Self::from_file(&path)?
            }
            Some(path) => {
                debug!(?path, "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Applies `WARREN_*` overrides read through `lookup`.
    ///
    /// Unparseable numbers are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("WARREN_BIND_ADDR") {
            self.server.bind_addr = addr;
        }

        if let Some(port) = lookup("WARREN_PORT") {
            match port.parse::<u16>() {
                Ok(p) => {
                    debug!(port = p, "Overriding port from environment");
                    self.server.port = p;
                }
                Err(_) => warn!(value = %port, "Ignoring invalid WARREN_PORT"),
            }
        }

        if let Some(origins) = lookup("WARREN_CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(path) = lookup("WARREN_DATABASE_PATH") {
            self.storage.database_path = PathBuf::from(path);
        }

        if let Some(dir) = lookup("WARREN_UPLOADS_DIR") {
            self.storage.uploads_dir = PathBuf::from(dir);
        }

        if let Some(bytes) = lookup("WARREN_MAX_UPLOAD_BYTES") {
            match bytes.parse::<usize>() {
                Ok(b) => self.storage.max_upload_bytes = b,
                Err(_) => warn!(value = %bytes, "Ignoring invalid WARREN_MAX_UPLOAD_BYTES"),
            }
        }

        if let Some(fee) = lookup("WARREN_DELIVERY_FEE_CENTS") {
            match fee.parse::<i64>() {
                Ok(f) => self.shop.delivery_fee_cents = f,
                Err(_) => warn!(value = %fee, "Ignoring invalid WARREN_DELIVERY_FEE_CENTS"),
            }
        }

        if let Some(threshold) = lookup("WARREN_LOW_STOCK_THRESHOLD") {
            match threshold.parse::<i64>() {
                Ok(t) => self.shop.low_stock_threshold = t,
                Err(_) => warn!(value = %threshold, "Ignoring invalid WARREN_LOW_STOCK_THRESHOLD"),
            }
        }

        if let Some(token) = lookup("WARREN_ADMIN_TOKEN") {
            let token = token.trim().to_string();
            self.admin.token = (!token.is_empty()).then_some(token);
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !(0..=MAX_PRICE_CENTS).contains(&self.shop.delivery_fee_cents) {
            return Err(ConfigError::Invalid(format!(
                "delivery_fee_cents must be between 0 and {}",
                MAX_PRICE_CENTS
            )));
        }

        if self.shop.low_stock_threshold < 0 {
            return Err(ConfigError::Invalid(
                "low_stock_threshold must not be negative".into(),
            ));
        }

        if self.storage.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_upload_bytes must be greater than 0".into(),
            ));
        }

        if matches!(self.admin.token.as_deref(), Some(t) if t.trim().is_empty()) {
            return Err(ConfigError::Invalid("admin token must not be blank".into()));
        }

        for origin in &self.server.cors_origins {
            if !origin.starts_with("http://") && !origin.starts_with("https://") {
                return Err(ConfigError::Invalid(format!(
                    "CORS origin must start with http:// or https://, got: {}",
                    origin
                )));
            }
        }

        Ok(())
    }

    fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("th", "Warren", "warren")
            .map(|dirs| dirs.config_dir().join("server.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// `bind_addr:port`, ready for `TcpListener::bind`.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind_addr, self.server.port)
    }

    pub fn delivery_fee(&self) -> Money {
        Money::from_cents(self.shop.delivery_fee_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
