//! Server configuration and tracing setup
//!
//! Everything is read from the environment:
//!
//! | Variable            | Default          |
//! |---------------------|------------------|
//! | `STOCK_DATA_DIR`    | `data`           |
//! | `STOCK_BIND_ADDR`   | `127.0.0.1:8501` |
//! | `STOCK_JWT_SECRET`  | `<data>/.jwt_secret`, generated on first start |
//! | `STOCK_TOKEN_TTL`   | `3600` seconds   |
//! | `STOCK_USERS`       | `admin` and `staff` accounts |
//! | `STOCK_ITEMS`       | standard catalog |
//! | `STOCK_LEGACY_CSV`  | unset            |
//! | `STOCK_LOG_FORMAT`  | `text`           |

use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::auth::{generate_secret, MIN_SECRET_LEN};
use crate::record_store::RecordStoreConfig;
use crate::validation::ItemCatalog;

/// Name of the persisted secret inside the data directory
pub const SECRET_FILE: &str = ".jwt_secret";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8501";
const DEFAULT_TOKEN_TTL: i64 = 3600;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key}='{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to prepare JWT secret at {}: {source}", path.display())]
    Secret {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` overrides the default `stock_ledger=info,tower_http=info`.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stock_ledger=info,tower_http=info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr);

    // Keeps an already installed subscriber
    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    /// Explicit secret; when `None` the persisted secret file is used
    pub jwt_secret: Option<String>,
    pub token_ttl: i64,
    /// Raw `user:password` list
    pub users: Option<String>,
    pub catalog: ItemCatalog,
    pub legacy_csv: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8501)),
            jwt_secret: None,
            token_ttl: DEFAULT_TOKEN_TTL,
            users: None,
            catalog: ItemCatalog::default(),
            legacy_csv: None,
            log_format: LogFormat::Text,
        }
    }
}

impl ServerConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which returns a variable's value
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(dir) = get("STOCK_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        let addr = get("STOCK_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        config.bind_addr = addr.trim().parse::<SocketAddr>().map_err(|e: std::net::AddrParseError| {
            ConfigError::InvalidValue {
                key: "STOCK_BIND_ADDR",
                value: addr.clone(),
                reason: e.to_string(),
            }
        })?;

        if let Some(secret) = get("STOCK_JWT_SECRET") {
            if secret.len() < MIN_SECRET_LEN {
                return Err(ConfigError::InvalidValue {
                    key: "STOCK_JWT_SECRET",
                    value: "<redacted>".to_string(),
                    reason: format!("must be at least {} characters", MIN_SECRET_LEN),
                });
            }
            config.jwt_secret = Some(secret);
        }

        if let Some(ttl) = get("STOCK_TOKEN_TTL") {
            config.token_ttl = match ttl.trim().parse::<i64>() {
                Ok(seconds) if seconds > 0 => seconds,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "STOCK_TOKEN_TTL",
                        value: ttl,
                        reason: "expected a positive number of seconds".to_string(),
                    })
                }
            };
        }

        config.users = get("STOCK_USERS");

        if let Some(items) = get("STOCK_ITEMS") {
            let catalog = ItemCatalog::parse(&items);
            if catalog.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "STOCK_ITEMS",
                    value: items,
                    reason: "no item names".to_string(),
                });
            }
            config.catalog = catalog;
        }

        config.legacy_csv = get("STOCK_LEGACY_CSV").map(PathBuf::from);

        if let Some(format) = get("STOCK_LOG_FORMAT") {
            config.log_format = match format.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" | "pretty" => LogFormat::Text,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "STOCK_LOG_FORMAT",
                        value: format,
                        reason: "expected 'text' or 'json'".to_string(),
                    })
                }
            };
        }

        Ok(config)
    }

    /// Store configuration for the data directory
    pub fn store_config(&self) -> RecordStoreConfig {
        RecordStoreConfig::new(&self.data_dir)
    }

    /// Path of the persisted secret
    pub fn secret_path(&self) -> PathBuf {
        self.data_dir.join(SECRET_FILE)
    }

    /// The JWT secret: explicit, loaded from the secret file, or generated
    ///
    /// A generated secret is saved so tokens survive restarts.
    pub fn resolve_jwt_secret(&self) -> Result<String, ConfigError> {
        if let Some(secret) = &self.jwt_secret {
            return Ok(secret.clone());
        }
        load_or_create_secret(&self.secret_path())
    }
}

fn load_or_create_secret(path: &Path) -> Result<String, ConfigError> {
    let secret_error = |source| ConfigError::Secret {
        path: path.to_path_buf(),
        source,
    };

    match fs::read_to_string(path) {
        Ok(contents) => {
            let secret = contents.trim().to_string();
            if secret.len() >= MIN_SECRET_LEN {
                info!(path = %path.display(), "loaded JWT secret");
                return Ok(secret);
            }
            warn!(path = %path.display(), "stored JWT secret too short, regenerating");
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(secret_error(e)),
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(secret_error)?;
    }

    let secret = generate_secret();
    fs::write(path, &secret).map_err(secret_error)?;
    warn!(
        path = %path.display(),
        "generated JWT secret; set STOCK_JWT_SECRET in production"
    );
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.bind_addr.port(), 8501);
        assert_eq!(config.token_ttl, 3600);
        assert_eq!(config.catalog.items().len(), 4);
        assert!(config.legacy_csv.is_none());
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("STOCK_DATA_DIR", "/var/lib/stock"),
            ("STOCK_BIND_ADDR", "0.0.0.0:9000"),
            ("STOCK_TOKEN_TTL", "60"),
            ("STOCK_ITEMS", "Pixel 8, ThinkPad X1"),
            ("STOCK_LOG_FORMAT", "JSON"),
            ("STOCK_LEGACY_CSV", "stock_data.csv"),
        ])
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/stock"));
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.token_ttl, 60);
        assert_eq!(config.catalog.canonical("pixel 8"), Some("Pixel 8"));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.legacy_csv, Some(PathBuf::from("stock_data.csv")));
    }

    #[test]
    fn test_invalid_values() {
        assert!(config_from(&[("STOCK_BIND_ADDR", "nowhere")]).is_err());
        assert!(config_from(&[("STOCK_TOKEN_TTL", "-5")]).is_err());
        assert!(config_from(&[("STOCK_JWT_SECRET", "short")]).is_err());
        assert!(config_from(&[("STOCK_LOG_FORMAT", "xml")]).is_err());
    }

    #[test]
    fn test_secret_file_is_reused() {
        let temp_dir = TempDir::new().unwrap();
        let config = ServerConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };

        let first = config.resolve_jwt_secret().unwrap();
        let second = config.resolve_jwt_secret().unwrap();
        assert!(first.len() >= MIN_SECRET_LEN);
        assert_eq!(first, second);
        assert!(config.secret_path().exists());
    }
}
