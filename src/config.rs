use dotenvy::dotenv;
use std::{env, net::SocketAddr, path::PathBuf, str::FromStr};
use thiserror::Error;

pub const DEFAULT_STORAGE_PATH: &str = "saved_images";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
/// Base64 webcam frames routinely exceed axum's 2 MiB default.
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    Local,
    Memory,
}

impl FromStr for StorageType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(StorageType::Local),
            "memory" => Ok(StorageType::Memory),
            _ => Err(ConfigError::Invalid {
                name: "STORAGE_TYPE",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage_type: StorageType,
    pub storage_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub serialize_uploads: bool,
    pub max_body_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Local,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            serialize_uploads: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl AppConfig {
    /// Loads `.env` (if present) and then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let storage_type = match lookup("STORAGE_TYPE") {
            Some(raw) => raw.parse()?,
            None => defaults.storage_type,
        };
        let storage_path = lookup("STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage_path);
        let host = lookup("HOST").unwrap_or(defaults.host);
        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: raw,
            })?,
            None => defaults.port,
        };
        let serialize_uploads = match lookup("SERIALIZE_UPLOADS") {
            Some(raw) => parse_bool("SERIALIZE_UPLOADS", raw)?,
            None => defaults.serialize_uploads,
        };
        let max_body_bytes = match lookup("MAX_BODY_BYTES") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: "MAX_BODY_BYTES",
                value: raw,
            })?,
            None => defaults.max_body_bytes,
        };

        let config = Self {
            storage_type,
            storage_path,
            host,
            port,
            serialize_uploads,
            max_body_bytes,
        };
        config.socket_addr()?;
        Ok(config)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::Invalid {
                name: "HOST",
                value: self.host.clone(),
            })
    }
}

fn parse_bool(name: &'static str, raw: String) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value: raw }),
    }
}
