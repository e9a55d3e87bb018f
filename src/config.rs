//! Runtime configuration.
//!
//! Values come from defaults overridden by plain (unprefixed) environment
//! variables: `MONGODB_URI`, `PORT`, `BIND_ADDRESS`, `UPLOAD_DIR`, `STORE` and
//! `LOG_FORMAT`.

use std::path::PathBuf;

use figment::{
    providers::{Env, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const ENV_KEYS: [&str; 6] = [
    "MONGODB_URI",
    "PORT",
    "BIND_ADDRESS",
    "UPLOAD_DIR",
    "STORE",
    "LOG_FORMAT",
];

/// Which [`RecipientStore`](crate::store::RecipientStore) backs the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mongodb_uri: String,
    pub bind_address: String,
    pub port: u16,
    /// Where uploaded photos are written and served from.
    pub upload_dir: PathBuf,
    pub store: StoreKind,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mongodb_uri: "mongodb://localhost:27017/ekzaria".to_string(),
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            upload_dir: PathBuf::from("uploads"),
            store: StoreKind::Mongo,
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Loads defaults, then the environment on top.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable can't be parsed into its field or the
    /// result fails [`Config::validate`].
    pub fn load() -> Result<Self> {
        let config: Config = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Env::raw().only(&ENV_KEYS))
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::ConfigValidation {
                message: "PORT must be greater than 0".to_string(),
            });
        }
        if self.upload_dir.as_os_str().is_empty() {
            return Err(Error::ConfigValidation {
                message: "UPLOAD_DIR must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
