use std::{collections::HashMap, time::Duration};
#[cfg(feature = "serde")]
use std::path::Path;

#[cfg(feature = "serde")]
use figment::{
    providers::{Format, Json, Toml},
    Figment,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use tracing::debug;

#[cfg(feature = "serde")]
use crate::error::Error;
use crate::queue::DEFAULT_QUEUE_LIMIT;

pub const DEFAULT_TARGET: Duration = Duration::from_millis(5);
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Values used whenever a configuration leaves a parameter unset.
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize), serde(default))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoDelDefaults {
    #[cfg_attr(feature = "serde", serde(with = "crate::utils::serde::duration"))]
    pub target: Duration,
    #[cfg_attr(feature = "serde", serde(with = "crate::utils::serde::duration"))]
    pub interval: Duration,
    pub ecn: bool,
}

impl Default for CoDelDefaults {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET,
            interval: DEFAULT_INTERVAL,
            ecn: false,
        }
    }
}

impl CoDelDefaults {
    pub fn new(target: Duration, interval: Duration, ecn: bool) -> Self {
        Self {
            target,
            interval,
            ecn,
        }
    }
}

/// Per-queue configuration. A zero `target` or `interval`, or a missing
/// `ecn`, falls back to the [`CoDelDefaults`] in effect.
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize), serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoDelConfig {
    #[cfg_attr(feature = "serde", serde(with = "crate::utils::serde::duration"))]
    pub target: Duration, // target queue delay
    #[cfg_attr(feature = "serde", serde(with = "crate::utils::serde::duration"))]
    pub interval: Duration, // width of moving time window
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub ecn: Option<bool>,
    pub limit: usize, // the maximum number of packets in the queue
}

impl Default for CoDelConfig {
    fn default() -> Self {
        Self {
            target: Duration::ZERO,
            interval: Duration::ZERO,
            ecn: None,
            limit: DEFAULT_QUEUE_LIMIT,
        }
    }
}

impl CoDelConfig {
    pub fn new<E: Into<Option<bool>>>(
        target: Duration,
        interval: Duration,
        ecn: E,
        limit: usize,
    ) -> Self {
        Self {
            target,
            interval,
            ecn: ecn.into(),
            limit,
        }
    }
}

/// Configuration for a whole [`CoDelRegistry`](crate::registry::CoDelRegistry).
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize), serde(default))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryConfig {
    pub defaults: CoDelDefaults,
    pub interfaces: HashMap<String, CoDelConfig>,
}

impl RegistryConfig {
    /// Loads a `.toml` or `.json` file.
    #[cfg(feature = "serde")]
    pub fn from_file<T: AsRef<Path>>(path: T) -> Result<Self, Error> {
        let path = path.as_ref();
        let figment = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Figment::new().merge(Toml::file(path)),
            Some("json") => Figment::new().merge(Json::file(path)),
            _ => {
                return Err(Error::ConfigError(format!(
                    "Unsupported config file {}, expect .toml or .json",
                    path.display()
                )))
            }
        };
        if !path.exists() {
            return Err(Error::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("config file {} not found", path.display()),
            )));
        }
        let config: RegistryConfig = figment
            .extract()
            .map_err(|e| Error::ConfigError(e.to_string()))?;
        debug!(?config, path = %path.display(), "Load registry config");
        Ok(config)
    }
}
