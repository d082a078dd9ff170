use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

pub const ENV_DATA: &str = "AIR_QUALITY_DATA";
pub const ENV_ADDR: &str = "AIR_QUALITY_ADDR";
pub const ENV_PERSIST: &str = "AIR_QUALITY_PERSIST";

/// Server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Dataset file, format chosen by extension (default: PM25_dataset.csv)
    pub data_path: PathBuf,

    /// Listen address (default: 127.0.0.1:8000)
    pub bind_addr: SocketAddr,

    /// Rewrite the dataset file after every mutation (default: true)
    pub persist: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("PM25_dataset.csv"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            persist: true,
        }
    }
}

impl Config {
    /// Read the process environment. `main` loads `.env` beforehand.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DATA) {
            config.data_path = PathBuf::from(path);
        }
        if let Some(addr) = lookup(ENV_ADDR) {
            config.bind_addr = addr
                .parse()
                .with_context(|| format!("{ENV_ADDR}: '{addr}' is not a socket address"))?;
        }
        if let Some(flag) = lookup(ENV_PERSIST) {
            config.persist = parse_bool(&flag).with_context(|| format!("parsing {ENV_PERSIST}"))?;
        }

        Ok(config)
    }
}

fn parse_bool(s: &str) -> Result<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("'{other}' is not a boolean"),
    }
}
