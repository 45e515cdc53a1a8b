//! Application configuration.
//!
//! Layered the usual way: compiled defaults, then the system config
//! file, then `USBMATE_`-prefixed environment variables, then whatever
//! flags were given on the command line.

use std::path::PathBuf;

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

pub const CONFIG_PATH: &str = "/etc/usbmate/config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Name of the external write tool.
    pub tool: String,
    /// Script whose `LOG=` assignment names the shared log file.
    pub tool_script: PathBuf,
    /// Explicit log file, overriding the script lookup.
    pub log_file: Option<PathBuf>,
    /// UI tick for worker liveness and log polling.
    pub poll_interval_ms: u64,
    pub simulation: bool,
    pub verbose: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tool: "usb-creator".to_string(),
            tool_script: PathBuf::from("/usr/bin/usb-creator"),
            log_file: None,
            poll_interval_ms: 1000,
            simulation: false,
            verbose: false,
        }
    }
}

impl AppConfig {
    pub fn new<A: Serialize>(cli: Option<&A>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(CONFIG_PATH))
            .merge(Env::prefixed("USBMATE_"));
        if let Some(args) = cli {
            figment = figment.merge(Serialized::defaults(args));
        }
        figment.extract().context("Failed to load configuration")
    }
}
