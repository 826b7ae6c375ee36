//! Configuration loading and API-key resolution.
//!
//! Defaults < optional `config/settings` file < `BITACORA__`-prefixed
//! environment variables. Configuration problems are the only fatal error
//! class; they are checked once, before any batch work begins.

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

const CONFIG_FILE: &str = "config/settings";

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error(transparent)]
    Build(#[from] config::ConfigError),
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub generation: GenerationSettings,
    pub run: RunSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationSettings {
    pub model: String,
    /// Requests per second allowed against the generation service; 0 disables
    /// the limiter.
    pub requests_per_second: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RunSettings {
    pub batch_size: usize,
    pub max_retries: u32,
    pub retry_base_delay_secs: u64,
}

pub fn load() -> Result<AppConfig, AppConfigError> {
    let builder = Config::builder()
        .set_default("generation.model", "gemini-1.5-flash-latest")?
        .set_default("generation.requests_per_second", 4_i64)?
        .set_default("run.batch_size", 25_i64)?
        .set_default("run.max_retries", 2_i64)?
        .set_default("run.retry_base_delay_secs", 5_i64)?
        .add_source(File::with_name(CONFIG_FILE).required(false))
        .add_source(Environment::with_prefix("BITACORA").separator("__"));

    let cfg = builder.build()?.try_deserialize()?;
    Ok(cfg)
}
