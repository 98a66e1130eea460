//! Configuration parsing and validation.
//!
//! Forms LTS is configured with a TOML file (default `config/lts.toml`):
//!
//! ```toml
//! [source]
//! path = "./data/forms.sqlite"
//!
//! [archive]
//! path = "./data/lts.sqlite"
//!
//! [copy]
//! batch_size = 50
//! max_batches = 100
//! watermark_policy = "last_attempted"   # or "last_contiguous_success"
//! ```
//!
//! Only `[source]` and `[archive]` are required.

use anyhow::{Context, Result};
use forms_lts_core::copy::{WatermarkPolicy, COPY_LIMIT};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Primary submission database.
    pub source: DbConfig,
    /// Long term storage database.
    pub archive: DbConfig,
    #[serde(default)]
    pub copy: CopyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CopyConfig {
    /// Records per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    /// Upper bound on batches for `lts run`.
    #[serde(default = "default_max_batches")]
    pub max_batches: usize,
    #[serde(default)]
    pub watermark_policy: WatermarkPolicy,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_batches: default_max_batches(),
            watermark_policy: WatermarkPolicy::default(),
        }
    }
}

fn default_batch_size() -> i64 {
    COPY_LIMIT
}
fn default_max_batches() -> usize {
    100
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.copy.batch_size < 1 {
        anyhow::bail!("copy.batch_size must be >= 1");
    }
    if config.copy.max_batches < 1 {
        anyhow::bail!("copy.max_batches must be >= 1");
    }
    if config.source.path == config.archive.path {
        anyhow::bail!(
            "source.path and archive.path must differ (both are {})",
            config.source.path.display()
        );
    }
    Ok(())
}
