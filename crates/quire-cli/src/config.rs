//! Operator configuration: an optional TOML file layered under `QUIRE_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
  /// SQLite database file. A leading `~/` is expanded.
  #[serde(default = "default_store_path")]
  pub store_path:        PathBuf,
  /// Page size for `quire list` when `--page-size` is not given.
  #[serde(default = "default_page_size")]
  pub default_page_size: u32,
}

fn default_store_path() -> PathBuf { PathBuf::from("quire.db") }

fn default_page_size() -> u32 { 20 }

impl CliConfig {
  /// Read `path` (if it exists) and the environment. Environment variables
  /// win over the file.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("QUIRE"))
      .build()
      .with_context(|| format!("failed to read config file {path:?}"))?;

    let mut cfg: Self = settings
      .try_deserialize()
      .context("failed to deserialise CliConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
