//! Server wiring for Warden: configuration and the background sweep.

pub mod sweep;

use std::path::PathBuf;

use serde::Deserialize;

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,

  /// Seconds between sweep passes.
  #[serde(default = "default_sweep_interval_secs")]
  pub sweep_interval_secs: u64,

  /// Maximum number of stale rows refreshed per pass.
  #[serde(default = "default_sweep_batch_size")]
  pub sweep_batch_size: usize,
}

fn default_sweep_interval_secs() -> u64 { 60 }

fn default_sweep_batch_size() -> usize { 500 }
