use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding `api.base_url`
pub const BASE_URL_ENV: &str = "RANDOMUSERS_BASE_URL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub connectivity: ConnectivityConfig,
  #[serde(default)]
  pub list: ListConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Users endpoint; `page` is appended per request
  pub base_url: String,
  pub results_per_page: u32,
  /// Seed that keeps randomuser.me pages stable across requests
  pub seed: Option<String>,
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: "https://randomuser.me/api/".to_string(),
      results_per_page: 10,
      seed: None,
      timeout_secs: 15,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  pub enabled: bool,
  /// Database file (defaults to $XDG_DATA_HOME/randomusers/cache.db)
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      path: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
  pub probe_host: String,
  pub probe_port: u16,
  pub interval_ms: u64,
  pub timeout_ms: u64,
}

impl Default for ConnectivityConfig {
  fn default() -> Self {
    Self {
      probe_host: "randomuser.me".to_string(),
      probe_port: 443,
      interval_ms: 5000,
      timeout_ms: 2000,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListConfig {
  pub search_debounce_ms: u64,
  /// Pagination triggers when the viewed row is this close to the end
  pub prefetch_threshold: usize,
}

impl Default for ListConfig {
  fn default() -> Self {
    Self {
      search_debounce_ms: 300,
      prefetch_threshold: 3,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./randomusers.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/randomusers/config.yaml
  ///
  /// Falls back to defaults when no file exists. `RANDOMUSERS_BASE_URL`
  /// overrides the configured endpoint.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Ok(url) = std::env::var(BASE_URL_ENV) {
      config.api.base_url = url;
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("randomusers.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("randomusers").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    serde_yaml::from_str(contents)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_partial_config_keeps_defaults() {
    let yaml = r#"
api:
  seed: stable
  results_per_page: 25
list:
  search_debounce_ms: 150
"#;
    let config = Config::parse(yaml).unwrap();

    assert_eq!(config.api.seed.as_deref(), Some("stable"));
    assert_eq!(config.api.results_per_page, 25);
    assert_eq!(config.api.base_url, "https://randomuser.me/api/");
    assert_eq!(config.list.search_debounce_ms, 150);
    assert_eq!(config.list.prefetch_threshold, 3);
    assert!(config.cache.enabled);
    assert_eq!(config.connectivity.probe_port, 443);
  }

  #[test]
  fn test_empty_document_is_default() {
    let config = Config::parse("{}").unwrap();
    assert_eq!(config.api.results_per_page, 10);
    assert_eq!(config.connectivity.interval_ms, 5000);
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    let err = Config::load(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_wrong_type_is_rejected() {
    assert!(Config::parse("cache:\n  enabled: maybe\n").is_err());
  }
}
