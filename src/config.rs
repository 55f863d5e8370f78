use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  /// Log filter used when ROLLCALL_LOG is not set (e.g. "debug", "rollcall=trace")
  pub log_level: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the REST backend
  #[serde(default = "default_url")]
  pub url: String,
  /// Upper bound for any single request
  #[serde(default = "default_request_timeout_secs")]
  pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: default_url(),
      request_timeout_secs: default_request_timeout_secs(),
    }
  }
}

fn default_url() -> String {
  "http://localhost:4000".to_string()
}

fn default_request_timeout_secs() -> u64 {
  30
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./rollcall.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/rollcall/config.yaml
  ///
  /// Without a config file the defaults are used. The API URL can be
  /// overridden with ROLLCALL_API_URL.
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

    if let Some(url) = Self::get_api_url_override() {
      config.api.url = url;
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("rollcall.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("rollcall").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    // An empty file deserializes to null
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    serde_yaml::from_str(contents)
  }

  /// API URL from the environment, if set and non-empty.
  fn get_api_url_override() -> Option<String> {
    std::env::var("ROLLCALL_API_URL")
      .ok()
      .filter(|url| !url.trim().is_empty())
  }

  /// Header title: configured title, else the API host
  pub fn display_title(&self) -> String {
    self
      .title
      .clone()
      .unwrap_or_else(|| crate::ui::renderfns::extract_domain(&self.api.url).to_string())
  }
}
