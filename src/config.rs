use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Runtime settings, read from `<config dir>/vidgrab/config.json` and
/// overridden by `VIDGRAB_*` environment variables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Base URL of the download service
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Where saved artifacts go
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Fetch and render preview thumbnails
    #[serde(default = "default_true")]
    pub thumbnails: bool,
    /// Log file; defaults to `<cache dir>/vidgrab/vidgrab.log`
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_api_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_ms: default_timeout_ms(),
            download_dir: default_download_dir(),
            thumbnails: true,
            log_file: None,
        }
    }
}

impl Config {
    /// Load from the default location and the process environment
    pub fn load() -> Result<Self> {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vidgrab").join("config.json"))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Apply `VIDGRAB_*` overrides from an iterator of environment pairs
    pub fn apply_env<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                "VIDGRAB_API_URL" => self.api_url = value,
                "VIDGRAB_TIMEOUT_MS" => {
                    self.timeout_ms = value
                        .trim()
                        .parse()
                        .with_context(|| format!("VIDGRAB_TIMEOUT_MS is not a number: {}", value))?;
                }
                "VIDGRAB_DOWNLOAD_DIR" => self.download_dir = PathBuf::from(value),
                "VIDGRAB_LOG_FILE" => self.log_file = Some(PathBuf::from(value)),
                _ => {}
            }
        }
        Ok(())
    }

    pub fn validate(&mut self) -> Result<()> {
        self.api_url = self.api_url.trim().trim_end_matches('/').to_string();

        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            bail!("api_url must be an http(s) URL, got {:?}", self.api_url);
        }
        if self.timeout_ms == 0 {
            bail!("timeout_ms must be greater than zero");
        }
        Ok(())
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("vidgrab")
                .join("vidgrab.log")
        })
    }
}
