use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    // Server
    pub http_port: u16,
    pub host_name: String,

    // Access control
    pub access_hosts: Vec<String>,
    #[serde(rename = "blockedIPs")]
    pub blocked_ips: Vec<String>,
    #[serde(rename = "blockedUAs")]
    pub blocked_uas: Vec<String>,

    // Logging
    pub log_file: Option<String>,
    pub log_to_console: bool,
    pub log_blocked_requests: bool,

    // Site data
    pub catalog_file: PathBuf,
    pub data_dir: PathBuf,
    pub locales_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub static_dir: PathBuf,

    // Content
    pub image_url: String,
    pub page_size: usize,
    pub default_lang: String,
    pub site_name: String,
    pub cache_max_age: u32,

    // Statistics refresh (cron, seconds first; empty disables)
    pub stats_refresh_schedule: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 8080,
            host_name: "0.0.0.0".to_string(),
            access_hosts: Vec::new(),
            blocked_ips: Vec::new(),
            blocked_uas: Vec::new(),
            log_file: None,
            log_to_console: true,
            log_blocked_requests: true,
            catalog_file: PathBuf::from("data/catalog.json"),
            data_dir: PathBuf::from("data"),
            locales_dir: PathBuf::from("locales"),
            templates_dir: PathBuf::from("templates"),
            static_dir: PathBuf::from("static"),
            image_url: "https://infinity.unstable.life/images".to_string(),
            page_size: 100,
            default_lang: "en-US".to_string(),
            site_name: "Flashpoint Archive".to_string(),
            cache_max_age: 14400,
            stats_refresh_schedule: "0 0 * * * *".to_string(),
        }
    }
}

impl Config {
    /// Load the config file at `path` on top of the defaults, then apply
    /// environment overrides. A missing file means defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.is_file() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else {
            Config::default()
        };

        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var("HTTP_PORT") {
            self.http_port = port.parse().context("HTTP_PORT is not a valid port")?;
        }
        if let Ok(host) = std::env::var("HOST_NAME") {
            self.host_name = host;
        }
        if let Ok(lang) = std::env::var("DEFAULT_LANG") {
            self.default_lang = lang;
        }
        Ok(())
    }

    pub fn pages_file(&self) -> PathBuf {
        self.data_dir.join("pages.json")
    }

    pub fn endpoints_file(&self) -> PathBuf {
        self.data_dir.join("endpoints.json")
    }

    pub fn locales_file(&self) -> PathBuf {
        self.data_dir.join("locales.json")
    }

    pub fn filter_file(&self) -> PathBuf {
        self.data_dir.join("filter.json")
    }

    /// Point every site data path at `root` (used by tests and tools).
    pub fn rooted_at(mut self, root: &Path) -> Self {
        self.catalog_file = root.join("data/catalog.json");
        self.data_dir = root.join("data");
        self.locales_dir = root.join("locales");
        self.templates_dir = root.join("templates");
        self.static_dir = root.join("static");
        self
    }
}
