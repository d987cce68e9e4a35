use crate::model::Platform;
use serde::Deserialize;
use std::fs;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Where the scraper runs. Decides which storefront family is reachable
/// and how patient the HTTP client is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Local,
    #[default]
    Server,
}

impl ExecutionMode {
    /// Storefronts served from this kind of host.
    pub fn platforms(&self) -> &'static [Platform] {
        match self {
            ExecutionMode::Local => &[Platform::Reliance],
            ExecutionMode::Server => &[Platform::Amazon, Platform::Flipkart, Platform::Croma],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationConfig {
    pub city: String,
    pub pincode: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformToggles {
    #[serde(default = "enabled")]
    pub amazon: bool,
    #[serde(default = "enabled")]
    pub croma: bool,
    #[serde(default = "enabled")]
    pub flipkart: bool,
    #[serde(default = "enabled")]
    pub reliance: bool,
}

fn enabled() -> bool {
    true
}

impl Default for PlatformToggles {
    fn default() -> Self {
        Self {
            amazon: true,
            croma: true,
            flipkart: true,
            reliance: true,
        }
    }
}

impl PlatformToggles {
    pub fn is_enabled(&self, platform: Platform) -> bool {
        match platform {
            Platform::Amazon => self.amazon,
            Platform::Croma => self.croma,
            Platform::Flipkart => self.flipkart,
            Platform::Reliance => self.reliance,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DelayRange {
    pub min: u64,
    pub max: u64,
}

impl Default for DelayRange {
    fn default() -> Self {
        Self { min: 2000, max: 4000 }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NotifierConfig {
    Smtp {
        server: String,
        #[serde(default = "default_smtp_port")]
        port: u16,
        username: String,
        sender: String,
        recipient: String,
    },
    Telegram {
        chat_id: i64,
    },
    #[default]
    None,
}

fn default_smtp_port() -> u16 {
    587
}

/// Rotating log file written next to the console output.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_directory")]
    pub directory: String,
    #[serde(default = "default_log_prefix")]
    pub file_prefix: String,
    /// Rotated files kept on disk, the current one included.
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

fn default_log_directory() -> String {
    "logs".to_string()
}

fn default_log_prefix() -> String {
    "scraper".to_string()
}

fn default_max_log_files() -> usize {
    3
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            file_prefix: default_log_prefix(),
            max_files: default_max_log_files(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub products: Vec<String>,
    pub locations: Vec<LocationConfig>,
    #[serde(default)]
    pub platforms: PlatformToggles,
    #[serde(default)]
    pub mode: ExecutionMode,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    pub check_interval_seconds: Option<u64>,
    #[serde(default)]
    pub request_delay_ms: DelayRange,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_database_path() -> String {
    "data.db".to_string()
}

impl AppConfig {
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.products.iter().all(|p| p.trim().is_empty()) {
            return Err(ConfigError::Invalid("at least one product is required".into()));
        }
        if self.locations.is_empty() {
            return Err(ConfigError::Invalid("at least one location is required".into()));
        }
        for location in &self.locations {
            let pincode = location.pincode.trim();
            if pincode.is_empty() || !pincode.bytes().all(|b| b.is_ascii_digit()) {
                return Err(ConfigError::Invalid(format!(
                    "pincode for {} must be digits, got {:?}",
                    location.city, location.pincode
                )));
            }
        }
        if self.logging.max_files == 0 {
            return Err(ConfigError::Invalid("logging.max_files must be at least 1".into()));
        }
        if self.request_delay_ms.min > self.request_delay_ms.max {
            return Err(ConfigError::Invalid(
                "request_delay_ms.min must not exceed request_delay_ms.max".into(),
            ));
        }
        Ok(())
    }

    /// Platforms to run: the mode's family, minus disabled ones, limited to `selected` when given.
    pub fn active_platforms(&self, selected: Option<&[Platform]>) -> Vec<Platform> {
        self.mode
            .platforms()
            .iter()
            .copied()
            .filter(|p| self.platforms.is_enabled(*p))
            .filter(|p| selected.is_none_or(|s| s.contains(p)))
            .collect()
    }
}

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    AppConfig::from_json(&content)
}
