use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{CakedayError, Result};

pub const DEFAULT_CADENCE_SECS: u64 = 60;
pub const DEFAULT_WINDOW_DAYS: u32 = 7;
/// A year and a day: any larger window already matches every birthday.
pub const MAX_WINDOW_DAYS: u32 = 366;
pub const DEFAULT_SMTP_HOST: &str = "smtp.yandex.ru";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_SMTP_TIMEOUT_SECS: u64 = 30;

/// Top-level config (cakeday.toml + CAKEDAY_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CakedayConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Notification scheduling knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds to sleep between two cycles. Must be positive.
    /// The default is short; daily deployments should raise it.
    #[serde(default = "default_cadence_secs")]
    pub cadence_secs: u64,
    /// How many days ahead a birthday is announced.
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    /// Record every successful delivery and skip subscribers that were already
    /// told about the same occurrence. `false` re-notifies on every cycle.
    #[serde(default = "bool_true")]
    pub dedupe: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cadence_secs: DEFAULT_CADENCE_SECS,
            window_days: DEFAULT_WINDOW_DAYS,
            dedupe: true,
        }
    }
}

impl SchedulerConfig {
    pub fn cadence(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cadence_secs)
    }
}

/// Outbound mail transport. Opaque to the notification cycle; only the
/// SMTP notifier reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    /// When false, notifications are written to the log instead of mailed.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Sender address. Falls back to `username` when empty.
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub tls: TlsMode,
    #[serde(default = "default_smtp_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_smtp_host(),
            port: DEFAULT_SMTP_PORT,
            username: String::new(),
            password: String::new(),
            from: String::new(),
            tls: TlsMode::default(),
            timeout_secs: DEFAULT_SMTP_TIMEOUT_SECS,
        }
    }
}

impl SmtpConfig {
    /// The envelope sender: explicit `from`, otherwise the login name.
    pub fn sender(&self) -> &str {
        if self.from.is_empty() {
            &self.username
        } else {
            &self.from
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Plain connection upgraded with STARTTLS (port 587).
    #[default]
    Starttls,
    /// Implicit TLS from the first byte (port 465).
    Tls,
    /// No encryption. Local relays and test servers only.
    None,
}

fn bool_true() -> bool {
    true
}
fn default_cadence_secs() -> u64 {
    DEFAULT_CADENCE_SECS
}
fn default_window_days() -> u32 {
    DEFAULT_WINDOW_DAYS
}
fn default_smtp_host() -> String {
    DEFAULT_SMTP_HOST.to_string()
}
fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}
fn default_smtp_timeout_secs() -> u64 {
    DEFAULT_SMTP_TIMEOUT_SECS
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cakeday/cakeday.db", home)
}

impl CakedayConfig {
    /// Load config from a TOML file with CAKEDAY_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. $CAKEDAY_CONFIG
    ///   3. ~/.cakeday/cakeday.toml
    ///
    /// A missing file is not an error; every field has a default. Nested keys
    /// use a double underscore: `CAKEDAY_SCHEDULER__WINDOW_DAYS=3`.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = resolve_config_path(config_path, std::env::var(CONFIG_PATH_ENV).ok());

        Self::from_figment(
            Figment::new()
                .merge(Toml::file(&path))
                .merge(Env::prefixed("CAKEDAY_").split("__")),
        )
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let config: CakedayConfig = figment
            .extract()
            .map_err(|e| CakedayError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the scheduler or the mailer cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.cadence_secs == 0 {
            return Err(CakedayError::Config(
                "scheduler.cadence_secs must be greater than zero".to_string(),
            ));
        }
        if self.scheduler.window_days > MAX_WINDOW_DAYS {
            return Err(CakedayError::Config(format!(
                "scheduler.window_days must be at most {MAX_WINDOW_DAYS}, got {}",
                self.scheduler.window_days
            )));
        }
        if self.smtp.enabled {
            if self.smtp.host.trim().is_empty() {
                return Err(CakedayError::Config(
                    "smtp.host is required when smtp is enabled".to_string(),
                ));
            }
            if self.smtp.sender().trim().is_empty() {
                return Err(CakedayError::Config(
                    "smtp.from or smtp.username is required when smtp is enabled".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Environment variable naming the config file when no path is passed.
pub const CONFIG_PATH_ENV: &str = "CAKEDAY_CONFIG";

fn resolve_config_path(explicit: Option<&str>, from_env: Option<String>) -> String {
    explicit
        .map(String::from)
        .or(from_env.filter(|p| !p.is_empty()))
        .unwrap_or_else(default_config_path)
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.cakeday/cakeday.toml", home)
}
