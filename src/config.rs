//! Configuration loading.
//!
//! Looked up in order: `--config <path>`, `$COURSESTATSD_CONFIG`, then
//! `$XDG_CONFIG_HOME/coursestatsd/config.toml` (~/.config/coursestatsd/).
//! A missing file at the default location is not an error; every section
//! has defaults.

use anyhow::{anyhow, Context};
use chrono::FixedOffset;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "COURSESTATSD_CONFIG";

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub reports: ReportsConfig,

    #[serde(default)]
    pub access: AccessConfig,
}

/// Store opened at startup, if any. `store.open` can switch it later.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct StoreConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); RUST_LOG wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// When set, logs also go to a daily rolling file in this directory.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Report defaults applied when a request omits a threshold.
#[derive(Debug, Deserialize, Clone)]
pub struct ReportsConfig {
    /// Offset used for time-of-day and calendar bucketing, e.g. "+07:00".
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,

    #[serde(default = "default_competency_threshold")]
    pub competency_threshold: f64,

    #[serde(default = "default_min_activity_rate")]
    pub min_activity_rate: f64,

    #[serde(default = "default_inactive_activity_rate")]
    pub inactive_activity_rate: f64,

    #[serde(default = "default_max_competent_percentage")]
    pub max_competent_percentage: f64,

    /// Role id assumed for "student" when the role table has no such row.
    #[serde(default = "default_student_role_fallback_id")]
    pub student_role_fallback_id: i64,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            utc_offset: default_utc_offset(),
            competency_threshold: default_competency_threshold(),
            min_activity_rate: default_min_activity_rate(),
            inactive_activity_rate: default_inactive_activity_rate(),
            max_competent_percentage: default_max_competent_percentage(),
            student_role_fallback_id: default_student_role_fallback_id(),
        }
    }
}

impl ReportsConfig {
    pub fn offset(&self) -> anyhow::Result<FixedOffset> {
        parse_utc_offset(&self.utc_offset)
    }
}

fn default_utc_offset() -> String {
    "+00:00".to_string()
}

fn default_competency_threshold() -> f64 {
    80.0
}

fn default_min_activity_rate() -> f64 {
    80.0
}

fn default_inactive_activity_rate() -> f64 {
    20.0
}

fn default_max_competent_percentage() -> f64 {
    50.0
}

fn default_student_role_fallback_id() -> i64 {
    5
}

/// Who may run reports for a course.
#[derive(Debug, Deserialize, Clone)]
pub struct AccessConfig {
    /// User ids allowed everywhere.
    #[serde(default)]
    pub site_admins: Vec<i64>,

    /// Role shortnames that grant access within a course context.
    #[serde(default = "default_report_roles")]
    pub report_roles: Vec<String>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            site_admins: vec![],
            report_roles: default_report_roles(),
        }
    }
}

fn default_report_roles() -> Vec<String> {
    vec![
        "manager".to_string(),
        "editingteacher".to_string(),
        "teacher".to_string(),
    ]
}

/// Parses "+HH:MM", "-HHMM" and the like; a bare "Z" means UTC.
pub fn parse_utc_offset(raw: &str) -> anyhow::Result<FixedOffset> {
    let t = raw.trim();
    if t.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).ok_or_else(|| anyhow!("invalid utc offset"));
    }
    t.parse::<FixedOffset>()
        .map_err(|e| anyhow!("invalid utc offset {t:?}: {e}"))
}

fn xdg_config_home() -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Config {
    pub fn default_path() -> PathBuf {
        xdg_config_home().join("coursestatsd").join("config.toml")
    }

    /// Loads configuration. An explicitly named file must exist; the
    /// default location may be absent.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let named = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
        let config = match named {
            Some(path) => Self::load_from(&path)?,
            None => {
                let path = Self::default_path();
                if path.is_file() {
                    Self::load_from(&path)?
                } else {
                    Config::default()
                }
            }
        };
        config.reports.offset()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(text)?;
        Ok(config)
    }
}
