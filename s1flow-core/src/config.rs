//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/s1flow/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/s1flow/` (~/.config/s1flow/)
//! - State/Logs: `$XDG_STATE_HOME/s1flow/` (~/.local/state/s1flow/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Column names of the capture export
    #[serde(default)]
    pub fields: FieldMap,

    /// Session grouping behaviour
    #[serde(default)]
    pub correlation: CorrelationConfig,

    /// Procedure classification
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Report output
    #[serde(default)]
    pub output: OutputConfig,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

/// Names of the columns (or JSON keys) holding each event field.
///
/// Defaults are the tshark field abbreviations used by
/// `tshark -T fields -e frame.number -e frame.time_epoch ...`.
/// The canonical names (`timestamp`, `enb_ue_id`, `mme_ue_id`, `message`,
/// `outcome`, `cause`, `nas`, `src`, `dst`) are always accepted as fallbacks.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FieldMap {
    pub frame: String,
    pub time: String,
    pub enb: String,
    pub mme: String,
    pub procedure_code: String,
    pub pdu: String,
    pub info: String,
    pub radio_network_cause: String,
    pub nas_cause: String,
    pub transport_cause: String,
    pub nas_emm_type: String,
    pub nas_security_header: String,
    pub ip_src: String,
    pub ip_dst: String,
    pub ipv6_src: String,
    pub ipv6_dst: String,
    pub src_port: String,
    pub dst_port: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            frame: "frame.number".to_string(),
            time: "frame.time_epoch".to_string(),
            enb: "s1ap.ENB_UE_S1AP_ID".to_string(),
            mme: "s1ap.MME_UE_S1AP_ID".to_string(),
            procedure_code: "s1ap.procedureCode".to_string(),
            pdu: "s1ap.S1AP_PDU".to_string(),
            info: "_ws.col.Info".to_string(),
            radio_network_cause: "s1ap.radioNetwork".to_string(),
            nas_cause: "s1ap.nas".to_string(),
            transport_cause: "s1ap.transport".to_string(),
            nas_emm_type: "nas_eps.nas_msg_emm_type".to_string(),
            nas_security_header: "nas_eps.security_header_type".to_string(),
            ip_src: "ip.src".to_string(),
            ip_dst: "ip.dst".to_string(),
            ipv6_src: "ipv6.src".to_string(),
            ipv6_dst: "ipv6.dst".to_string(),
            src_port: "sctp.srcport".to_string(),
            dst_port: "sctp.dstport".to_string(),
        }
    }
}

/// What to do when an event matches several open sessions equally well.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Attach to the candidate that saw the latest event
    #[default]
    MostRecent,
    /// Drop the event and report it
    Reject,
}

impl std::str::FromStr for AmbiguityPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.replace('-', "_").as_str() {
            "most_recent" => Ok(AmbiguityPolicy::MostRecent),
            "reject" => Ok(AmbiguityPolicy::Reject),
            other => Err(format!("unknown ambiguity policy: {}", other)),
        }
    }
}

/// Session grouping configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CorrelationConfig {
    #[serde(default)]
    pub on_ambiguous: AmbiguityPolicy,

    /// Close a session after `UEContextReleaseComplete` so reused IDs start a new one
    #[serde(default = "default_close_on_release")]
    pub close_on_release: bool,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            on_ambiguous: AmbiguityPolicy::default(),
            close_on_release: default_close_on_release(),
        }
    }
}

fn default_close_on_release() -> bool {
    true
}

/// Procedure classification configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ClassifierConfig {
    /// Additional causes treated as abnormal release
    #[serde(default)]
    pub extra_abnormal_causes: Vec<String>,

    /// Procedures to leave out of the table (e.g. "generic-release")
    #[serde(default)]
    pub disabled_procedures: Vec<String>,
}

/// Report output configuration
#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    /// json, text or csv
    #[serde(default = "default_output_format")]
    pub default_format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: default_output_format(),
        }
    }
}

fn default_output_format() -> String {
    "json".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate values serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        for name in &self.classifier.disabled_procedures {
            if crate::classify::Procedure::from_name(name).is_none() {
                return Err(Error::Config(format!(
                    "classifier.disabled_procedures: unknown procedure '{}'",
                    name
                )));
            }
        }
        match self.output.default_format.as_str() {
            "json" | "text" | "csv" => Ok(()),
            other => Err(Error::Config(format!(
                "output.default_format must be json, text or csv (got '{}')",
                other
            ))),
        }
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/s1flow/config.toml` (~/.config/s1flow/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("s1flow").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/s1flow/` (~/.local/state/s1flow/), holding daily
    /// `s1flow.YYYY-MM-DD.log` files
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("s1flow")
    }
}
