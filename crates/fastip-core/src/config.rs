//! Configuration types for fastip
//!
//! This module defines all configuration structures used throughout the
//! workspace. Configuration is read from a TOML file (or JSON when the file
//! name ends in `.json`) and validated before anything touches the network.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::traits::{ProbeSettings, RecordTarget};

/// Main fastip configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FastIpConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Where the candidate list comes from
    pub source: SourceConfig,

    /// Probe parameters
    pub probe: ProbeConfig,

    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// The record to publish the winner to
    pub record: RecordConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl FastIpConfig {
    /// Load and validate a configuration file
    ///
    /// Files ending in `.json` are parsed as JSON, everything else as TOML.
    /// YAML files are refused before they are read.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        if matches!(extension.as_deref(), Some("yaml" | "yml")) {
            return Err(crate::Error::config(format!(
                "{}: YAML configuration is not supported, use TOML or JSON",
                path.display()
            )));
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            crate::Error::config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config = if extension.as_deref() == Some("json") {
            Self::from_json_str(&contents)?
        } else {
            Self::from_toml_str(&contents)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document (not validated)
    pub fn from_toml_str(contents: &str) -> Result<Self, crate::Error> {
        Ok(toml::from_str(contents)?)
    }

    /// Parse a JSON document (not validated)
    pub fn from_json_str(contents: &str) -> Result<Self, crate::Error> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(crate::Error::config(format!(
                    "log_level '{}' is not valid. Valid levels: trace, debug, info, warn, error",
                    self.log_level
                )));
            }
        }

        self.source.validate()?;
        self.probe.validate()?;
        self.provider.validate()?;
        self.record.validate()?;
        self.engine.validate()?;

        Ok(())
    }
}

/// Candidate source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Newline-separated list fetched with one plain GET
    Http {
        /// URL of the list
        url: String,
        /// Request timeout in seconds
        #[serde(default = "default_source_timeout_secs")]
        timeout_secs: u64,
    },

    /// Newline-separated list read from a local file
    File {
        /// Path to the list
        path: String,
    },

    /// Inline list
    Static {
        /// Candidate addresses
        addresses: Vec<String>,
    },

    /// Custom source
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl SourceConfig {
    /// Validate the source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SourceConfig::Http { url, timeout_secs } => {
                if url.is_empty() {
                    return Err(crate::Error::config("Candidate list URL cannot be empty"));
                }
                if !url.starts_with("https://") && !url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "Candidate list URL must use HTTP or HTTPS scheme. Got: {}",
                        url
                    )));
                }
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("Candidate list timeout must be > 0"));
                }
                Ok(())
            }
            SourceConfig::File { path } => {
                if path.is_empty() {
                    return Err(crate::Error::config("Candidate file path cannot be empty"));
                }
                Ok(())
            }
            SourceConfig::Static { .. } => Ok(()),
            SourceConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom source factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom source config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the source type name
    pub fn type_name(&self) -> &str {
        match self {
            SourceConfig::Http { .. } => "http",
            SourceConfig::File { .. } => "file",
            SourceConfig::Static { .. } => "static",
            SourceConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Target domain (SNI and Host header)
    pub domain: String,

    /// Port to connect to on every candidate
    #[serde(default = "default_probe_port")]
    pub port: u16,

    /// Diagnostic path requested on the target
    #[serde(default = "default_probe_path")]
    pub path: String,

    /// `https` or `http`
    #[serde(default = "default_probe_scheme")]
    pub scheme: String,

    /// The only status code that counts as reachable
    #[serde(default = "default_qualifying_status")]
    pub qualifying_status: u16,

    /// Hard per-probe timeout in seconds
    #[serde(default = "default_probe_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of probes in flight
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl ProbeConfig {
    /// Create a probe configuration with defaults for everything but the domain
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            port: default_probe_port(),
            path: default_probe_path(),
            scheme: default_probe_scheme(),
            qualifying_status: default_qualifying_status(),
            timeout_secs: default_probe_timeout_secs(),
            concurrency: default_concurrency(),
        }
    }

    /// Validate the probe configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_domain_name(&self.domain)?;

        if self.port == 0 {
            return Err(crate::Error::config("Probe port must be > 0"));
        }
        if !self.path.starts_with('/') {
            return Err(crate::Error::config(format!(
                "Probe path must start with '/'. Got: {}",
                self.path
            )));
        }
        match self.scheme.as_str() {
            "https" | "http" => {}
            other => {
                return Err(crate::Error::config(format!(
                    "Probe scheme '{}' is not supported. Supported: https, http",
                    other
                )));
            }
        }
        if !(100..=599).contains(&self.qualifying_status) {
            return Err(crate::Error::config(format!(
                "Qualifying status must be between 100 and 599. Got: {}",
                self.qualifying_status
            )));
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Probe timeout must be > 0"));
        }
        if self.concurrency == 0 {
            return Err(crate::Error::config("Probe concurrency must be > 0"));
        }

        Ok(())
    }

    /// Runtime settings handed to every probe
    pub fn settings(&self) -> ProbeSettings {
        ProbeSettings {
            timeout: Duration::from_secs(self.timeout_secs),
            domain: self.domain.clone(),
            port: self.port,
            path: self.path.clone(),
            scheme: self.scheme.clone(),
            qualifying_status: self.qualifying_status,
        }
    }
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider (global API key authentication)
    Cloudflare {
        /// Account e-mail (`X-Auth-Email`)
        email: String,
        /// Global API key (`X-Auth-Key`)
        api_key: String,
        /// API base URL override
        #[serde(default)]
        api_base: Option<String>,
        /// Log the update instead of sending it
        #[serde(default)]
        dry_run: bool,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

// Keeps the API key out of logs
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderConfig::Cloudflare {
                email,
                api_base,
                dry_run,
                ..
            } => f
                .debug_struct("Cloudflare")
                .field("email", email)
                .field("api_key", &"<REDACTED>")
                .field("api_base", api_base)
                .field("dry_run", dry_run)
                .finish(),
            ProviderConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("config", &"<REDACTED>")
                .finish(),
        }
    }
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare {
                email,
                api_key,
                api_base,
                ..
            } => {
                if email.is_empty() {
                    return Err(crate::Error::config("Cloudflare account email cannot be empty"));
                }
                if api_key.is_empty() {
                    return Err(crate::Error::config("Cloudflare API key cannot be empty"));
                }
                if let Some(base) = api_base
                    && !base.starts_with("https://")
                    && !base.starts_with("http://")
                {
                    return Err(crate::Error::config(format!(
                        "Cloudflare api_base must use HTTP or HTTPS scheme. Got: {}",
                        base
                    )));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }

    /// Force dry-run mode where the provider supports it
    pub fn set_dry_run(&mut self, enabled: bool) {
        if let ProviderConfig::Cloudflare { dry_run, .. } = self {
            *dry_run = enabled;
        }
    }
}

/// DNS record configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Zone identifier
    pub zone_id: String,

    /// Record identifier
    pub record_id: String,

    /// Record name (e.g., "www.example.com")
    pub name: String,

    /// Record type (A or AAAA)
    #[serde(default = "default_record_type")]
    pub record_type: String,

    /// Time-to-live in seconds (1 = automatic)
    #[serde(default = "default_ttl")]
    pub ttl: u32,
}

impl RecordConfig {
    /// Validate the record configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.zone_id.is_empty() {
            return Err(crate::Error::config("record.zone_id cannot be empty"));
        }
        if self.record_id.is_empty() {
            return Err(crate::Error::config("record.record_id cannot be empty"));
        }
        validate_domain_name(&self.name)?;

        match self.record_type.to_uppercase().as_str() {
            "A" | "AAAA" => {}
            other => {
                return Err(crate::Error::config(format!(
                    "Record type '{}' is not supported. Supported: A, AAAA",
                    other
                )));
            }
        }

        if self.ttl != 1 && !(60..=86400).contains(&self.ttl) {
            return Err(crate::Error::config(format!(
                "TTL must be 1 (automatic) or between 60 and 86400 seconds. Got: {}",
                self.ttl
            )));
        }

        Ok(())
    }

    /// The record target handed to publishers
    pub fn target(&self) -> RecordTarget {
        RecordTarget {
            zone_id: self.zone_id.clone(),
            record_id: self.record_id.clone(),
            name: self.name.clone(),
            record_type: self.record_type.to_uppercase(),
            ttl: self.ttl,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the engine event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event_channel_capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks: total length, label length, characters, and no
/// leading or trailing hyphen.
pub fn validate_domain_name(domain: &str) -> Result<(), crate::Error> {
    if domain.is_empty() {
        return Err(crate::Error::config("Domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(crate::Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(crate::Error::config(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(crate::Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(crate::Error::config(format!(
                "Domain label contains invalid characters. Label: '{}'",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(crate::Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_source_timeout_secs() -> u64 {
    10
}

fn default_probe_port() -> u16 {
    443
}

fn default_probe_path() -> String {
    "/clientarea.php".to_string()
}

fn default_probe_scheme() -> String {
    "https".to_string()
}

fn default_qualifying_status() -> u16 {
    400
}

fn default_probe_timeout_secs() -> u64 {
    5
}

/// Default number of probes in flight
pub fn default_concurrency() -> usize {
    10
}

fn default_record_type() -> String {
    "A".to_string()
}

fn default_ttl() -> u32 {
    60
}

fn default_event_channel_capacity() -> usize {
    256
}
