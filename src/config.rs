//! Configuration documents and builder settings.
//!
//! Configuration documents may be authored in JSON or YAML; both parse into
//! the same [`serde_json::Value`] tree consumed by
//! [`ModelBuilder`](crate::builder::ModelBuilder) and
//! [`Codec`](crate::codec::Codec).
//!
//! # Configuration Document Structure
//!
//! ```yaml
//! typeName: Digraph
//! models:
//!   g:
//!     typeName: Gen
//!     properties:
//!       period: 2.0
//!   o:
//!     typeName: Obs
//! couplings:
//!   - from: { model: g, port: out }
//!     to: { model: o, port: in }
//!   - from: { model: this, port: in }
//!     to: { model: o, port: in }
//! ```
//!
//! # Builder Settings
//!
//! ```yaml
//! unresolved_couplings: skip   # or: reject
//! inject_properties: true
//! log_level: info
//! ```
//!
//! Leaf properties travel on [`PROPERTIES_PORT`](crate::types::PROPERTIES_PORT);
//! wrappers receive theirs through
//! [`Adapter::configure`](crate::component::Adapter::configure).

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::PortId;

/// Document field naming a node's registered type.
pub const TYPE_NAME: &str = "typeName";
/// Document field holding a wrapper's child configuration.
pub const WRAPPED_MODEL: &str = "wrappedModel";
/// Document field holding a digraph's named children.
pub const MODELS: &str = "models";
/// Document field holding a digraph's coupling edges.
pub const COUPLINGS: &str = "couplings";
/// Document field holding a leaf's configuration payload.
pub const PROPERTIES: &str = "properties";
/// Serialized-document field holding a component's recorded state.
pub const STATE: &str = "state";

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown file format: {0}")]
    UnknownFormat(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Text format of a configuration or serialized document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Picks the format from a file extension (`json`, `yaml`, `yml`).
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::UnknownFormat(ext.to_string())),
        }
    }

    /// Parses a document.
    pub fn parse(self, text: &str) -> ConfigResult<serde_json::Value> {
        match self {
            Self::Json => Ok(serde_json::from_str(text)?),
            Self::Yaml => Ok(serde_yaml::from_str(text)?),
        }
    }

    /// Renders a document.
    pub fn render(self, doc: &serde_json::Value) -> ConfigResult<String> {
        match self {
            Self::Json => Ok(serde_json::to_string_pretty(doc)?),
            Self::Yaml => Ok(serde_yaml::to_string(doc)?),
        }
    }
}

/// Loads a document from a file, auto-detecting format.
pub fn load_document<P: AsRef<Path>>(path: P) -> ConfigResult<serde_json::Value> {
    let path = path.as_ref();
    let format = DocumentFormat::from_path(path)?;
    let content = std::fs::read_to_string(path)?;
    format.parse(&content)
}

/// Writes a document to a file, picking the format from its extension.
pub fn write_document<P: AsRef<Path>>(path: P, doc: &serde_json::Value) -> ConfigResult<()> {
    let path = path.as_ref();
    let text = DocumentFormat::from_path(path)?.render(doc)?;
    std::fs::write(path, text)?;
    Ok(())
}

/// One end of a coupling edge, by child name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PinSpec {
    /// Child name, or `this` for the digraph's boundary
    pub model: String,
    pub port: PortId,
}

/// A coupling edge as written in documents:
/// `{from: {model, port}, to: {model, port}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CouplingSpec {
    pub from: PinSpec,
    pub to: PinSpec,
}

impl CouplingSpec {
    pub fn new(
        from_model: impl Into<String>,
        from_port: impl Into<PortId>,
        to_model: impl Into<String>,
        to_port: impl Into<PortId>,
    ) -> Self {
        Self {
            from: PinSpec {
                model: from_model.into(),
                port: from_port.into(),
            },
            to: PinSpec {
                model: to_model.into(),
                port: to_port.into(),
            },
        }
    }

    /// Renders the edge as a document value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "from": {"model": self.from.model, "port": self.from.port},
            "to": {"model": self.to.model, "port": self.to.port},
        })
    }
}

/// What the builder does with a coupling edge naming an unknown child.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouplingPolicy {
    /// Drop the edge with a warning and keep building.
    #[default]
    Skip,
    /// Fail the enclosing digraph's build.
    Reject,
}

/// Settings for [`ModelBuilder`](crate::builder::ModelBuilder).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildSettings {
    /// Handling of coupling edges that reference unknown children
    #[serde(default)]
    pub unresolved_couplings: CouplingPolicy,

    /// Whether freshly built components receive their configuration
    #[serde(default = "default_inject_properties")]
    pub inject_properties: bool,

    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_inject_properties() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            unresolved_couplings: CouplingPolicy::default(),
            inject_properties: default_inject_properties(),
            log_level: default_log_level(),
        }
    }
}

impl BuildSettings {
    /// Creates default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads settings from a YAML string.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let settings: BuildSettings = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings from a JSON string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let settings: BuildSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings from a file, auto-detecting format.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match DocumentFormat::from_path(path)? {
            DocumentFormat::Yaml => Self::from_yaml(&content),
            DocumentFormat::Json => Self::from_json(&content),
        }
    }

    /// Validates the settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "Unknown log level: {} (expected one of {})",
                self.log_level,
                LOG_LEVELS.join(", ")
            )));
        }
        Ok(())
    }

    /// Converts to YAML string.
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Converts to JSON string.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builder for creating BuildSettings programmatically.
#[derive(Default)]
pub struct BuildSettingsBuilder {
    settings: BuildSettings,
}

impl BuildSettingsBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the unresolved-coupling policy.
    pub fn unresolved_couplings(mut self, policy: CouplingPolicy) -> Self {
        self.settings.unresolved_couplings = policy;
        self
    }

    /// Enables or disables properties injection.
    pub fn inject_properties(mut self, enabled: bool) -> Self {
        self.settings.inject_properties = enabled;
        self
    }

    /// Sets the log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.settings.log_level = level.into();
        self
    }

    /// Builds and validates the settings.
    pub fn build(self) -> ConfigResult<BuildSettings> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}
