//! Errors raised while loading and checking a configuration file

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Serialization format of a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigFormat::Yaml => f.write_str("YAML"),
            ConfigFormat::Json => f.write_str("JSON"),
        }
    }
}

/// Failure to produce a usable [`ChatwireConfig`](super::ChatwireConfig)
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid {format} in {}{}: {message}", .path.display(), position(.line, .column))]
    Parse {
        path: PathBuf,
        format: ConfigFormat,
        line: Option<usize>,
        column: Option<usize>,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Environment variable '{name}' referenced in config is not set")]
    MissingEnvVar { name: String },
}

fn position(line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!(" at {}:{}", line, column),
        (Some(line), None) => format!(" at line {}", line),
        _ => String::new(),
    }
}

/// A rule violation, located by the dotted path of the offending field
#[derive(Debug, Error)]
#[error("{field}: {kind}{}", hint_suffix(.hint))]
pub struct ValidationError {
    /// Dotted field path, e.g. `fetch.proxies[0].template`
    pub field: String,
    pub kind: ValidationErrorKind,
    /// How to fix it, when that is not obvious from the kind
    pub hint: Option<String>,
}

fn hint_suffix(hint: &Option<String>) -> String {
    hint.as_ref()
        .map(|h| format!(" ({})", h))
        .unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum ValidationErrorKind {
    #[error("value is required")]
    Missing,

    #[error("out of range, {0}")]
    OutOfRange(String),

    #[error("malformed value, {0}")]
    Malformed(String),

    #[error("'{0}' appears more than once")]
    Duplicate(String),

    #[error("not an http(s) URL, {0}")]
    NotHttpUrl(String),

    #[error("unsupported version '{found}', expected '{expected}'")]
    UnsupportedVersion {
        expected: &'static str,
        found: String,
    },
}

impl ValidationError {
    pub fn new(field: impl Into<String>, kind: ValidationErrorKind) -> Self {
        Self {
            field: field.into(),
            kind,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, ValidationErrorKind::Missing)
    }

    pub fn out_of_range(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(field, ValidationErrorKind::OutOfRange(reason.into()))
    }

    pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(field, ValidationErrorKind::Malformed(reason.into()))
    }

    pub fn not_http_url(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(field, ValidationErrorKind::NotHttpUrl(reason.into()))
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
