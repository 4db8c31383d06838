//! Configuration module for Chatwire
//!
//! Every component receives its settings from a [`ChatwireConfig`] at
//! construction time; there are no process-wide defaults for keys or URLs.

mod env;
mod error;
mod schema;
mod secrets;
mod validator;

pub use error::{ConfigError, ConfigFormat, ConfigResult, ValidationError, ValidationErrorKind};
pub use schema::{
    ChatConfig, ChatwireConfig, FetchConfig, ImageConfig, SearchConfig, SourceEndpoints,
    StreamingConfig, CONFIG_VERSION,
};
pub use secrets::SecretString;
pub use validator::ConfigValidator;

use std::fs;
use std::path::Path;
use tracing::debug;

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> ConfigResult<ChatwireConfig> {
    load(path.as_ref(), ConfigFormat::Yaml)
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> ConfigResult<ChatwireConfig> {
    load(path.as_ref(), ConfigFormat::Json)
}

/// Read, interpolate `${VAR}` references, parse and validate
fn load(path: &Path, format: ConfigFormat) -> ConfigResult<ChatwireConfig> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let content = env::interpolate_env_vars(&content)?;

    let parse_error = |line, column, message| ConfigError::Parse {
        path: path.to_path_buf(),
        format,
        line,
        column,
        message,
    };

    let mut config: ChatwireConfig = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(&content).map_err(|e| {
            let location = e.location();
            parse_error(
                location.as_ref().map(|l| l.line()),
                location.as_ref().map(|l| l.column()),
                e.to_string(),
            )
        })?,
        ConfigFormat::Json => serde_json::from_str(&content)
            .map_err(|e| parse_error(Some(e.line()), Some(e.column()), e.to_string()))?,
    };

    env::interpolate_config_env_vars(&mut config)?;
    ConfigValidator::new().validate(&config)?;

    debug!("Loaded {} config from {}", format, path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_yaml() {
        let yaml = r#"
version: "0.1"
chat:
  base_url: https://open.example.dev/v1
  api_key: sk-public
  model: gemini-3-flash-preview
"#;
        let config: ChatwireConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.chat.max_history, 20);
        assert_eq!(config.chat.max_tokens, 4096);
        assert_eq!(config.streaming.non_streaming_markers, vec!["thinking"]);
        assert_eq!(config.fetch.proxies.len(), 3);
        assert_eq!(config.search.default_max_results, 10);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let yaml = r#"
version: "0.1"
chat:
  base_url: https://open.example.dev/v1
  api_key: sk-public
  model: gemini-3-flash-preview
  colour: blue
"#;
        assert!(serde_yaml::from_str::<ChatwireConfig>(yaml).is_err());
    }
}
