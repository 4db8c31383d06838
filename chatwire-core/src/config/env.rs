//! `${VAR}` substitution for configuration text and fields

use super::error::ConfigError;
use super::schema::ChatwireConfig;
use super::secrets::SecretString;
use regex::Regex;
use std::env;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is valid")
});

/// Replace every `${VAR}` in `content` with the variable's value.
///
/// Fails on the first variable that is not set.
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(content.len());
    let mut copied_to = 0;

    for caps in ENV_VAR_PATTERN.captures_iter(content) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = env::var(name.as_str()).map_err(|_| ConfigError::MissingEnvVar {
            name: name.as_str().to_string(),
        })?;

        output.push_str(&content[copied_to..whole.start()]);
        output.push_str(&value);
        copied_to = whole.end();
    }

    output.push_str(&content[copied_to..]);
    Ok(output)
}

/// Give the credential and endpoint fields a second substitution pass.
///
/// A substituted value may itself name another variable; text substitution
/// runs once, so those references are still present after parsing.
pub fn interpolate_config_env_vars(config: &mut ChatwireConfig) -> Result<(), ConfigError> {
    let api_key = config.chat.api_key.expose_secret();
    if ENV_VAR_PATTERN.is_match(api_key) {
        config.chat.api_key = SecretString::new(interpolate_env_vars(api_key)?);
    }

    if ENV_VAR_PATTERN.is_match(&config.chat.base_url) {
        config.chat.base_url = interpolate_env_vars(&config.chat.base_url)?;
    }

    if let Some(image_url) = config.image.base_url.as_mut() {
        if ENV_VAR_PATTERN.is_match(image_url) {
            *image_url = interpolate_env_vars(image_url)?;
        }
    }

    Ok(())
}
