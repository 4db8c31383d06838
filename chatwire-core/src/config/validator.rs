//! Configuration validation utilities

use super::error::ValidationError;
use super::schema::ChatwireConfig;
use crate::protocol::KNOWN_MODELS;
use tracing::warn;

/// Configuration validator with additional validation rules
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Create a new validator
    pub fn new() -> Self {
        Self
    }

    /// Validate a configuration with extended rules
    pub fn validate(&self, config: &ChatwireConfig) -> Result<(), ValidationError> {
        // First run the built-in validation
        config.validate()?;

        self.validate_urls(config)?;
        self.check_models(config);

        Ok(())
    }

    /// Every configured base URL must be an absolute http(s) URL
    fn validate_urls(&self, config: &ChatwireConfig) -> Result<(), ValidationError> {
        validate_http_url("chat.base_url", &config.chat.base_url)?;

        if let Some(image_url) = &config.image.base_url {
            validate_http_url("image.base_url", image_url)?;
        }

        for (name, endpoint) in config.search.endpoints.entries() {
            validate_http_url(&format!("search.endpoints.{}", name), endpoint)?;
        }

        Ok(())
    }

    /// Unknown model ids are allowed (gateways add models often) but logged
    fn check_models(&self, config: &ChatwireConfig) {
        for (field, model) in [("chat.model", &config.chat.model), ("image.model", &config.image.model)] {
            if !KNOWN_MODELS.contains(&model.as_str()) {
                warn!("{} '{}' is not in the known model list", field, model);
            }
        }
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ValidationError> {
    match url::Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(()),
        Ok(url) => Err(ValidationError::not_http_url(
            field,
            format!("URL scheme must be http or https, got: {}", url.scheme()),
        )),
        Err(e) => Err(ValidationError::not_http_url(field, e.to_string())),
    }
}
