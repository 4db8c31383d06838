//! HTTP client implementation using reqwest

use crate::config::{FetchConfig, SecretString};
use crate::http::error::{map_http_error, HttpError};
use crate::http::RequestOptions;
use reqwest::{Client, ClientBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum response size for buffered bodies (10MB)
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Default user agent
const USER_AGENT: &str = concat!("Mozilla/5.0 (compatible; chatwire/", env!("CARGO_PKG_VERSION"), ")");

/// Shared HTTP client with connection pooling
#[derive(Clone)]
pub struct HttpClient {
    /// The underlying reqwest client
    client: Arc<Client>,

    /// Maximum buffered response size to prevent OOM
    max_response_size: usize,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, HttpError> {
        Self::with_config(Duration::from_secs(10), 10)
    }

    /// Create a client from fetch configuration
    pub fn from_config(config: &FetchConfig) -> Result<Self, HttpError> {
        Self::build(
            Duration::from_secs(config.connect_timeout_secs),
            10,
            config.user_agent.as_deref().unwrap_or(USER_AGENT),
        )
    }

    /// Create a new HTTP client with custom configuration.
    ///
    /// There is no client-wide request timeout: every call passes its own
    /// through [`RequestOptions`].
    pub fn with_config(connect_timeout: Duration, max_idle_per_host: usize) -> Result<Self, HttpError> {
        Self::build(connect_timeout, max_idle_per_host, USER_AGENT)
    }

    fn build(
        connect_timeout: Duration,
        max_idle_per_host: usize,
        user_agent: &str,
    ) -> Result<Self, HttpError> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(connect_timeout)
            .user_agent(user_agent)
            .gzip(true)
            .build()
            .map_err(|e| HttpError::Client(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            max_response_size: MAX_RESPONSE_SIZE,
        })
    }

    /// GET `url` and return the body as text; non-2xx is an error
    pub async fn get_text(&self, url: &str, options: &RequestOptions) -> Result<String, HttpError> {
        let response = self.send_get(url, options).await?;
        self.read_text(response, url).await
    }

    /// GET `url` and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> Result<T, HttpError> {
        let text = self.get_text(url, options).await?;
        serde_json::from_str(&text).map_err(|e| HttpError::Parse {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// POST a JSON body and hand back the successful response unread.
    ///
    /// Streaming callers consume the body themselves; non-2xx responses are
    /// read here and mapped through [`map_http_error`].
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        bearer: Option<&SecretString>,
        options: &RequestOptions,
    ) -> Result<Response, HttpError> {
        let request_id = options.request_id;
        debug!("POST {} [request_id: {}]", url, request_id);

        let mut builder = self
            .client
            .post(url)
            .timeout(options.timeout)
            .header("X-Request-ID", request_id.to_string())
            .json(body);

        if let Some(token) = bearer {
            builder = builder.bearer_auth(token.expose_secret());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| HttpError::from_reqwest(e, url, request_id))?;

        Self::check_status(response, url, request_id).await
    }

    /// Read a successful response body as text, enforcing the size cap
    pub async fn read_text(&self, response: Response, url: &str) -> Result<String, HttpError> {
        if let Some(content_length) = response.content_length() {
            if content_length as usize > self.max_response_size {
                return Err(HttpError::TooLarge {
                    size: content_length as usize,
                    max: self.max_response_size,
                });
            }
        }

        let text = response.text().await.map_err(|e| HttpError::Parse {
            url: url.to_string(),
            message: format!("Failed to read response body: {}", e),
        })?;

        if text.len() > self.max_response_size {
            return Err(HttpError::TooLarge {
                size: text.len(),
                max: self.max_response_size,
            });
        }

        Ok(text)
    }

    async fn send_get(&self, url: &str, options: &RequestOptions) -> Result<Response, HttpError> {
        let request_id = options.request_id;
        debug!("GET {} [request_id: {}]", url, request_id);

        let response = self
            .client
            .get(url)
            .timeout(options.timeout)
            .header("X-Request-ID", request_id.to_string())
            .header("Accept", "text/html,application/json;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| HttpError::from_reqwest(e, url, request_id))?;

        Self::check_status(response, url, request_id).await
    }

    async fn check_status(
        response: Response,
        url: &str,
        request_id: uuid::Uuid,
    ) -> Result<Response, HttpError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        warn!(
            "Request to {} failed with status {} [request_id: {}]",
            url, status, request_id
        );

        // The body is only used for the error message; an unreadable body
        // falls back to the default message
        let body = response.text().await.ok();
        Err(map_http_error(status, body.as_deref()))
    }
}
