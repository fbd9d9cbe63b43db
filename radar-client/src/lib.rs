//! Radar Completion Client
//!
//! A small, type-safe client for OpenAI-compatible chat completion services
//! (DeepSeek by default). The classifier only depends on the
//! [`CompletionService`] trait, so tests and alternative providers can swap
//! the HTTP client out.
//!
//! # Example
//!
//! ```no_run
//! use radar_client::{CompletionClient, CompletionConfig, CompletionService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), radar_client::ClientError> {
//!     let client = CompletionClient::new(CompletionConfig {
//!         api_key: "sk-...".to_string(),
//!         ..Default::default()
//!     })?;
//!
//!     let answer = client.complete("Is this job remote?").await?;
//!     println!("{}", answer);
//!     Ok(())
//! }
//! ```

mod completion;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use completion::CompletionService;
pub use config::CompletionConfig;
pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for a chat completion API
#[derive(Debug, Clone)]
pub struct CompletionClient {
    /// Base URL of the API (e.g., "https://api.deepseek.com/v1")
    base_url: String,
    api_key: String,
    model: String,
    /// HTTP client instance
    client: Client,
}

impl CompletionClient {
    /// Create a new completion client with the configured request timeout
    pub fn new(config: CompletionConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self::with_client(config, client))
    }

    /// Create a new completion client with a custom HTTP client
    ///
    /// This allows you to configure proxies, TLS settings, etc.
    pub fn with_client(config: CompletionConfig, client: Client) -> Self {
        let base_url = if config.api_base.trim().is_empty() {
            config::DEFAULT_API_BASE.to_string()
        } else {
            config.api_base.trim().trim_end_matches('/').to_string()
        };
        let model = if config.model.trim().is_empty() {
            config::DEFAULT_MODEL.to_string()
        } else {
            config.model
        };

        Self {
            base_url,
            api_key: config.api_key,
            model,
            client,
        }
    }

    /// Get the base URL of the API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the model name sent with every request
    pub fn model(&self) -> &str {
        &self.model
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let err = ClientError::api_error(status.as_u16(), error_text);
            if err.is_server_error() {
                tracing::warn!("Completion service failed: {}", err);
            } else {
                tracing::debug!("Completion request refused: {}", err);
            }
            return Err(err);
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
