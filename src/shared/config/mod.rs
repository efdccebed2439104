//! Application configuration module
//!
//! Client-side connection settings, built and validated through
//! `AppConfigBuilder`.

use thiserror::Error;

use crate::shared::messaging::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the chat server, without a trailing slash
    pub server_url: String,
    /// History page size requested by the client
    pub page_size: u32,
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(self.server_url.clone()));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidPageSize(self.page_size));
        }
        Ok(())
    }

    /// Websocket URL derived from the server URL
    pub fn socket_url(&self, token: &str) -> String {
        let base = self
            .server_url
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1);
        format!("{}/ws?token={}", base, urlencoding::encode(token))
    }
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    server_url: Option<String>,
    page_size: Option<u32>,
}

impl AppConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let server_url = self
            .server_url
            .ok_or(ConfigError::MissingValue("server_url"))?
            .trim_end_matches('/')
            .to_string();
        let config = AppConfig {
            server_url,
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("page size must be between 1 and 100, got {0}")]
    InvalidPageSize(u32),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
}
