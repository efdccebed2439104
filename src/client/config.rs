use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError};

/// Default server URL
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Client configuration: server settings plus the session token
#[derive(Debug, Clone)]
pub struct Config {
    app: AppConfig,
    token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env().unwrap_or_else(|e| {
            tracing::warn!("Invalid CLIENT_API_URL ({}), using {}", e, DEFAULT_SERVER_URL);
            Self {
                app: AppConfig {
                    server_url: DEFAULT_SERVER_URL.to_string(),
                    page_size: crate::shared::messaging::DEFAULT_PAGE_SIZE,
                },
                token: None,
            }
        })
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `CLIENT_API_URL`, falling back to the local default server
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_url = std::env::var("CLIENT_API_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
        Self::with_builder(AppConfig::builder().server_url(server_url))
    }

    pub fn with_builder(builder: AppConfigBuilder) -> Result<Self, ConfigError> {
        Ok(Self { app: builder.build()?, token: None })
    }

    /// Set the JWT token
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Get the JWT token
    pub fn get_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Clear the token (logout)
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url(), path)
    }

    pub fn server_url(&self) -> &str {
        &self.app.server_url
    }

    pub fn page_size(&self) -> u32 {
        self.app.page_size
    }

    /// Socket URL carrying the current token
    pub fn socket_url(&self) -> Option<String> {
        self.token.as_deref().map(|token| self.app.socket_url(token))
    }
}
