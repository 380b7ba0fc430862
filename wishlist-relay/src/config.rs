use http::HeaderName;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const DEFAULT_API_VERSION: &str = "2025-01";
pub const DEFAULT_SECRET_HEADER: &str = "x-maakka-secret";

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Store URL must be an http(s) URL with a host: {0}")]
    InvalidStoreUrl(String),

    #[error("Store URL from environment could not be parsed: {0}")]
    InvalidStoreHost(String),

    #[error("Empty admin access token")]
    EmptyAccessToken,

    #[error("Empty API version")]
    EmptyApiVersion,

    #[error("Upstream timeout must be at least 1 second")]
    InvalidTimeout,

    #[error("Invalid secret header name: {0}")]
    InvalidSecretHeader(String),

    #[error("Invalid port from environment: {0}")]
    InvalidPortOverride(String),
}

/// Relay configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for storefront requests
    #[serde(default)]
    pub listener: Listener,
    /// Shopify admin API the wishlist metafield lives in
    pub shopify: ShopifyConfig,
    /// Caller authentication and CORS
    #[serde(default)]
    pub access: AccessConfig,
}

impl Config {
    /// Applies deployment overrides on top of the file configuration.
    ///
    /// `lookup` resolves a variable name to its value, usually `std::env::var`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(store) = lookup("SHOPIFY_STORE") {
            self.shopify.store_url = parse_store(&store)?;
        }
        if let Some(token) = lookup("SHOPIFY_ADMIN_API_ACCESS_TOKEN") {
            self.shopify.access_token = token;
        }
        if let Some(secret) = lookup("FRONTEND_SECRET") {
            self.access.secret = Some(secret);
        }
        if let Some(origins) = lookup("CORS_ORIGIN") {
            self.access.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(port) = lookup("PORT") {
            self.listener.port = port
                .trim()
                .parse()
                .map_err(|_| ValidationError::InvalidPortOverride(port.clone()))?;
        }
        Ok(())
    }

    /// Validates the relay configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.shopify.validate()?;
        self.access.validate()?;
        Ok(())
    }
}

/// Accepts either a bare shop hostname or a full URL.
fn parse_store(store: &str) -> Result<Url, ValidationError> {
    let store = store.trim();
    let candidate = if store.contains("://") {
        store.to_string()
    } else {
        format!("https://{store}")
    };
    Url::parse(&candidate).map_err(|_| ValidationError::InvalidStoreHost(store.to_string()))
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "0.0.0.0".into(),
            port: 10000,
        }
    }
}

impl Listener {
    /// Validates the listener configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ShopifyConfig {
    /// Base URL of the shop admin, e.g. `https://example.myshopify.com`
    pub store_url: Url,
    /// Admin API access token. Never sent to callers.
    #[serde(default)]
    pub access_token: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Applies to the whole upstream round trip, body included
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl ShopifyConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !matches!(self.store_url.scheme(), "http" | "https") || self.store_url.host().is_none()
        {
            return Err(ValidationError::InvalidStoreUrl(self.store_url.to_string()));
        }
        if self.access_token.trim().is_empty() {
            return Err(ValidationError::EmptyAccessToken);
        }
        if self.api_version.trim().is_empty() {
            return Err(ValidationError::EmptyApiVersion);
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AccessConfig {
    /// Name of the header carrying the shared secret
    #[serde(default = "default_secret_header")]
    pub secret_header: String,
    /// Shared secret. When unset every protected request is rejected.
    #[serde(default)]
    pub secret: Option<String>,
    /// Exact origins allowed to call the relay from a browser. `*` or an
    /// empty list allows any.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_secret_header() -> String {
    DEFAULT_SECRET_HEADER.to_string()
}

impl Default for AccessConfig {
    fn default() -> Self {
        AccessConfig {
            secret_header: default_secret_header(),
            secret: None,
            allowed_origins: Vec::new(),
        }
    }
}

impl AccessConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        HeaderName::from_bytes(self.secret_header.as_bytes())
            .map_err(|_| ValidationError::InvalidSecretHeader(self.secret_header.clone()))?;
        Ok(())
    }

    pub fn has_secret(&self) -> bool {
        self.secret.as_deref().is_some_and(|s| !s.is_empty())
    }
}
