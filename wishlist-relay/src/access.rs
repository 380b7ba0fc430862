//! Caller authentication and CORS for the protected wishlist route.
//!
//! A request is admitted when its `Origin` (if any) is allowed and it carries
//! the shared secret header. Origins are compared exactly; a configured `*`
//! or an empty allow-list turns origin filtering off. Without a configured
//! secret nothing is admitted.

use crate::config::AccessConfig;
use crate::errors::RelayError;
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE, HeaderMap, HeaderName, HeaderValue, ORIGIN, VARY,
};

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
const PREFLIGHT_MAX_AGE_SECS: &str = "3600";

#[derive(Debug, Clone)]
pub struct AccessGate {
    secret_header: HeaderName,
    secret: Option<String>,
    allowed_origins: Vec<String>,
    allow_any_origin: bool,
    allow_headers: HeaderValue,
}

impl AccessGate {
    pub fn new(config: &AccessConfig) -> Result<Self, RelayError> {
        let secret_header = HeaderName::from_bytes(config.secret_header.as_bytes())
            .map_err(|e| RelayError::Internal(format!("invalid secret header: {e}")))?;
        let allow_headers = HeaderValue::from_str(&format!("content-type, {secret_header}"))
            .map_err(|e| RelayError::Internal(e.to_string()))?;

        let allowed_origins: Vec<String> = config
            .allowed_origins
            .iter()
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();
        let allow_any_origin =
            allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*");

        Ok(AccessGate {
            secret_header,
            secret: config.secret.clone().filter(|s| !s.is_empty()),
            allowed_origins,
            allow_any_origin,
            allow_headers,
        })
    }

    /// Returns the origin to echo back, `None` for requests without one.
    pub fn check_origin(&self, headers: &HeaderMap) -> Result<Option<HeaderValue>, RelayError> {
        let Some(origin) = headers.get(ORIGIN) else {
            return Ok(None);
        };

        let allowed = self.allow_any_origin
            || origin
                .to_str()
                .is_ok_and(|o| self.allowed_origins.iter().any(|allowed| allowed == o));

        if allowed {
            Ok(Some(origin.clone()))
        } else {
            Err(RelayError::OriginNotAllowed(
                String::from_utf8_lossy(origin.as_bytes()).into_owned(),
            ))
        }
    }

    pub fn check_secret(&self, headers: &HeaderMap) -> Result<(), RelayError> {
        let Some(expected) = self.secret.as_deref() else {
            return Err(RelayError::InvalidSecret);
        };
        let provided = headers
            .get(&self.secret_header)
            .map(HeaderValue::as_bytes)
            .unwrap_or_default();

        if secrets_match(provided, expected.as_bytes()) {
            Ok(())
        } else {
            Err(RelayError::InvalidSecret)
        }
    }

    /// Adds the CORS response headers for an admitted origin.
    pub fn apply_cors_headers(
        &self,
        headers: &mut HeaderMap,
        origin: Option<&HeaderValue>,
        preflight: bool,
    ) {
        headers.append(VARY, HeaderValue::from_static("origin"));

        let Some(origin) = origin else {
            return;
        };
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());

        if preflight {
            headers.insert(
                ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static(ALLOWED_METHODS),
            );
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
            headers.insert(
                ACCESS_CONTROL_MAX_AGE,
                HeaderValue::from_static(PREFLIGHT_MAX_AGE_SECS),
            );
        }
    }
}

// Length is not secret; content comparison does not stop at the first mismatch.
fn secrets_match(provided: &[u8], expected: &[u8]) -> bool {
    provided.len() == expected.len()
        && provided
            .iter()
            .zip(expected)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
