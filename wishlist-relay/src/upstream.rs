use crate::config::ShopifyConfig;
use crate::errors::RelayError;
use crate::protocol::{CustomerId, Metafield, MetafieldEnvelope, MetafieldList};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use std::time::Duration;
use tokio::time::timeout;
use url::Url;

pub const ACCESS_TOKEN_HEADER: &str = "x-shopify-access-token";

/// Access to the customer metafield collection of the store.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Lists every metafield attached to the customer.
    async fn read_metafields(&self, customer: &CustomerId) -> Result<Vec<Metafield>, RelayError>;

    /// Creates the metafield on the customer, replacing an existing one with
    /// the same namespace and key.
    async fn write_metafield(
        &self,
        customer: &CustomerId,
        metafield: &Metafield,
    ) -> Result<(), RelayError>;
}

/// Shopify admin REST API client.
#[derive(Clone)]
pub struct ShopifyClient {
    client: reqwest::Client,
    store_url: Url,
    api_version: String,
    access_token: HeaderValue,
    timeout_secs: u64,
}

impl ShopifyClient {
    pub fn new(config: &ShopifyConfig) -> Result<Self, RelayError> {
        let mut access_token = HeaderValue::from_str(&config.access_token)
            .map_err(|e| RelayError::Internal(format!("invalid access token: {e}")))?;
        access_token.set_sensitive(true);

        Ok(ShopifyClient {
            client: reqwest::Client::new(),
            store_url: config.store_url.clone(),
            api_version: config.api_version.clone(),
            access_token,
            timeout_secs: config.timeout_secs,
        })
    }

    /// `{store}/admin/api/{version}/customers/{id}/metafields.json`
    ///
    /// The customer id is encoded as a single path segment.
    pub fn metafields_url(&self, customer: &CustomerId) -> Result<Url, RelayError> {
        let mut url = self.store_url.clone();
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|_| RelayError::Internal("store URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend([
                "admin",
                "api",
                self.api_version.as_str(),
                "customers",
                customer.as_str(),
                "metafields.json",
            ]);
        Ok(url)
    }

    /// Sends the request and collects the body, all within the timeout.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, RelayError> {
        let request = request
            .header(ACCESS_TOKEN_HEADER, self.access_token.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let round_trip = async {
            let response = request
                .send()
                .await
                .map_err(|e| RelayError::UpstreamRequestFailed(e.to_string()))?;
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| RelayError::UpstreamBody(e.to_string()))?;

            if !status.is_success() {
                return Err(RelayError::UpstreamStatus { status, body });
            }
            Ok(body)
        };

        timeout(Duration::from_secs(self.timeout_secs), round_trip)
            .await
            .map_err(|_| RelayError::UpstreamTimeout(self.timeout_secs))?
    }
}

#[async_trait]
impl UpstreamClient for ShopifyClient {
    async fn read_metafields(&self, customer: &CustomerId) -> Result<Vec<Metafield>, RelayError> {
        let url = self.metafields_url(customer)?;
        let body = self.send(self.client.get(url)).await?;

        let list: MetafieldList =
            serde_json::from_str(&body).map_err(|e| RelayError::UpstreamBody(e.to_string()))?;
        Ok(list.metafields)
    }

    async fn write_metafield(
        &self,
        customer: &CustomerId,
        metafield: &Metafield,
    ) -> Result<(), RelayError> {
        let url = self.metafields_url(customer)?;
        let payload = MetafieldEnvelope {
            metafield: metafield.clone(),
        };
        let body =
            serde_json::to_vec(&payload).map_err(|e| RelayError::Internal(e.to_string()))?;

        self.send(self.client.post(url).body(body)).await?;
        Ok(())
    }
}
