pub mod access;
pub mod config;
pub mod errors;
pub mod metrics_defs;
pub mod protocol;
pub mod service;
pub mod upstream;
pub mod wishlist;

#[cfg(test)]
mod testutils;

use access::AccessGate;
use errors::RelayError;
use service::RelayService;
use shared::http::run_http_service;
use std::sync::Arc;
use upstream::ShopifyClient;
use wishlist::Wishlists;

pub async fn run(config: config::Config) -> Result<(), RelayError> {
    if !config.access.has_secret() {
        tracing::warn!("No shared secret configured, every wishlist request will be rejected");
    }

    let upstream = Arc::new(ShopifyClient::new(&config.shopify)?);
    let service = RelayService::new(AccessGate::new(&config.access)?, Wishlists::new(upstream));

    tracing::info!(
        store = %config.shopify.store_url,
        api_version = %config.shopify.api_version,
        "Starting wishlist relay"
    );
    run_http_service(&config.listener.host, config.listener.port, service).await
}
