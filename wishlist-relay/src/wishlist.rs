use crate::errors::RelayError;
use crate::metrics_defs::UPSTREAM_REQUESTS;
use crate::protocol::{CustomerId, Metafield, ProductIds};
use crate::upstream::UpstreamClient;
use shared::counter;
use std::sync::Arc;

/// Reads and replaces customer wishlists through the upstream store.
///
/// Each operation performs exactly one upstream call.
#[derive(Clone)]
pub struct Wishlists {
    upstream: Arc<dyn UpstreamClient>,
}

impl Wishlists {
    pub fn new(upstream: Arc<dyn UpstreamClient>) -> Self {
        Self { upstream }
    }

    /// Returns the stored wishlist, or an empty one if the customer has none.
    pub async fn read(&self, customer: &CustomerId) -> Result<ProductIds, RelayError> {
        let result = self.upstream.read_metafields(customer).await;
        record_upstream("read", &result);

        let metafields = result?;
        match metafields.iter().find(|m| m.is_wishlist()) {
            Some(metafield) => ProductIds::from_metafield_value(&metafield.value),
            None => {
                tracing::debug!(customer_id = %customer, "No wishlist metafield");
                Ok(ProductIds::default())
            }
        }
    }

    /// Replaces the whole wishlist with `product_ids`.
    pub async fn replace(
        &self,
        customer: &CustomerId,
        product_ids: &ProductIds,
    ) -> Result<(), RelayError> {
        let metafield = Metafield::wishlist(product_ids)?;
        let result = self.upstream.write_metafield(customer, &metafield).await;
        record_upstream("write", &result);

        result?;
        tracing::debug!(
            customer_id = %customer,
            count = product_ids.len(),
            "Wishlist replaced"
        );
        Ok(())
    }
}

fn record_upstream<T>(operation: &'static str, result: &Result<T, RelayError>) {
    let outcome = match result {
        Ok(_) => "success",
        Err(RelayError::UpstreamTimeout(_)) => "timeout",
        Err(RelayError::UpstreamStatus { .. }) => "error_status",
        Err(_) => "failure",
    };
    counter!(UPSTREAM_REQUESTS, "operation" => operation, "outcome" => outcome).increment(1);
}
