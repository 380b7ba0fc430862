//! Wire types for the storefront contract and the Shopify metafield API.
//!
//! Storefront:
//!
//! ```json
//! GET  /apps/wishlist-sync?customer_id=123  ->  {"product_ids": [1, 2, 3]}
//! POST /apps/wishlist-sync {"customer_id": "123", "product_ids": [9, 8]}  ->  {"success": true}
//! ```
//!
//! Shopify stores the list as a `json` metafield whose `value` is the
//! serialized array:
//!
//! ```json
//! {"metafield": {"namespace": "custom", "key": "wishlist_product_ids", "type": "json", "value": "[9,8]"}}
//! ```

use crate::errors::RelayError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const WISHLIST_NAMESPACE: &str = "custom";
pub const WISHLIST_KEY: &str = "wishlist_product_ids";
pub const WISHLIST_TYPE: &str = "json";

/// Customer whose wishlist is read or replaced.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CustomerId(String);

impl CustomerId {
    pub fn parse(raw: Option<&str>) -> Result<Self, RelayError> {
        match raw.map(str::trim) {
            Some(id) if !id.is_empty() => Ok(CustomerId(id.to_string())),
            _ => Err(RelayError::MissingField("customer_id")),
        }
    }

    /// Accepts a JSON string or number, anything else counts as missing.
    pub fn from_json(raw: Option<&Value>) -> Result<Self, RelayError> {
        match raw {
            Some(Value::String(s)) => Self::parse(Some(s)),
            Some(Value::Number(n)) => Self::parse(Some(&n.to_string())),
            _ => Err(RelayError::MissingField("customer_id")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered, opaque product identifiers. Never sorted or deduplicated.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductIds(pub Vec<Value>);

impl ProductIds {
    /// Decodes the value of the wishlist metafield.
    ///
    /// Shopify returns `json` metafield values as a string; an already
    /// decoded array is accepted as well.
    pub fn from_metafield_value(value: &Value) -> Result<Self, RelayError> {
        match value {
            Value::String(s) => {
                serde_json::from_str(s).map_err(|e| RelayError::UpstreamBody(e.to_string()))
            }
            Value::Array(items) => Ok(ProductIds(items.clone())),
            other => Err(RelayError::UpstreamBody(format!(
                "unexpected wishlist value: {other}"
            ))),
        }
    }

    pub fn to_metafield_value(&self) -> Result<String, RelayError> {
        serde_json::to_string(&self.0).map_err(|e| RelayError::Internal(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Storefront write request. Fields are checked by hand so that a missing
/// customer id maps to its own error.
#[derive(Debug, Deserialize)]
pub struct WishlistWriteRequest {
    #[serde(default)]
    pub customer_id: Option<Value>,
    #[serde(default)]
    pub product_ids: Option<ProductIds>,
}

#[derive(Debug, Serialize)]
pub struct WishlistReadResponse {
    pub product_ids: ProductIds,
}

#[derive(Debug, Serialize)]
pub struct WishlistWriteResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A metafield as listed by the admin API. Other fields are ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metafield {
    pub namespace: String,
    pub key: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default)]
    pub value: Value,
}

impl Metafield {
    pub fn wishlist(product_ids: &ProductIds) -> Result<Self, RelayError> {
        Ok(Metafield {
            namespace: WISHLIST_NAMESPACE.to_string(),
            key: WISHLIST_KEY.to_string(),
            value_type: Some(WISHLIST_TYPE.to_string()),
            value: Value::String(product_ids.to_metafield_value()?),
        })
    }

    pub fn is_wishlist(&self) -> bool {
        self.namespace == WISHLIST_NAMESPACE && self.key == WISHLIST_KEY
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct MetafieldList {
    #[serde(default)]
    pub metafields: Vec<Metafield>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetafieldEnvelope {
    pub metafield: Metafield,
}
