use crate::errors::RelayError;
use crate::protocol::{CustomerId, Metafield};
use crate::upstream::UpstreamClient;
use async_trait::async_trait;
use http::StatusCode;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const FAILURE_BODY: &str = r#"{"errors":"internal upstream detail 7f3a"}"#;

/// In-memory customer metafield store. Writes upsert on namespace and key.
#[derive(Default)]
pub struct FakeUpstream {
    metafields: Mutex<HashMap<String, Vec<Metafield>>>,
    last_written: Mutex<Option<Metafield>>,
    fail: bool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl FakeUpstream {
    /// Every call answers with a 500 carrying `FAILURE_BODY`.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn insert(&self, customer: &str, namespace: &str, key: &str, value: Value) {
        self.metafields
            .lock()
            .unwrap()
            .entry(customer.to_string())
            .or_default()
            .push(Metafield {
                namespace: namespace.to_string(),
                key: key.to_string(),
                value_type: Some("json".to_string()),
                value,
            });
    }

    pub fn read_calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.read_calls() + self.write_calls()
    }

    pub fn last_written(&self) -> Option<Metafield> {
        self.last_written.lock().unwrap().clone()
    }

    fn failure(&self) -> Result<(), RelayError> {
        if self.fail {
            return Err(RelayError::UpstreamStatus {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: FAILURE_BODY.to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl UpstreamClient for FakeUpstream {
    async fn read_metafields(&self, customer: &CustomerId) -> Result<Vec<Metafield>, RelayError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.failure()?;

        Ok(self
            .metafields
            .lock()
            .unwrap()
            .get(customer.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn write_metafield(
        &self,
        customer: &CustomerId,
        metafield: &Metafield,
    ) -> Result<(), RelayError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.failure()?;

        let mut metafields = self.metafields.lock().unwrap();
        let existing = metafields.entry(customer.to_string()).or_default();
        existing.retain(|m| !(m.namespace == metafield.namespace && m.key == metafield.key));
        existing.push(metafield.clone());
        *self.last_written.lock().unwrap() = Some(metafield.clone());
        Ok(())
    }
}
