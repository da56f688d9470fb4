//! Appends encoded samples to their container series

use super::{SortedSetStore, StoreError};
use crate::codec;
use crate::models::{ContainerSample, RoutingKey};
use std::sync::Arc;
use tracing::debug;

/// Writes one sample per call as a single sorted-set insert.
///
/// No buffering or retry: a failed write is returned to the caller and
/// the sample is dropped.
#[derive(Clone)]
pub struct StoreWriter {
    store: Arc<dyn SortedSetStore>,
}

impl StoreWriter {
    pub fn new(store: Arc<dyn SortedSetStore>) -> Self {
        Self { store }
    }

    /// Encode `sample` and insert it under `key`, scored by
    /// `captured_at_ms`
    pub async fn write(
        &self,
        key: &RoutingKey,
        sample: &ContainerSample,
        captured_at_ms: i64,
    ) -> Result<String, StoreError> {
        let member = codec::encode(sample);
        self.store
            .zadd(key.as_str(), &member, captured_at_ms as f64)
            .await?;
        debug!(key = %key, member = %member, score = captured_at_ms, "Wrote sample");
        Ok(member)
    }
}
