//! Stored user preferences
//!
//! One boolean preference lives in durable storage: whether multi-photo
//! uploads are sent as a single-subject batch. A missing or unreadable
//! preference means the default per-item mode.

use crate::services::upload_pipeline::UploadPolicy;
use campricer_common::storage::{KvStore, CAMERA_MODE_KEY};
use serde_json::Value;

/// Stored upload policy, defaulting to per-item
pub async fn load_upload_policy(store: &KvStore) -> UploadPolicy {
    match store.get(CAMERA_MODE_KEY).await {
        Ok(Some(Value::Bool(true))) => UploadPolicy::SingleBatch,
        Ok(_) => UploadPolicy::PerItem,
        Err(e) => {
            tracing::warn!(error = %e, "failed to read camera mode preference");
            UploadPolicy::PerItem
        }
    }
}

/// Persist the upload policy preference
pub async fn save_upload_policy(store: &KvStore, policy: UploadPolicy) {
    let single = matches!(policy, UploadPolicy::SingleBatch);
    if let Err(e) = store.set(CAMERA_MODE_KEY, &Value::Bool(single)).await {
        tracing::warn!(error = %e, "failed to persist camera mode preference");
    }
}
