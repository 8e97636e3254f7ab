//! Free-text camera lookup
//!
//! Alternate ingress that skips image handling entirely: one non-image
//! network call, the same response parser, the same two sinks. A located
//! record carries no image reference.

use crate::services::recognition_client::UploadError;
use crate::services::response_parser::{self, ParseError};
use crate::services::upload_pipeline::sink_record;
use crate::{AppState, LoadingGuard};
use campricer_common::currency::region_for;
use campricer_common::events::PricerEvent;
use campricer_common::types::CameraRecord;
use chrono::Utc;
use thiserror::Error;

/// Search errors
#[derive(Debug, Error)]
pub enum SearchError {
    /// Query was empty or whitespace-only; rejected before any network call
    #[error("Please enter a camera name to search")]
    EmptyQuery,

    /// Network or service failure
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Response could not be parsed into a record
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Look up a camera by name and sink the result like an image-derived one
pub async fn run_search(
    state: &AppState,
    query: &str,
    currency: &str,
) -> Result<CameraRecord, SearchError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(SearchError::EmptyQuery);
    }

    let _busy = LoadingGuard::hold(&state.loading);
    let region = region_for(currency);

    let result = async {
        let body = state.client.search(trimmed, region).await?;
        Ok::<_, SearchError>(response_parser::parse_response(&body, None)?)
    }
    .await;

    match result {
        Ok(record) => {
            sink_record(state, &record).await;
            Ok(record)
        }
        Err(error) => {
            tracing::warn!(query = trimmed, error = %error, "camera search failed");
            state
                .event_bus
                .emit(PricerEvent::UploadFailed {
                    image: None,
                    reason: error.to_string(),
                    timestamp: Utc::now(),
                })
                .ok();
            Err(error)
        }
    }
}
