//! Upload orchestration
//!
//! One entry point drives both upload policies over a shared
//! build-payload / call / parse / sink primitive. Per-item mode isolates
//! failures to the image that caused them; batch mode treats the photo set
//! as one unit of work and fails or succeeds wholesale.
//!
//! Calls are strictly sequential within a run: memory and bandwidth stay
//! bounded and the service sees a predictable request rate.

use crate::services::image_preparer::{self, ImageAsset, PrepareOptions};
use crate::services::recognition_client::UploadError;
use crate::services::response_parser;
use crate::{AppState, LoadingGuard};
use campricer_common::currency::region_for;
use campricer_common::events::PricerEvent;
use campricer_common::types::CameraRecord;
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::time::Instant;

/// Completed upload runs after which a review prompt is suggested
const REVIEW_PROMPT_UPLOAD_RUNS: u32 = 3;

/// How a multi-photo upload maps onto network calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadPolicy {
    /// One call per image, one record per image
    #[default]
    PerItem,
    /// One call for all images, one record for the whole set
    SingleBatch,
}

/// One per-image failure within an upload run
#[derive(Debug)]
pub struct UploadFailure {
    /// Position of the failing image in the input order
    pub index: usize,
    /// Source image reference, when the failure is image-scoped
    pub image: Option<String>,
    pub error: UploadError,
}

/// Result of one upload run
#[derive(Debug, Default)]
pub struct UploadOutcome {
    /// Records accepted into the stores
    pub accepted: usize,
    /// Per-image (or whole-batch) failures
    pub failures: Vec<UploadFailure>,
}

impl UploadOutcome {
    /// One user-facing line summarizing failures, if any occurred
    pub fn failure_summary(&self, total_images: usize) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        Some(format!(
            "{} of {} image(s) could not be identified",
            self.failures.len(),
            total_images
        ))
    }
}

/// Run one upload under the given policy
///
/// The currency code selects the `region` hint sent to the service. A
/// single image always runs per-item regardless of the stored mode.
pub async fn run_upload(
    state: &AppState,
    assets: &[ImageAsset],
    policy: UploadPolicy,
    currency: &str,
    options: &PrepareOptions,
) -> UploadOutcome {
    if assets.is_empty() {
        return UploadOutcome::default();
    }

    let _busy = LoadingGuard::hold(&state.loading);
    let started = Instant::now();
    let region = region_for(currency);

    let policy = if assets.len() == 1 {
        UploadPolicy::PerItem
    } else {
        policy
    };

    let outcome = match policy {
        UploadPolicy::PerItem => upload_per_item(state, assets, region, options).await,
        UploadPolicy::SingleBatch => upload_batch(state, assets, region, options).await,
    };

    tracing::info!(
        images = assets.len(),
        accepted = outcome.accepted,
        failed = outcome.failures.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "upload run finished"
    );

    if outcome.accepted > 0 {
        let runs = state.upload_runs.fetch_add(1, Ordering::SeqCst) + 1;
        if runs == REVIEW_PROMPT_UPLOAD_RUNS {
            state
                .event_bus
                .emit(PricerEvent::ReviewPromptSuggested {
                    upload_runs: runs,
                    timestamp: Utc::now(),
                })
                .ok();
        }
    }

    outcome
}

async fn upload_per_item(
    state: &AppState,
    assets: &[ImageAsset],
    region: &str,
    options: &PrepareOptions,
) -> UploadOutcome {
    let mut outcome = UploadOutcome::default();

    for (index, asset) in assets.iter().enumerate() {
        // One bad image must not take the rest of the queue down with it
        match identify_one(state, asset, index, region, options).await {
            Ok(record) => {
                sink_record(state, &record).await;
                outcome.accepted += 1;
            }
            Err(error) => {
                tracing::warn!(
                    index,
                    image = %asset.path.display(),
                    error = %error,
                    "image identification failed"
                );
                report_failure(state, Some(asset.key()), &error);
                outcome.failures.push(UploadFailure {
                    index,
                    image: Some(asset.key()),
                    error,
                });
            }
        }
    }
    outcome
}

/// The shared per-image primitive: build payload, call, parse
async fn identify_one(
    state: &AppState,
    asset: &ImageAsset,
    index: usize,
    region: &str,
    options: &PrepareOptions,
) -> Result<CameraRecord, UploadError> {
    let payload = image_preparer::prepare(asset, index, options).await?;
    let body = state.client.identify(&payload, Some(region)).await?;
    Ok(response_parser::parse_response(&body, Some(asset.key()))?)
}

async fn upload_batch(
    state: &AppState,
    assets: &[ImageAsset],
    region: &str,
    options: &PrepareOptions,
) -> UploadOutcome {
    let mut outcome = UploadOutcome::default();

    // The combined request needs every angle, so a missing file sinks the
    // whole batch before any network traffic.
    let mut payloads = Vec::with_capacity(assets.len());
    for (index, asset) in assets.iter().enumerate() {
        match image_preparer::prepare(asset, index, options).await {
            Ok(payload) => payloads.push(payload),
            Err(error) => {
                let error = UploadError::from(error);
                tracing::warn!(
                    index,
                    image = %asset.path.display(),
                    error = %error,
                    "batch upload aborted at payload preparation"
                );
                report_failure(state, Some(asset.key()), &error);
                outcome.failures.push(UploadFailure {
                    index,
                    image: Some(asset.key()),
                    error,
                });
                return outcome;
            }
        }
    }

    // The batch result represents one subject; it keys off the first image
    let first_key = assets[0].key();
    let result = async {
        let body = state.client.identify_batch(&payloads, region).await?;
        Ok::<_, UploadError>(response_parser::parse_response(
            &body,
            Some(first_key.clone()),
        )?)
    }
    .await;

    match result {
        Ok(record) => {
            sink_record(state, &record).await;
            outcome.accepted += 1;
        }
        Err(error) => {
            tracing::warn!(error = %error, "batch identification failed");
            report_failure(state, Some(first_key.clone()), &error);
            outcome.failures.push(UploadFailure {
                index: 0,
                image: Some(first_key),
                error,
            });
        }
    }
    outcome
}

/// Sink an accepted record into both stores and announce it
///
/// Each store's lock is held only for its own mutation; history persistence
/// completes before the call returns (write-through).
pub(crate) async fn sink_record(state: &AppState, record: &CameraRecord) {
    {
        let mut results = state.results.lock().await;
        results.append(record.image_uri.clone(), record.clone());
    }
    {
        let mut recents = state.recents.lock().await;
        recents.append(record).await;
    }
    state
        .event_bus
        .emit(PricerEvent::RecordAdded {
            record: record.clone(),
            timestamp: Utc::now(),
        })
        .ok();
}

fn report_failure(state: &AppState, image: Option<String>, error: &UploadError) {
    state
        .event_bus
        .emit(PricerEvent::UploadFailed {
            image,
            reason: error.to_string(),
            timestamp: Utc::now(),
        })
        .ok();
}
