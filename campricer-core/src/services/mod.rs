//! Service modules for the recognition pipeline
//!
//! Components are leaf-first: the parser and preparer are pure transforms,
//! the client owns the network edge, the stores own shared state, and the
//! pipeline wires them together under one upload policy.

pub mod csv_export;
pub mod image_preparer;
pub mod preferences;
pub mod rate_fetcher;
pub mod recent_results;
pub mod recognition_client;
pub mod response_parser;
pub mod result_store;
pub mod search;
pub mod upload_pipeline;

pub use image_preparer::{ImageAsset, ImagePayload, PrepareError, PrepareOptions};
pub use rate_fetcher::{RateError, RateFetcher};
pub use recent_results::{RecentResultsStore, MAX_RECENT_RESULTS};
pub use recognition_client::{RecognitionClient, UploadError};
pub use response_parser::ParseError;
pub use result_store::ResultStore;
pub use search::SearchError;
pub use upload_pipeline::{UploadFailure, UploadOutcome, UploadPolicy};
