//! # CamPricer Common Library
//!
//! Shared code for the CamPricer pipeline including:
//! - Domain types (CameraRecord, UploadGroup, HistoryEntry)
//! - Event types (PricerEvent enum) and EventBus
//! - Configuration resolution (service URL, data directory)
//! - Durable key-value storage (whole-document JSON blobs)
//! - Currency tables and price conversion

pub mod config;
pub mod currency;
pub mod error;
pub mod events;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
