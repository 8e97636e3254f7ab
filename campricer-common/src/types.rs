//! Domain types for the recognition pipeline
//!
//! `CameraRecord` is the canonical post-parse shape every ingress path
//! (image upload, batch upload, text search) normalizes into. Absent fields
//! are always populated with sentinel strings, never left empty, so display
//! and export code can treat every field as present.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title used when the recognition response carries no camera name
pub const UNKNOWN_CAMERA: &str = "Unknown Camera";

/// Description used when the recognition response carries no information block
pub const NO_INFORMATION: &str = "No information available";

/// Sentinel for a price channel the recognition response did not fill in
pub const PRICE_UNAVAILABLE: &str = "N/A";

/// Canonical recognition result for one identified camera
///
/// Price fields are USD-denominated display strings as returned by the
/// service: a literal `"N/A"`, a single value like `"$120"`, or a range like
/// `"$50 - $100"`. Conversion to other currencies happens at display/export
/// time only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraRecord {
    /// Camera name
    pub title: String,
    /// eBay price channel
    pub loose_price: String,
    /// Amazon price channel
    pub cib_price: String,
    /// Facebook Marketplace price channel
    pub new_price: String,
    /// Free-text description of the camera
    pub information: String,
    /// Source image reference; `None` for text-search results
    pub image_uri: Option<String>,
}

/// One session-list entry: the originating image plus its records
///
/// Each upload (or search) produces its own group; groups are never merged
/// across images. A group whose record list empties out must be deleted by
/// its owning store, releasing the backing image file if one exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadGroup {
    /// Backing image reference; `None` for search-originated groups
    pub image_key: Option<String>,
    /// Records recognized from this image
    pub records: Vec<CameraRecord>,
}

/// The three price-channel values of a durable history entry
///
/// Field names serialize with the service's original spelling so blobs
/// written by earlier app versions load unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPrices {
    #[serde(rename = "eBay")]
    pub ebay: String,
    #[serde(rename = "Amazon")]
    pub amazon: String,
    #[serde(rename = "FacebookMarketplace")]
    pub facebook_marketplace: String,
}

/// Durable recent-results entry, derived 1:1 from an accepted record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique, time-derived identifier
    pub id: String,
    /// RFC 3339 creation timestamp
    pub timestamp: String,
    /// Camera name
    pub camera: String,
    /// Price channels at the moment of acceptance
    pub prices: HistoryPrices,
    /// Free-text description
    pub information: String,
    /// Source image reference, if any
    #[serde(rename = "imageUri")]
    pub image_uri: Option<String>,
}

impl HistoryEntry {
    /// Derive a history entry from a freshly accepted record
    pub fn from_record(record: &CameraRecord) -> Self {
        Self {
            id: new_entry_id(),
            timestamp: Utc::now().to_rfc3339(),
            camera: record.title.clone(),
            prices: HistoryPrices {
                ebay: record.loose_price.clone(),
                amazon: record.cib_price.clone(),
                facebook_marketplace: record.new_price.clone(),
            },
            information: record.information.clone(),
            image_uri: record.image_uri.clone(),
        }
    }
}

/// Millisecond timestamp plus a short random suffix. Sorts roughly by
/// creation time while staying unique for entries minted in the same
/// millisecond.
fn new_entry_id() -> String {
    let mut suffix = Uuid::new_v4().simple().to_string();
    suffix.truncate(8);
    format!("{}-{}", Utc::now().timestamp_millis(), suffix)
}

/// Session-wide sums of the three price channels
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PriceTotals {
    /// Sum of the eBay channel
    pub loose: f64,
    /// Sum of the Amazon channel
    pub cib: f64,
    /// Sum of the Facebook Marketplace channel
    pub new: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> CameraRecord {
        CameraRecord {
            title: "Canon AE-1".to_string(),
            loose_price: "$150".to_string(),
            cib_price: "$200".to_string(),
            new_price: "$120 - $180".to_string(),
            information: "Classic 35mm SLR".to_string(),
            image_uri: Some("/tmp/ae1.jpg".to_string()),
        }
    }

    #[test]
    fn history_entry_mirrors_record_fields() {
        let record = sample_record();
        let entry = HistoryEntry::from_record(&record);

        assert_eq!(entry.camera, "Canon AE-1");
        assert_eq!(entry.prices.ebay, "$150");
        assert_eq!(entry.prices.amazon, "$200");
        assert_eq!(entry.prices.facebook_marketplace, "$120 - $180");
        assert_eq!(entry.information, "Classic 35mm SLR");
        assert_eq!(entry.image_uri.as_deref(), Some("/tmp/ae1.jpg"));
        assert!(!entry.id.is_empty());
    }

    #[test]
    fn history_entry_ids_are_unique() {
        let record = sample_record();
        let a = HistoryEntry::from_record(&record);
        let b = HistoryEntry::from_record(&record);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn history_entry_serializes_with_original_key_spelling() {
        let entry = HistoryEntry::from_record(&sample_record());
        let json = serde_json::to_value(&entry).unwrap();

        assert!(json["prices"].get("eBay").is_some());
        assert!(json["prices"].get("Amazon").is_some());
        assert!(json["prices"].get("FacebookMarketplace").is_some());
        assert!(json.get("imageUri").is_some());
    }
}
