//! Session result list and derived totals
//!
//! Owns the current session's upload groups for display. Totals are
//! recomputed from the live list on every query instead of being maintained
//! incrementally, so a remove can never leave a drifted counter behind.

use campricer_common::types::{CameraRecord, PriceTotals, UploadGroup};

/// In-memory store of the current session's recognition results
#[derive(Debug, Default)]
pub struct ResultStore {
    groups: Vec<UploadGroup>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current groups, newest first
    pub fn groups(&self) -> &[UploadGroup] {
        &self.groups
    }

    /// Total records across all groups
    pub fn record_count(&self) -> usize {
        self.groups.iter().map(|g| g.records.len()).sum()
    }

    /// Prepend a new group for one accepted record
    ///
    /// Every accepted record gets its own group; groups are never merged
    /// across images.
    pub fn append(&mut self, image_key: Option<String>, record: CameraRecord) {
        self.groups.insert(
            0,
            UploadGroup {
                image_key,
                records: vec![record],
            },
        );
    }

    /// Remove one record; an emptied group is deleted and its backing image
    /// released
    ///
    /// Returns the removed record, or `None` when the indices are stale.
    pub async fn remove_record(
        &mut self,
        group_index: usize,
        record_index: usize,
    ) -> Option<CameraRecord> {
        let group = self.groups.get_mut(group_index)?;
        if record_index >= group.records.len() {
            return None;
        }
        let removed = group.records.remove(record_index);

        if group.records.is_empty() {
            let emptied = self.groups.remove(group_index);
            if let Some(image) = emptied.image_key {
                release_asset(&image).await;
            }
        }
        Some(removed)
    }

    /// Drop every group, releasing every referenced image
    pub async fn clear(&mut self) {
        for group in self.groups.drain(..) {
            if let Some(image) = group.image_key {
                release_asset(&image).await;
            }
        }
    }

    /// Sums of the three price channels over all current records
    pub fn totals(&self) -> PriceTotals {
        let mut totals = PriceTotals::default();
        for record in self.groups.iter().flat_map(|g| g.records.iter()) {
            totals.loose += numeric_price(&record.loose_price);
            totals.cib += numeric_price(&record.cib_price);
            totals.new += numeric_price(&record.new_price);
        }
        totals
    }
}

/// Best-effort deletion of a no-longer-referenced image file
///
/// Failures are logged, never surfaced; the store's own state is already
/// consistent by the time this runs.
pub(crate) async fn release_asset(uri: &str) {
    if let Err(e) = tokio::fs::remove_file(uri).await {
        tracing::warn!(image = uri, error = %e, "failed to delete image asset");
    } else {
        tracing::debug!(image = uri, "deleted image asset");
    }
}

/// Numeric value of a price string, or zero
///
/// Only single values count toward totals; ranges and `"N/A"` contribute
/// zero rather than a guess.
fn numeric_price(price: &str) -> f64 {
    let cleaned: String = price
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ','))
        .collect();
    cleaned.trim().parse().unwrap_or(0.0)
}
