//! Data models for watch targets, price observations and alerts

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A product page to watch, as configured in the watchlist file.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchTarget {
    pub url: String,
    /// Alert when the price reaches this value or drops below it.
    #[serde(default)]
    pub threshold: Option<f64>,
    /// Display name, used when the page yields none.
    #[serde(default)]
    pub name: Option<String>,
}

/// Normalized result of one successful fetch + parse.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub price: f64,
    pub availability: String,
}

/// Last known state for one SKU, persisted across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub price: f64,
    pub name: String,
    pub url: String,
    pub last_checked: DateTime<Utc>,
}

/// Persisted mapping of SKU to last observation. Entries accumulate: a
/// SKU that was ever observed stays in the snapshot until pruned
/// externally.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub prices: HashMap<String, SnapshotEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn entry(&self, sku: &str) -> Option<&SnapshotEntry> {
        self.prices.get(sku)
    }
}

/// A threshold crossing worth telling the user about.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub name: String,
    pub sku: String,
    pub price: f64,
    pub threshold: f64,
    /// Price from the prior snapshot, if the SKU was seen before.
    pub previous_price: Option<f64>,
    pub url: String,
}
