//! Threshold-crossing detection against the prior snapshot.

use chrono::{DateTime, Utc};

use crate::models::{AlertEvent, PriceRecord, SnapshotEntry, WatchTarget};

/// Decide whether `record` is an alert-worthy crossing and build the
/// snapshot entry that replaces `prior`.
///
/// The entry is always rebuilt from the fresh record. Alerting is
/// edge-triggered: a price that already sat at or below the threshold on
/// the previous run does not alert again, so a sustained sale produces
/// one alert, not one per run. Equality counts as a crossing.
pub fn evaluate(
    record: &PriceRecord,
    target: &WatchTarget,
    sku: &str,
    prior: Option<&SnapshotEntry>,
    now: DateTime<Utc>,
) -> (Option<AlertEvent>, SnapshotEntry) {
    let name = record
        .name
        .clone()
        .or_else(|| target.name.clone())
        .unwrap_or_else(|| "Unknown Item".to_string());

    let entry = SnapshotEntry {
        price: record.price,
        name: name.clone(),
        url: target.url.clone(),
        last_checked: now,
    };

    let alert = target.threshold.and_then(|threshold| {
        if record.price > threshold {
            return None;
        }
        let was_below = prior.is_some_and(|p| p.price <= threshold);
        if was_below {
            return None;
        }
        Some(AlertEvent {
            name,
            sku: sku.to_string(),
            price: record.price,
            threshold,
            previous_price: prior.map(|p| p.price),
            url: target.url.clone(),
        })
    });

    (alert, entry)
}
