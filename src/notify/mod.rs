//! Alert delivery.

pub mod email;

pub use email::EmailNotifier;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::AlertEvent;

/// Delivery channel for a batch of alerts. Callers only invoke a notifier
/// with a non-empty batch; an empty run sends nothing anywhere.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_alerts(&self, alerts: &[AlertEvent]) -> Result<()>;
}
