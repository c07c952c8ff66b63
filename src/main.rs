use anyhow::Result;
use tracing::{info, warn};

mod config;
mod delta;
mod error;
mod extract;
mod fetch;
mod models;
mod notify;
mod state;
mod watcher;
mod watchlist;

use config::AppConfig;
use notify::{EmailNotifier, Notifier};
use state::{JsonFileStore, SnapshotStore};
use watcher::PriceWatcher;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    info!("Starting price watcher");

    let config = AppConfig::from_env();
    if config.recipients.is_empty() {
        warn!("EMAIL_RECIPIENTS not set - alerts will be logged only");
    }

    let targets = watchlist::load_watchlist(&config.watchlist_path)?;
    info!(targets = targets.len(), "watchlist loaded");
    if targets.is_empty() {
        info!("no items in watchlist");
        return Ok(());
    }

    let store = JsonFileStore::new(config.state_path.clone());
    let prior = store.load().await?;

    let mut watcher = PriceWatcher::new(config.fetch.clone(), config.pacing.clone())?;
    let (alerts, snapshot) = watcher.run(&targets, &prior).await;

    // Saved on every run, alerts or not: failed targets already carried
    // their old entries into the new snapshot.
    store.save(&snapshot).await?;

    if alerts.is_empty() {
        info!("no price alerts to send");
        return Ok(());
    }

    info!(alerts = alerts.len(), "price alerts to send");

    match &config.smtp {
        Some(smtp) if !config.recipients.is_empty() => {
            let notifier = EmailNotifier::new(smtp, &config.recipients)?;
            notifier.send_alerts(&alerts).await?;
        }
        _ => {
            warn!("SMTP not configured - printing alerts instead");
            for alert in &alerts {
                info!(
                    name = %alert.name,
                    price = alert.price,
                    threshold = alert.threshold,
                    url = %alert.url,
                    "price alert"
                );
            }
        }
    }

    Ok(())
}
