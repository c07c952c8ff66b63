//! Per-run orchestration: fetch, extract, diff, one target at a time.

use std::time::Duration;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::delta;
use crate::extract;
use crate::fetch::{FetchConfig, FetchOutcome, Fetcher};
use crate::models::{AlertEvent, Snapshot, WatchTarget};

/// Delay bounds between consecutive targets. Sequential pacing is part of
/// the design, not incidental latency: bursts of page hits are exactly
/// what the protection layer watches for.
#[derive(Debug, Clone)]
pub struct PacingConfig {
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(5),
        }
    }
}

pub struct PriceWatcher {
    fetcher: Fetcher,
    pacing: PacingConfig,
    rng: StdRng,
}

impl PriceWatcher {
    pub fn new(fetch: FetchConfig, pacing: PacingConfig) -> anyhow::Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(fetch)?,
            pacing,
            rng: StdRng::from_os_rng(),
        })
    }

    /// Check every target in order. Returns the alerts, in target order,
    /// and the snapshot to persist.
    ///
    /// Failures are contained per target: the reason is logged, the prior
    /// snapshot entry (if any) is carried forward verbatim, and the run
    /// moves on. The returned snapshot holds an entry for every SKU that
    /// was in `prior` or was observed this run.
    pub async fn run(
        &mut self,
        targets: &[WatchTarget],
        prior: &Snapshot,
    ) -> (Vec<AlertEvent>, Snapshot) {
        let mut alerts = Vec::new();
        let mut snapshot = Snapshot::default();

        for (i, target) in targets.iter().enumerate() {
            if i > 0 {
                let delay = self
                    .rng
                    .random_range(self.pacing.min_delay..=self.pacing.max_delay);
                tokio::time::sleep(delay).await;
            }

            // The snapshot key comes from the URL, not the page, so a
            // failed fetch still knows which entry to carry forward.
            let sku = extract::sku_from_url(&target.url).unwrap_or_else(|| "unknown".to_string());
            info!(
                name = target.name.as_deref().unwrap_or("Unknown Item"),
                %sku,
                "checking target"
            );

            let html = match self.fetcher.fetch(&target.url).await {
                FetchOutcome::Success { html } => html,
                outcome => {
                    let reason = outcome.failure_reason().unwrap_or("unknown failure");
                    warn!(url = %target.url, reason, "fetch failed; keeping previous entry");
                    carry_forward(&mut snapshot, prior, &sku);
                    continue;
                }
            };

            let record = match extract::extract(&html, &target.url) {
                Ok(record) => record,
                Err(e) => {
                    warn!(url = %target.url, reason = %e, "extraction failed; keeping previous entry");
                    carry_forward(&mut snapshot, prior, &sku);
                    continue;
                }
            };

            info!(
                price = record.price,
                threshold = ?target.threshold,
                %sku,
                availability = %record.availability,
                "price observed"
            );

            let (alert, entry) =
                delta::evaluate(&record, target, &sku, prior.entry(&sku), Utc::now());
            if let Some(alert) = alert {
                info!(
                    name = %alert.name,
                    price = alert.price,
                    threshold = alert.threshold,
                    "price at or below threshold"
                );
                alerts.push(alert);
            }
            snapshot.prices.insert(sku, entry);
        }

        // SKUs not visited this run (targets removed from the watchlist,
        // or several SKU-less targets sharing the "unknown" slot) survive
        // too: the snapshot only ever accumulates.
        for (sku, entry) in &prior.prices {
            snapshot
                .prices
                .entry(sku.clone())
                .or_insert_with(|| entry.clone());
        }

        info!(
            targets = targets.len(),
            alerts = alerts.len(),
            "run complete"
        );
        (alerts, snapshot)
    }
}

fn carry_forward(snapshot: &mut Snapshot, prior: &Snapshot, sku: &str) {
    if let Some(entry) = prior.entry(sku) {
        snapshot
            .prices
            .entry(sku.to_string())
            .or_insert_with(|| entry.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SnapshotEntry;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn product_page(name: &str, sku: &str, price: f64) -> String {
        format!(
            r#"<html><head><script type="application/ld+json">
            {{"@type":"Product","name":"{name}","sku":"{sku}","offers":{{"price":"{price}","availability":"https://schema.org/InStock"}}}}
            </script></head><body></body></html>"#
        )
    }

    fn test_watcher() -> PriceWatcher {
        let fetch = FetchConfig {
            backoff_base: Duration::ZERO,
            jitter_max: Duration::ZERO,
            ..FetchConfig::default()
        };
        let pacing = PacingConfig {
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        };
        PriceWatcher::new(fetch, pacing).expect("watcher builds")
    }

    fn target(server: &MockServer, path: &str, threshold: Option<f64>) -> WatchTarget {
        WatchTarget {
            url: format!("{}{path}", server.uri()),
            threshold,
            name: None,
        }
    }

    fn entry(price: f64, url: &str) -> SnapshotEntry {
        SnapshotEntry {
            price,
            name: "Old Gadget".to_string(),
            url: url.to_string(),
            last_checked: Utc::now(),
        }
    }

    #[tokio::test]
    async fn alerts_in_target_order_and_updates_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/widget-111.html"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(product_page("Widget", "111", 20.0)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gadget-222.html"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(product_page("Gadget", "222", 8.0)),
            )
            .mount(&server)
            .await;

        let targets = vec![
            target(&server, "/widget-111.html", Some(25.0)),
            target(&server, "/gadget-222.html", Some(10.0)),
        ];

        let mut watcher = test_watcher();
        let (alerts, snapshot) = watcher.run(&targets, &Snapshot::default()).await;

        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].sku, "111");
        assert_eq!(alerts[1].sku, "222");
        assert_eq!(snapshot.prices["111"].price, 20.0);
        assert_eq!(snapshot.prices["222"].price, 8.0);
    }

    #[tokio::test]
    async fn failed_fetch_carries_prior_entry_forward_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gadget-222.html"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let targets = vec![target(&server, "/gadget-222.html", Some(10.0))];
        let url = &targets[0].url;

        let mut prior = Snapshot::default();
        prior.prices.insert("222".to_string(), entry(12.5, url));
        // An entry whose target left the watchlist long ago.
        prior
            .prices
            .insert("999".to_string(), entry(3.0, "https://shop.test/old-999.html"));

        let mut watcher = test_watcher();
        let (alerts, snapshot) = watcher.run(&targets, &prior).await;

        assert!(alerts.is_empty());
        assert_eq!(snapshot.prices["222"], prior.prices["222"]);
        // Monotonicity: every prior key survives.
        for sku in prior.prices.keys() {
            assert!(snapshot.prices.contains_key(sku));
        }
    }

    #[tokio::test]
    async fn unparseable_page_is_contained_and_carried_forward() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/widget-111.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>no data</html>"))
            .mount(&server)
            .await;

        let targets = vec![target(&server, "/widget-111.html", Some(25.0))];
        let url = &targets[0].url;

        let mut prior = Snapshot::default();
        prior.prices.insert("111".to_string(), entry(30.0, url));

        let mut watcher = test_watcher();
        let (alerts, snapshot) = watcher.run(&targets, &prior).await;

        assert!(alerts.is_empty());
        assert_eq!(snapshot.prices["111"], prior.prices["111"]);
    }

    #[tokio::test]
    async fn failed_target_without_prior_entry_produces_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let targets = vec![target(&server, "/widget-111.html", None)];

        let mut watcher = test_watcher();
        let (alerts, snapshot) = watcher.run(&targets, &Snapshot::default()).await;

        assert!(alerts.is_empty());
        assert!(snapshot.prices.is_empty());
    }

    #[tokio::test]
    async fn empty_watchlist_preserves_prior_snapshot() {
        let mut prior = Snapshot::default();
        prior
            .prices
            .insert("999".to_string(), entry(3.0, "https://shop.test/old-999.html"));

        let mut watcher = test_watcher();
        let (alerts, snapshot) = watcher.run(&[], &prior).await;

        assert!(alerts.is_empty());
        assert_eq!(snapshot.prices.len(), 1);
        assert!(snapshot.prices.contains_key("999"));
    }

    #[tokio::test]
    async fn sustained_low_price_alerts_only_on_the_crossing_run() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/widget-111.html"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(product_page("Widget", "111", 24.0)),
            )
            .mount(&server)
            .await;

        let targets = vec![target(&server, "/widget-111.html", Some(25.0))];
        let mut watcher = test_watcher();

        // Run N: crossing from an above-threshold prior.
        let mut prior = Snapshot::default();
        prior
            .prices
            .insert("111".to_string(), entry(26.0, &targets[0].url));
        let (alerts, snapshot) = watcher.run(&targets, &prior).await;
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].previous_price, Some(26.0));

        // Run N+1: same low price, no new alert.
        let (alerts, _) = watcher.run(&targets, &snapshot).await;
        assert!(alerts.is_empty());
    }
}
