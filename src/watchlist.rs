//! Watchlist file loading.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::models::WatchTarget;

#[derive(Debug, Deserialize)]
struct WatchlistFile {
    #[serde(default)]
    items: Vec<WatchTarget>,
}

/// Read the watch targets from `path`.
///
/// A missing or malformed file is a terminal error; an empty `items` list
/// is a valid "nothing to do" the caller handles.
pub fn load_watchlist(path: &Path) -> Result<Vec<WatchTarget>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading watchlist {}", path.display()))?;
    parse_watchlist(&raw).with_context(|| format!("parsing watchlist {}", path.display()))
}

fn parse_watchlist(raw: &str) -> Result<Vec<WatchTarget>> {
    let file: WatchlistFile = serde_json::from_str(raw)?;
    Ok(file.items)
}
