//! Team snapshots
//!
//! The snapshot endpoint returns every team's funds and roster at once:
//!
//! ```json
//! {"TeamA": {"money": 4000, "logo_path": "/a.png",
//!            "inventory": {"PlayerX": {"sold_price": 1000, "base_bid": 500}}}}
//! ```
//!
//! Older servers send the inventory as `{"PlayerX": 1000}`; both are accepted.
use crate::auction::*;
use anyhow::{format_err, Context, Result};
use parking_lot::Mutex;
use serde_json::Value;
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("snapshot endpoint reported an error: {0}")]
    Endpoint(String),
    #[error("snapshot is not a mapping of teams")]
    NotAMapping,
    #[error("malformed snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

/// The black-box query returning all teams
pub trait SnapshotSource {
    fn fetch(&self) -> Result<Teams>;
}

pub type SharedSnapshotSource = Arc<dyn SnapshotSource + Send + Sync + 'static>;

pub fn decode(body: &str) -> Result<Teams, SnapshotError> {
    decode_value(&serde_json::from_str(body)?)
}

pub fn decode_value(value: &Value) -> Result<Teams, SnapshotError> {
    let teams = value.as_object().ok_or(SnapshotError::NotAMapping)?;

    if let Some(error) = teams.get("error").and_then(Value::as_str) {
        return Err(SnapshotError::Endpoint(error.to_owned()));
    }

    Ok(teams
        .iter()
        .map(|(id, team)| (id.clone(), decode_team(id, team)))
        .collect())
}

fn decode_team(id: &str, team: &Value) -> TeamSnapshot {
    let money = &team["money"];
    let funds = amount_from_value(money);
    if funds.is_none() {
        warn!(team = id, %money, "team funds unknown");
    }

    let roster = team["inventory"]
        .as_object()
        .map(|inventory| {
            inventory
                .iter()
                .map(|(player, entry)| {
                    let entry = match entry {
                        Value::Object(_) => RosterEntry {
                            sold_price: amount_from_value(&entry["sold_price"]),
                            base_bid: amount_from_value(&entry["base_bid"]),
                        },
                        price => RosterEntry {
                            sold_price: amount_from_value(price),
                            base_bid: None,
                        },
                    };
                    (player.clone(), entry)
                })
                .collect()
        })
        .unwrap_or_default();

    TeamSnapshot {
        id: id.to_owned(),
        funds,
        logo_path: string_from_value(&team["logo_path"]),
        roster,
    }
}

/// Reads the snapshot from a file on every fetch
#[derive(Clone, Debug)]
pub struct FileSnapshotSource {
    path: PathBuf,
}

impl FileSnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn new_shared(path: impl Into<PathBuf>) -> SharedSnapshotSource {
        Arc::new(Self::new(path))
    }
}

impl SnapshotSource for FileSnapshotSource {
    fn fetch(&self) -> Result<Teams> {
        let body = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading snapshot {}", self.path.display()))?;
        Ok(decode(&body)?)
    }
}

/// Fake snapshot endpoint.
///
/// Useful for unit-tests.
#[derive(Default)]
pub struct InMemorySnapshotSource {
    teams: Mutex<Option<Teams>>,
    fetches: AtomicUsize,
}

impl InMemorySnapshotSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, teams: Teams) {
        *self.teams.lock() = Some(teams);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl SnapshotSource for InMemorySnapshotSource {
    fn fetch(&self) -> Result<Teams> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.teams
            .lock()
            .clone()
            .ok_or_else(|| format_err!("no snapshot available"))
    }
}
