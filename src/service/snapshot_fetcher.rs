//! Snapshot Fetcher
//!
//! Refreshes the teams of the view whenever someone asks for it.
//! Requests made while a fetch is in flight are coalesced into the
//! next fetch.
use super::LoopService;
use crate::snapshot::SharedSnapshotSource;
use crate::view::SharedView;
use anyhow::Result;
use parking_lot::{Condvar, Mutex};
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

#[derive(Default)]
pub struct RefreshSignal {
    pending: Mutex<u64>,
    condvar: Condvar,
}

pub type SharedRefreshSignal = Arc<RefreshSignal>;

impl RefreshSignal {
    pub fn new_shared() -> SharedRefreshSignal {
        Arc::new(Self::default())
    }

    pub fn request(&self) {
        *self.pending.lock() += 1;
        self.condvar.notify_all();
    }

    /// Wait up to `timeout` for requests and take all of them
    pub fn take(&self, timeout: Duration) -> bool {
        let mut pending = self.pending.lock();
        if *pending == 0 {
            self.condvar.wait_for(&mut pending, timeout);
        }
        std::mem::take(&mut *pending) != 0
    }
}

pub struct SnapshotFetcher {
    view: SharedView,
    source: SharedSnapshotSource,
    signal: SharedRefreshSignal,
    wait: Duration,
}

impl SnapshotFetcher {
    pub fn new(view: SharedView, source: SharedSnapshotSource, signal: SharedRefreshSignal) -> Self {
        Self {
            view,
            source,
            signal,
            wait: Duration::from_millis(500),
        }
    }
}

impl LoopService for SnapshotFetcher {
    fn run_iteration(&mut self) -> Result<()> {
        if !self.signal.take(self.wait) {
            return Ok(());
        }

        // Fetch without holding the view; push events keep flowing meanwhile.
        match self.source.fetch() {
            Ok(teams) => {
                debug!(teams = teams.len(), "applying snapshot");
                self.view.lock().apply_snapshot(teams);
            }
            Err(e) => warn!(error = %e, "snapshot fetch failed, keeping previous teams"),
        }
        Ok(())
    }
}
