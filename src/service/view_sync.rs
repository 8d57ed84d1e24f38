//! View Sync
//!
//! Applies inbound events from the log to the shared view, one at a
//! time, and triggers whatever each of them calls for: a snapshot
//! refresh, or a fresh `request_initial_data` after (re)connecting.
use super::{LogFollowerService, SharedRefreshSignal};
use crate::{
    auction::format_amount,
    event::Event,
    event_log,
    view::{Followup, SharedView},
};
use anyhow::Result;
use tracing::debug;

pub const VIEW_SYNC_SERVICE_ID: &str = "view-sync";

pub struct ViewSync {
    view: SharedView,
    refresh: SharedRefreshSignal,
    event_writer: event_log::SharedWriter,
}

impl ViewSync {
    pub fn new(
        view: SharedView,
        refresh: SharedRefreshSignal,
        event_writer: event_log::SharedWriter,
    ) -> Self {
        Self {
            view,
            refresh,
            event_writer,
        }
    }

    fn follow_up(&self, followup: Followup) -> Result<()> {
        if followup.request_initial_data {
            let request = self.view.lock().initial_data_request();
            self.event_writer.write(&[Event::Outbound(request)])?;
        }
        if followup.refresh_snapshot {
            self.refresh.request();
        }
        Ok(())
    }
}

impl LogFollowerService for ViewSync {
    fn get_log_progress_id(&self) -> String {
        VIEW_SYNC_SERVICE_ID.to_owned()
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        let followup = {
            let mut view = self.view.lock();
            let followup = match &event {
                Event::Push(push) => view.apply_push(push),
                Event::Connection(connection) => view.apply_connection(connection),
                _ => return Ok(()),
            };

            let derived = view.derived_view();
            debug!(
                lot = ?derived.lot.as_ref().map(|l| &l.name),
                next_bid = %format_amount(derived.decision.next_bid),
                after_bid = %format_amount(derived.money_after_bid),
                can_submit = derived.can_submit,
                "view updated"
            );
            followup
        };

        self.follow_up(followup)
    }
}
