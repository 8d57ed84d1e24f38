use std::{sync::Arc, time::Duration};

use crate::{
    event::{Event, OutboundEvent},
    event_log,
};
use anyhow::Result;
use tracing::debug;

use super::*;

mod in_memory;
mod replay;
pub use self::{in_memory::*, replay::*};

/// The realtime channel to the auction server
pub trait ServerLink {
    fn send(&self, request: &OutboundEvent) -> Result<()>;
    /// Next inbound event, if one arrives within `timeout`
    fn poll(&self, timeout: Option<Duration>) -> Result<Option<Event>>;
}

pub type SharedServerLink = Arc<dyn ServerLink + Send + Sync + 'static>;

pub struct ServerSender {
    link: SharedServerLink,
}

impl ServerSender {
    pub fn new(link: SharedServerLink) -> Self {
        Self { link }
    }
}

impl LogFollowerService for ServerSender {
    fn get_log_progress_id(&self) -> String {
        "server-sender".to_owned()
    }

    fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Outbound(request) => {
                debug!(?request, "sending");
                // Fire and forget: the outcome comes back as a push event
                self.link.send(&request)
            }
            _ => Ok(()),
        }
    }
}

pub struct ServerReceiver {
    event_writer: event_log::SharedWriter,
    link: SharedServerLink,
}

impl ServerReceiver {
    pub fn new(event_writer: event_log::SharedWriter, link: SharedServerLink) -> Self {
        Self { event_writer, link }
    }
}

impl LoopService for ServerReceiver {
    fn run_iteration(&mut self) -> Result<()> {
        if let Some(event) = self.link.poll(Some(Duration::from_millis(500)))? {
            debug!(?event, "received");
            self.event_writer.write(&[event])?;
        }

        Ok(())
    }
}
