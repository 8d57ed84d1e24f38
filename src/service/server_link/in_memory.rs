use super::*;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Fake server link.
///
/// Useful for unit-tests.
#[derive(Default)]
pub struct InMemoryServerLink {
    inbound: Mutex<VecDeque<Event>>,
    sent: Mutex<Vec<OutboundEvent>>,
}

impl InMemoryServerLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Event) {
        self.inbound.lock().push_back(event);
    }

    pub fn sent(&self) -> Vec<OutboundEvent> {
        self.sent.lock().clone()
    }
}

impl ServerLink for InMemoryServerLink {
    fn send(&self, request: &OutboundEvent) -> Result<()> {
        self.sent.lock().push(request.clone());
        Ok(())
    }

    fn poll(&self, timeout: Option<Duration>) -> Result<Option<Event>> {
        let event = self.inbound.lock().pop_front();
        if event.is_none() {
            if let Some(t) = timeout {
                std::thread::sleep(t.min(Duration::from_millis(10)));
            }
        }
        Ok(event)
    }
}
