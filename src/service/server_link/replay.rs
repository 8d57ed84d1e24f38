use super::*;
use crate::event::{self, ConnectionEvent};
use anyhow::Context;
use parking_lot::Mutex;
use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
};
use tracing::warn;

/// A server link replaying a recorded feed
///
/// Inbound events are read from JSON lines, one envelope per line;
/// outbound requests are written out as JSON lines too. The link
/// reports itself connected before the first recorded event.
pub struct ReplayServerLink {
    inbound: Mutex<Box<dyn BufRead + Send>>,
    outbound: Mutex<Box<dyn Write + Send>>,
    connected: AtomicBool,
    pace: Duration,
}

impl ReplayServerLink {
    pub fn new(
        inbound: Box<dyn BufRead + Send>,
        outbound: Box<dyn Write + Send>,
        pace: Duration,
    ) -> Self {
        Self {
            inbound: Mutex::new(inbound),
            outbound: Mutex::new(outbound),
            connected: AtomicBool::new(false),
            pace,
        }
    }

    /// Replay `path`, writing requests to stdout
    pub fn open(path: &Path, pace: Duration) -> Result<Self> {
        let file =
            File::open(path).with_context(|| format!("opening event feed {}", path.display()))?;
        Ok(Self::new(
            Box::new(BufReader::new(file)),
            Box::new(io::stdout()),
            pace,
        ))
    }

    pub fn into_shared(self) -> SharedServerLink {
        Arc::new(self)
    }
}

impl ServerLink for ReplayServerLink {
    fn send(&self, request: &OutboundEvent) -> Result<()> {
        let line = request.encode()?;
        let mut out = self.outbound.lock();
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }

    fn poll(&self, timeout: Option<Duration>) -> Result<Option<Event>> {
        if !self.connected.swap(true, Ordering::SeqCst) {
            return Ok(Some(Event::Connection(ConnectionEvent::Connected)));
        }

        let mut inbound = self.inbound.lock();
        let mut line = String::new();
        loop {
            line.clear();
            if inbound.read_line(&mut line)? == 0 {
                // end of the feed; nothing more will arrive
                drop(inbound);
                if let Some(t) = timeout {
                    std::thread::sleep(t);
                }
                return Ok(None);
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match event::decode(line) {
                Ok(event) => {
                    drop(inbound);
                    if !self.pace.is_zero() {
                        std::thread::sleep(self.pace);
                    }
                    return Ok(Some(event));
                }
                Err(e) => warn!(error = %e, line, "skipping undecodable event"),
            }
        }
    }
}
