pub mod server_link;
pub mod snapshot_fetcher;
pub mod ui;
pub mod view_sync;

pub use self::{server_link::*, snapshot_fetcher::*, ui::*, view_sync::*};
use crate::{
    event::Event,
    event_log::{self, WithOffset},
};
use anyhow::{bail, format_err, Result};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};
use tracing::{debug, error};

pub type ServiceId = String;

/// How long a log follower blocks waiting for new events
const LOG_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// A service that handles events on the log
pub trait LogFollowerService: Send + Sync {
    fn get_log_progress_id(&self) -> String;

    fn handle_event(&mut self, event: Event) -> Result<()>;
}

/// A service that is a loop that does something
pub trait LoopService: Send + Sync {
    fn run_iteration(&mut self) -> Result<()>;
}

/// Service execution control instance
///
/// All services are basically a loop, and we would like to be able to
/// gracefully terminate them, and handle any top-level error of any
/// of them by gracefully stopping everything else.
#[derive(Clone, Default)]
pub struct ServiceControl {
    stop_all: Arc<AtomicBool>,
}

impl ServiceControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_all(&self) {
        self.stop_all.store(true, Ordering::SeqCst);
    }

    pub fn spawn_log_follower(
        &self,
        mut service: impl LogFollowerService + 'static,
        event_reader: event_log::SharedReader,
    ) -> JoinHandle {
        self.spawn_event_loop(service.get_log_progress_id(), event_reader, move |event| {
            service.handle_event(event)
        })
    }

    pub fn spawn_loop(&self, mut service: impl LoopService + 'static) -> JoinHandle {
        self.spawn_loop_raw(move || service.run_iteration())
    }

    /// Start a new service as a loop, with a certain body
    ///
    /// This will take care of checking termination condition and
    /// handling any errors returned by `f`
    fn spawn_loop_raw<F>(&self, mut f: F) -> JoinHandle
    where
        F: FnMut() -> Result<()> + Send + Sync + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));

        JoinHandle::new(
            stop.clone(),
            thread::spawn({
                let stop_all = self.stop_all.clone();
                move || match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    while !stop.load(Ordering::SeqCst) && !stop_all.load(Ordering::SeqCst) {
                        if let Err(e) = f() {
                            error!(error = %e, "service failed, stopping all");
                            stop_all.store(true, Ordering::SeqCst);
                            return Err(e);
                        }
                    }
                    Ok(())
                })) {
                    Err(_e) => {
                        stop_all.store(true, Ordering::SeqCst);
                        bail!("service panicked");
                    }
                    Ok(res) => res,
                }
            }),
        )
    }

    /// Run `f` on every event of the log, in order
    ///
    /// Progress is kept in memory: followers start at the beginning of
    /// the log, which only ever holds events of the current session.
    fn spawn_event_loop<F>(
        &self,
        service_id: ServiceId,
        event_reader: event_log::SharedReader,
        mut f: F,
    ) -> JoinHandle
    where
        F: FnMut(Event) -> Result<()> + Send + Sync + 'static,
    {
        let mut progress = match event_reader.get_start_offset() {
            // To avoid returning a `Result` directly from here, spawn a thread that will immediately terminate with an error,
            // just like the initial progress load was done from the spawned thread itself.
            Err(e) => {
                return JoinHandle::new(
                    Arc::new(AtomicBool::new(false)),
                    thread::spawn(move || Err(e)),
                )
            }
            Ok(o) => o,
        };

        self.spawn_loop_raw(move || {
            let WithOffset {
                offset: new_offset,
                data: events,
            } = event_reader.read(progress, 1, Some(LOG_READ_TIMEOUT))?;

            for event in events {
                debug!(service = %service_id, offset = event.offset, "handling event");
                f(event.details)?;
            }
            progress = new_offset;
            Ok(())
        })
    }
}

/// Simple thread join wrapper that joins the thread on drop
pub struct JoinHandle {
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<Result<()>>>,
}

impl JoinHandle {
    fn new(stop: Arc<AtomicBool>, handle: thread::JoinHandle<Result<()>>) -> Self {
        JoinHandle {
            stop,
            thread: Some(handle),
        }
    }

    fn join_mut(&mut self) -> Result<()> {
        if let Some(h) = self.thread.take() {
            h.join().map_err(|e| format_err!("join failed: {:?}", e))?
        } else {
            Ok(())
        }
    }

    pub fn join(mut self) -> Result<()> {
        self.join_mut()
    }
}

impl Drop for JoinHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Err(e) = self.join_mut() {
            error!(error = %e, "service terminated with an error");
        }
    }
}
