//! Background staleness sweep.
//!
//! The sweep runs on its own named thread, woken by a crossbeam ticker. The
//! [`SweepHandle`] owns that thread: stopping it disconnects the shutdown
//! channel and joins, so once [`SweepHandle::stop`] returns the task can no
//! longer run.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use corelib::{Error, Result};
use crossbeam::channel::{bounded, tick, Sender};
use tracing::{debug, warn};

/// Owned handle to a repeating background task.
#[derive(Debug)]
pub struct SweepHandle {
    shutdown: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl SweepHandle {
    /// Run `task` every `interval` until stopped.
    ///
    /// The first run happens one interval after spawning.
    pub fn spawn<F>(interval: Duration, mut task: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (shutdown, stop) = bounded::<()>(1);
        let ticker = tick(interval);

        let thread = thread::Builder::new()
            .name("ringroute-sweep".into())
            .spawn(move || {
                debug!(?interval, "staleness sweep started");
                loop {
                    crossbeam::select! {
                        recv(stop) -> _ => break,
                        recv(ticker) -> _ => task(),
                    }
                }
                debug!("staleness sweep stopped");
            })
            .map_err(|e| Error::Scheduler(e.to_string()))?;

        Ok(Self {
            shutdown: Some(shutdown),
            thread: Some(thread),
        })
    }

    /// False once stopped, or if the task panicked and took its thread down.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the task and wait for its thread to exit. Idempotent.
    pub fn stop(&mut self) {
        // Dropping the sender wakes the select with a disconnect.
        drop(self.shutdown.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("staleness sweep thread panicked");
            }
        }
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
