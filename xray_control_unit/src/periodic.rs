//! Named background loops with a bounded stop latency.
//!
//! Each task runs its body once per period on a dedicated thread. Stopping
//! wakes the thread immediately instead of waiting out the period.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// A running periodic loop.
pub struct PeriodicTask {
    name: String,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Spawn `body` every `period`, starting immediately.
    pub fn spawn<F>(name: &str, period: Duration, mut body: F) -> std::io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                loop {
                    let started = Instant::now();
                    body();
                    let wait = period.saturating_sub(started.elapsed());
                    match rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;
        debug!("Started periodic task '{name}' ({period:?})");
        Ok(Self {
            name: name.to_string(),
            stop: Some(tx),
            handle: Some(handle),
        })
    }

    /// Task name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop and join. Idempotent.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                // Stopping from inside the body: the loop exits on its own.
                return;
            }
            if handle.join().is_err() {
                warn!("Periodic task '{}' panicked", self.name);
            }
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}
