//! Background heartbeat bound to one acquired lock file.
//!
//! The owner appends a byte every interval so waiters polling the file size
//! can tell it is alive. Shutdown is stop-then-join: the owner removes the lock
//! file only after the thread has exited, so no heartbeat races the unlink.

use super::file;
use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use log::{debug, warn};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Lifecycle of a heartbeat thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatState {
    Running,
    Interrupted,
    Stopped,
}

impl HeartbeatState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => HeartbeatState::Running,
            1 => HeartbeatState::Interrupted,
            _ => HeartbeatState::Stopped,
        }
    }
}

/// Handle to a running heartbeat thread.
#[derive(Debug)]
pub struct Heartbeat {
    path: PathBuf,
    state: Arc<AtomicU8>,
    /// Dropping the sender interrupts the sleeping thread.
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Heartbeat {
    /// Spawn a thread appending to `path` every `interval`.
    pub fn start(path: PathBuf, interval: Duration) -> io::Result<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let state = Arc::new(AtomicU8::new(HeartbeatState::Running as u8));

        let thread = {
            let path = path.clone();
            let state = Arc::clone(&state);
            thread::Builder::new()
                .name("dirlock-heartbeat".to_string())
                .spawn(move || {
                    loop {
                        match stop_rx.recv_timeout(interval) {
                            Err(RecvTimeoutError::Timeout) => {
                                if state.load(Ordering::Acquire) != HeartbeatState::Running as u8 {
                                    break;
                                }
                                file::heartbeat(&path);
                            }
                            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        }
                    }
                    state.store(HeartbeatState::Stopped as u8, Ordering::Release);
                })?
        };

        debug!("heartbeat started for '{}'", path.display());
        Ok(Self {
            path,
            state,
            stop: Some(stop_tx),
            thread: Some(thread),
        })
    }

    /// Current state of the thread.
    pub fn state(&self) -> HeartbeatState {
        HeartbeatState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Interrupt the thread and wait for it to exit. Idempotent.
    pub fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };

        self.state
            .store(HeartbeatState::Interrupted as u8, Ordering::Release);
        self.stop.take();

        if thread.join().is_err() {
            warn!("heartbeat thread for '{}' panicked", self.path.display());
            self.state
                .store(HeartbeatState::Stopped as u8, Ordering::Release);
        }
        debug!("heartbeat stopped for '{}'", self.path.display());
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}
