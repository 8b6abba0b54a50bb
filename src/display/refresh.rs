//! Refresh actor that runs a callback at a fixed interval on its own thread.
//!
//! Both backends keep their output fresh with one of these: the window
//! backend asks its window thread to repaint, the HTTP backend re-encodes
//! the cached PNG. The actor stops when the callback returns `false`, when
//! `stop()` is called, or when it is dropped.

use crate::error::{EpdError, Result};
use log::*;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub struct RefreshActor {
    name: &'static str,
    stop_tx: Option<Sender<()>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl RefreshActor {
    /// Spawns the actor in a background thread named `name`.
    ///
    /// # Arguments
    ///
    /// * `interval` - Time between two calls of `tick`; the first call happens
    ///   one interval after spawning
    /// * `tick` - Refresh callback; returning `false` ends the actor
    pub fn spawn<F>(name: &'static str, interval: Duration, mut tick: F) -> Result<Self>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                info!("RefreshActor[{}]: Started (interval: {:?})", name, interval);
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            trace!("RefreshActor[{}]: Tick", name);
                            if !tick() {
                                info!("RefreshActor[{}]: Target gone, exiting", name);
                                break;
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("RefreshActor[{}]: Thread exiting", name);
            })
            .map_err(|source| EpdError::Spawn { name, source })?;

        Ok(Self {
            name,
            stop_tx: Some(stop_tx),
            thread_handle: Some(thread_handle),
        })
    }

    /// Stops the actor and waits for its thread. Safe to call twice.
    pub fn stop(&mut self) {
        // Dropping the sender wakes the thread with `Disconnected`.
        self.stop_tx.take();
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                error!("RefreshActor[{}] thread panicked: {:?}", self.name, e);
            }
        }
    }
}

impl Drop for RefreshActor {
    fn drop(&mut self) {
        self.stop();
    }
}
