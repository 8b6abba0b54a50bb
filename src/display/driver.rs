// src/display/driver.rs
//! DisplayDriver trait - the one capability every backend provides: publish
//! the current frame.
//!
//! ## Threading Model
//! - The caller draws into the shared frame on its own thread
//! - Each driver owns its worker threads (window loop, HTTP listener,
//!   refresh actor) and reads the shared frame under its lock
//! - `publish()` never holds the frame lock across the call into the driver
//!
//! ## Lifecycle
//! 1. `start()` - Acquire resources (window, socket) and render the initial frame
//! 2. `publish()` - Any number of times
//! 3. `shutdown()` - Stop workers and release resources; `Drop` does the same

use crate::error::Result;
use crate::frame::SharedFrame;
use std::time::Duration;

/// Everything a driver needs to know about the display it emulates.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub width: u32,
    pub height: u32,
    /// Window title / page title.
    pub title: String,
    pub update_interval: Duration,
    /// HTTP port; 0 picks a free one.
    pub port: u16,
    pub open_browser: bool,
    pub window_scale: u8,
}

pub trait DisplayDriver {
    /// Acquire the driver's resources and show the initial frame.
    ///
    /// Failure here is fatal for the emulator (no window, port in use, ...).
    fn start(config: &DriverConfig, frame: SharedFrame) -> Result<Self>
    where
        Self: Sized;

    /// Make the frame's current contents visible now, independently of the
    /// periodic refresh.
    fn publish(&self) -> Result<()>;

    /// False once the display went away (window closed, driver shut down).
    fn is_open(&self) -> bool;

    /// Stop worker threads and release resources. Idempotent.
    fn shutdown(&mut self) -> Result<()>;
}
