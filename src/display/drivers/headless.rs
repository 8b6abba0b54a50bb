//! Headless display driver: no output, publishes are only counted.

use crate::display::driver::{DisplayDriver, DriverConfig};
use crate::error::{EpdError, Result};
use crate::frame::SharedFrame;
use log::{info, trace};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub struct HeadlessDriver {
    width: u32,
    height: u32,
    publishes: AtomicUsize,
    open: AtomicBool,
}

impl HeadlessDriver {
    /// Number of publishes since start.
    pub fn publish_count(&self) -> usize {
        self.publishes.load(Ordering::SeqCst)
    }
}

impl DisplayDriver for HeadlessDriver {
    fn start(config: &DriverConfig, _frame: SharedFrame) -> Result<Self> {
        info!(
            "HeadlessDriver: Started for a {}x{} display",
            config.width, config.height
        );
        Ok(Self {
            width: config.width,
            height: config.height,
            publishes: AtomicUsize::new(0),
            open: AtomicBool::new(true),
        })
    }

    fn publish(&self) -> Result<()> {
        if !self.is_open() {
            return Err(EpdError::ShutDown);
        }
        let n = self.publishes.fetch_add(1, Ordering::SeqCst) + 1;
        trace!("HeadlessDriver: Publish #{} ({}x{})", n, self.width, self.height);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.open.swap(false, Ordering::SeqCst) {
            info!("HeadlessDriver: Shut down after {} publishes", self.publish_count());
        }
        Ok(())
    }
}
