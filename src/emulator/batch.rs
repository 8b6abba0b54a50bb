//! Scope guard deferring publishes across several drawing calls.

use super::Epd;
use crate::error::Result;
use log::{debug, error};
use std::sync::atomic::Ordering;

/// An open batch on an [`Epd`].
///
/// Batches nest: the depth counter is shared, and only the exit of the
/// outermost guard publishes. The exit also runs when the guard is dropped
/// during unwinding, so the display never stays stale after an error.
#[must_use = "dropping the guard immediately closes the batch"]
pub struct BatchGuard<'a> {
    epd: &'a Epd,
    open: bool,
}

impl<'a> BatchGuard<'a> {
    pub(super) fn enter(epd: &'a Epd) -> Self {
        let depth = epd.batch_depth.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Batch opened (depth {})", depth);
        BatchGuard { epd, open: true }
    }

    /// Closes the batch and returns the result of the closing publish, if
    /// this was the outermost batch.
    pub fn finish(mut self) -> Result<()> {
        self.exit()
    }

    fn exit(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        let depth = self.epd.batch_depth.fetch_sub(1, Ordering::SeqCst) - 1;
        debug!("Batch closed (depth {})", depth);
        if depth == 0 {
            self.epd.publish()
        } else {
            Ok(())
        }
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.exit() {
            error!("Publish at the end of a batch failed: {}", e);
        }
    }
}
