// src/display/backend.rs
//! Backend - the display driver chosen for an emulator instance.

use crate::config::BackendKind;
use crate::display::driver::{DisplayDriver, DriverConfig};
use crate::display::drivers::{HeadlessDriver, HttpDriver, WindowDriver};
use crate::error::Result;
use crate::frame::SharedFrame;
use log::info;

/// One running display driver. Selected once by `start`; callers only ever
/// go through the `DisplayDriver` capability afterwards.
pub enum Backend {
    Window(WindowDriver),
    Http(HttpDriver),
    Headless(HeadlessDriver),
}

impl Backend {
    /// Starts the driver of the given kind on `frame`.
    pub fn start(kind: BackendKind, config: &DriverConfig, frame: SharedFrame) -> Result<Self> {
        info!(
            "Backend: Starting {:?} driver for {}x{}",
            kind, config.width, config.height
        );
        let backend = match kind {
            BackendKind::Window => Backend::Window(WindowDriver::start(config, frame)?),
            BackendKind::Http => Backend::Http(HttpDriver::start(config, frame)?),
            BackendKind::Headless => Backend::Headless(HeadlessDriver::start(config, frame)?),
        };
        Ok(backend)
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Window(_) => BackendKind::Window,
            Backend::Http(_) => BackendKind::Http,
            Backend::Headless(_) => BackendKind::Headless,
        }
    }

    fn driver(&self) -> &dyn DisplayDriver {
        match self {
            Backend::Window(driver) => driver,
            Backend::Http(driver) => driver,
            Backend::Headless(driver) => driver,
        }
    }

    fn driver_mut(&mut self) -> &mut dyn DisplayDriver {
        match self {
            Backend::Window(driver) => driver,
            Backend::Http(driver) => driver,
            Backend::Headless(driver) => driver,
        }
    }

    pub fn publish(&self) -> Result<()> {
        self.driver().publish()
    }

    pub fn is_open(&self) -> bool {
        self.driver().is_open()
    }

    pub fn shutdown(&mut self) -> Result<()> {
        self.driver_mut().shutdown()
    }

    pub fn as_http(&self) -> Option<&HttpDriver> {
        match self {
            Backend::Http(driver) => Some(driver),
            _ => None,
        }
    }

    pub fn as_headless(&self) -> Option<&HeadlessDriver> {
        match self {
            Backend::Headless(driver) => Some(driver),
            _ => None,
        }
    }
}
