// src/lib.rs

//! Emulator for Waveshare-style e-paper displays.
//!
//! An [`Epd`] owns one in-memory frame sized from a per-model JSON
//! descriptor and publishes it to a desktop window, a local web page or
//! nowhere at all (headless). Its method set follows the hardware drivers so
//! display code can be developed without the panel attached.

pub mod color;
pub mod config;
pub mod display;
pub mod draw;
pub mod emulator;
pub mod error;
pub mod frame;

pub use color::{Color, NamedColor};
pub use config::{BackendKind, DisplayDescriptor, EmulatorOptions};
pub use display::Backend;
pub use draw::{Bounds, ShapeStyle, DEFAULT_FONT};
pub use emulator::{BatchGuard, Epd};
pub use error::{EpdError, Result};
pub use frame::{Frame, PixelMode, SharedFrame};
