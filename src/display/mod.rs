// src/display/mod.rs
//! Display backends.
//!
//! - DisplayDriver: the common "publish the current frame" capability
//! - Backend: the closed set of drivers, chosen once at construction
//! - RefreshActor: the periodic refresh shared by the drivers

pub mod backend;
pub mod driver;
pub mod drivers;
pub mod refresh;

pub use backend::Backend;
pub use driver::{DisplayDriver, DriverConfig};
pub use drivers::{HeadlessDriver, HttpDriver, WindowDriver};
pub use refresh::RefreshActor;
