// src/display/drivers/mod.rs
//! Display driver implementations.

pub mod headless;
pub mod http;
pub mod window;

pub use headless::HeadlessDriver;
pub use http::HttpDriver;
pub use window::WindowDriver;
