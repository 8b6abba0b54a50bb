// src/emulator.rs

//! `Epd` - the emulated e-paper display.
//!
//! Mirrors the method set of a Waveshare e-paper driver (`init`, `clear`,
//! `display`, `display_partial`, `get_frame_buffer`, `get_buffer`, `sleep`,
//! `dev_exit`) so code written against real hardware runs unchanged, and adds
//! convenience drawing calls that publish on their own.
//!
//! Every drawing call locks the frame, mutates it, releases the lock and then
//! publishes (repaint or re-encode) unless a batch is open. The lock is never
//! held across a publish.

mod batch;

pub use batch::BatchGuard;

use crate::color::Color;
use crate::config::{DisplayDescriptor, EmulatorOptions};
use crate::display::{Backend, DriverConfig};
use crate::draw::{draw_on, Bounds, ShapeStyle};
use crate::error::{EpdError, Result};
use crate::frame::{Frame, PixelMode, SharedFrame};
use embedded_graphics::{
    geometry::{AngleUnit, Point},
    mono_font::{MonoFont, MonoTextStyle},
    primitives::{Arc, Ellipse, Line, Polyline, Primitive, PrimitiveStyle},
    text::{Baseline, Text},
};
use image::{DynamicImage, GrayImage};
use log::{debug, info};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub struct Epd {
    descriptor: DisplayDescriptor,
    mode: PixelMode,
    update_interval: Duration,
    frame: SharedFrame,
    batch_depth: AtomicUsize,
    backend: Option<Backend>,
}

impl Epd {
    /// Loads the descriptor, creates the frame and starts the backend.
    ///
    /// Any failure (missing descriptor, window unavailable, port taken) is
    /// returned here; there is no partially started emulator.
    pub fn new(options: EmulatorOptions) -> Result<Self> {
        options.validate()?;

        let mut descriptor = DisplayDescriptor::load(&options.config_file, options.config_dir())?;
        if options.reverse_orientation {
            descriptor = descriptor.rotated();
        }
        let mode = PixelMode::from_use_color(options.use_color);
        let frame: SharedFrame = std::sync::Arc::new(Mutex::new(Frame::new(
            mode,
            descriptor.width,
            descriptor.height,
            descriptor.color,
        )));

        let driver_config = DriverConfig {
            width: descriptor.width,
            height: descriptor.height,
            title: format!(
                "Waveshare {}x{} EPD Emulator",
                descriptor.width, descriptor.height
            ),
            update_interval: options.update_interval,
            port: options.port,
            open_browser: options.open_browser,
            window_scale: options.window_scale,
        };
        let backend = Backend::start(options.backend, &driver_config, std::sync::Arc::clone(&frame))?;

        info!(
            "Epd: '{}' {}x{} in mode {} on the {:?} backend",
            descriptor.name,
            descriptor.width,
            descriptor.height,
            mode.as_str(),
            backend.kind()
        );

        Ok(Self {
            descriptor,
            mode,
            update_interval: options.update_interval,
            frame,
            batch_depth: AtomicUsize::new(0),
            backend: Some(backend),
        })
    }

    // --- Properties ---

    pub fn width(&self) -> u32 {
        self.descriptor.width
    }

    pub fn height(&self) -> u32 {
        self.descriptor.height
    }

    pub fn mode(&self) -> PixelMode {
        self.mode
    }

    /// The descriptor in effect, after any orientation swap.
    pub fn descriptor(&self) -> &DisplayDescriptor {
        &self.descriptor
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// `None` once the emulator has been shut down.
    pub fn backend(&self) -> Option<&Backend> {
        self.backend.as_ref()
    }

    /// False after shutdown or once the user closed the window.
    pub fn is_open(&self) -> bool {
        self.backend.as_ref().is_some_and(Backend::is_open)
    }

    // --- Driver-compatible API ---

    pub fn init(&self) -> Result<()> {
        info!("EPD initialized");
        Ok(())
    }

    /// Replaces the frame with a fresh one filled with `color` and publishes
    /// immediately, even inside a batch.
    pub fn clear(&self, color: impl Into<Color>) -> Result<()> {
        let color = color.into();
        {
            let mut frame = self.frame.lock()?;
            *frame = Frame::new(self.mode, self.width(), self.height(), color);
        }
        self.publish()?;
        info!("Screen cleared");
        Ok(())
    }

    /// Publishes the current frame. The buffer argument exists for driver
    /// compatibility; the backends always read the live frame.
    pub fn display(&self, _image_buffer: &[u8]) -> Result<()> {
        self.publish()
    }

    pub fn display_partial(&self, image_buffer: &[u8]) -> Result<()> {
        self.display(image_buffer)
    }

    /// Raw bytes of the current frame, for code ported from hardware drivers.
    pub fn get_frame_buffer(&self) -> Result<Vec<u8>> {
        Ok(self.frame.lock()?.to_bytes())
    }

    /// Raw bytes of `frame`.
    pub fn get_buffer(&self, frame: &Frame) -> Vec<u8> {
        frame.to_bytes()
    }

    pub fn sleep(&self) {
        info!("EPD sleep");
    }

    /// Shuts the emulator down, closing the window if there is one.
    pub fn dev_exit(&mut self) -> Result<()> {
        info!("EPD exit");
        self.shutdown()
    }

    /// Stops the backend. Drawing still works afterwards; publishing fails
    /// with `EpdError::ShutDown`.
    pub fn shutdown(&mut self) -> Result<()> {
        match self.backend.take() {
            Some(mut backend) => backend.shutdown(),
            None => Ok(()),
        }
    }

    // --- Frame access ---

    /// A copy of the current frame.
    pub fn snapshot(&self) -> Result<Frame> {
        Ok(self.frame.lock()?.clone())
    }

    /// Writes the current frame to `path` as PNG.
    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.snapshot()?.save_png(path)?;
        info!("Saved screenshot to {}", path.display());
        Ok(())
    }

    /// Runs `f` on the current frame under the lock, without publishing.
    /// Pair with `display()` the way hardware driver code does.
    pub fn with_canvas<R>(&self, f: impl FnOnce(&mut Frame) -> R) -> Result<R> {
        let mut frame = self.frame.lock()?;
        Ok(f(&mut frame))
    }

    /// Runs `f` on the current frame under the lock, then publishes unless a
    /// batch is open.
    pub fn draw<R>(&self, f: impl FnOnce(&mut Frame) -> R) -> Result<R> {
        let value = self.with_canvas(f)?;
        self.publish_unless_batching()?;
        Ok(value)
    }

    // --- Drawing conveniences ---

    pub fn draw_rectangle(&self, xy: impl Into<Bounds>, style: ShapeStyle) -> Result<()> {
        let rect = xy.into().to_rectangle()?;
        let style = style.to_primitive_style();
        self.draw(|frame| draw_on(frame, &rect.into_styled(style)))
    }

    /// A line from `(x0, y0)` to `(x1, y1)`; a width of 0 draws one pixel wide.
    pub fn draw_line(&self, xy: impl Into<Bounds>, fill: impl Into<Color>, width: u32) -> Result<()> {
        let xy = xy.into();
        let line = Line::new(xy.start(), xy.end())
            .into_styled(PrimitiveStyle::with_stroke(fill.into().to_rgb888(), width.max(1)));
        self.draw(|frame| draw_on(frame, &line))
    }

    /// Connected line segments through `points`, in order. At least two
    /// points are required.
    pub fn draw_polyline(&self, points: &[Point], fill: impl Into<Color>, width: u32) -> Result<()> {
        if points.len() < 2 {
            return Err(EpdError::InvalidGeometry(format!(
                "a polyline needs at least 2 points, got {}",
                points.len()
            )));
        }
        let polyline = Polyline::new(points)
            .into_styled(PrimitiveStyle::with_stroke(fill.into().to_rgb888(), width.max(1)));
        self.draw(|frame| draw_on(frame, &polyline))
    }

    /// The ellipse inscribed in the box.
    pub fn draw_ellipse(&self, xy: impl Into<Bounds>, style: ShapeStyle) -> Result<()> {
        let rect = xy.into().to_rectangle()?;
        let ellipse = Ellipse::new(rect.top_left, rect.size).into_styled(style.to_primitive_style());
        self.draw(|frame| draw_on(frame, &ellipse))
    }

    /// An arc of the circle of `diameter` whose bounding box starts at
    /// `top_left`. Angles are in degrees, clockwise from 3 o'clock.
    pub fn draw_arc(
        &self,
        top_left: impl Into<Point>,
        diameter: u32,
        start_deg: f32,
        sweep_deg: f32,
        fill: impl Into<Color>,
        width: u32,
    ) -> Result<()> {
        if diameter == 0 {
            return Err(EpdError::InvalidGeometry("arc diameter must be positive".to_string()));
        }
        let arc = Arc::new(top_left.into(), diameter, start_deg.deg(), sweep_deg.deg())
            .into_styled(PrimitiveStyle::with_stroke(fill.into().to_rgb888(), width.max(1)));
        self.draw(|frame| draw_on(frame, &arc))
    }

    /// Text with its top-left corner at `position`.
    pub fn draw_text(
        &self,
        position: impl Into<Point>,
        text: &str,
        font: &MonoFont<'_>,
        fill: impl Into<Color>,
    ) -> Result<()> {
        let style = MonoTextStyle::new(font, fill.into().to_rgb888());
        let text = Text::with_baseline(text, position.into(), style, Baseline::Top);
        self.draw(|frame| {
            draw_on(frame, &text);
        })
    }

    /// Pastes `image` with its top-left corner at `at`, optionally through a
    /// mask of the same size.
    pub fn paste_image(
        &self,
        image: &DynamicImage,
        at: impl Into<Point>,
        mask: Option<&GrayImage>,
    ) -> Result<()> {
        let at = at.into();
        self.with_canvas(|frame| frame.paste(image, at, mask))??;
        self.publish_unless_batching()
    }

    // --- Batching ---

    /// Opens a batch: drawing calls skip their publish until the returned
    /// guard (and every other open guard) is dropped, then one publish fires.
    pub fn batch(&self) -> BatchGuard<'_> {
        BatchGuard::enter(self)
    }

    /// Runs `f` inside a batch and returns the closing publish's error, if any.
    pub fn batched<R>(&self, f: impl FnOnce(&Self) -> Result<R>) -> Result<R> {
        let guard = self.batch();
        let value = f(self)?;
        guard.finish()?;
        Ok(value)
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth.load(Ordering::SeqCst) > 0
    }

    // --- Publishing ---

    fn publish(&self) -> Result<()> {
        match &self.backend {
            Some(backend) => backend.publish(),
            None => Err(EpdError::ShutDown),
        }
    }

    fn publish_unless_batching(&self) -> Result<()> {
        if self.is_batching() {
            debug!("Epd: Publish deferred, batch open");
            return Ok(());
        }
        self.publish()
    }
}
