// src/draw.rs

//! Geometry and style arguments of the convenience drawing calls.
//!
//! Boxes follow the usual imaging conventions: `(x0, y0, x1, y1)` with both
//! corners inclusive, and outlines drawn inside the box.

use crate::color::Color;
use crate::error::{EpdError, Result};
use crate::frame::Frame;
use embedded_graphics::{
    geometry::{Point, Size},
    mono_font::{ascii::FONT_6X10, MonoFont},
    pixelcolor::Rgb888,
    primitives::{PrimitiveStyle, PrimitiveStyleBuilder, Rectangle, StrokeAlignment},
    Drawable,
};

/// Font used when the caller has no preference.
pub const DEFAULT_FONT: &MonoFont<'static> = &FONT_6X10;

/// Two corners, as in `(x0, y0, x1, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Bounds {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Bounds { x0, y0, x1, y1 }
    }

    pub fn start(&self) -> Point {
        Point::new(self.x0, self.y0)
    }

    pub fn end(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    /// The box as a rectangle; the second corner must not lie above or left
    /// of the first.
    pub fn to_rectangle(&self) -> Result<Rectangle> {
        if self.x1 < self.x0 {
            return Err(EpdError::InvalidGeometry(format!(
                "x1 ({}) must be greater than or equal to x0 ({})",
                self.x1, self.x0
            )));
        }
        if self.y1 < self.y0 {
            return Err(EpdError::InvalidGeometry(format!(
                "y1 ({}) must be greater than or equal to y0 ({})",
                self.y1, self.y0
            )));
        }
        let (width, height) = match (span(self.x0, self.x1), span(self.y0, self.y1)) {
            (Some(width), Some(height)) => (width, height),
            _ => {
                return Err(EpdError::InvalidGeometry(format!(
                    "box ({}, {}, {}, {}) exceeds the coordinate range",
                    self.x0, self.y0, self.x1, self.y1
                )))
            }
        };
        Ok(Rectangle::new(self.start(), Size::new(width, height)))
    }
}

/// Pixel count of the inclusive range `start..=end`, if both the count and
/// `end + 1` fit in an `i32`.
fn span(start: i32, end: i32) -> Option<u32> {
    end.checked_add(1)?
        .checked_sub(start)
        .and_then(|len| u32::try_from(len).ok())
}

impl From<(i32, i32, i32, i32)> for Bounds {
    fn from((x0, y0, x1, y1): (i32, i32, i32, i32)) -> Self {
        Bounds::new(x0, y0, x1, y1)
    }
}

impl From<((i32, i32), (i32, i32))> for Bounds {
    fn from(((x0, y0), (x1, y1)): ((i32, i32), (i32, i32))) -> Self {
        Bounds::new(x0, y0, x1, y1)
    }
}

impl From<(Point, Point)> for Bounds {
    fn from((a, b): (Point, Point)) -> Self {
        Bounds::new(a.x, a.y, b.x, b.y)
    }
}

/// Outline and fill of a closed shape. A style with neither draws nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeStyle {
    pub outline: Option<Color>,
    pub fill: Option<Color>,
    /// Outline width in pixels; 0 is treated as 1.
    pub width: u32,
}

impl Default for ShapeStyle {
    fn default() -> Self {
        ShapeStyle {
            outline: None,
            fill: None,
            width: 1,
        }
    }
}

impl ShapeStyle {
    pub fn outline(color: impl Into<Color>) -> Self {
        ShapeStyle::default().with_outline(color)
    }

    pub fn filled(color: impl Into<Color>) -> Self {
        ShapeStyle::default().with_fill(color)
    }

    pub fn with_outline(mut self, color: impl Into<Color>) -> Self {
        self.outline = Some(color.into());
        self
    }

    pub fn with_fill(mut self, color: impl Into<Color>) -> Self {
        self.fill = Some(color.into());
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn to_primitive_style(&self) -> PrimitiveStyle<Rgb888> {
        let mut builder = PrimitiveStyleBuilder::new().stroke_alignment(StrokeAlignment::Inside);
        if let Some(outline) = self.outline {
            builder = builder
                .stroke_color(outline.to_rgb888())
                .stroke_width(self.width.max(1));
        }
        if let Some(fill) = self.fill {
            builder = builder.fill_color(fill.to_rgb888());
        }
        builder.build()
    }
}

/// Draws anything `embedded-graphics` can draw onto a frame.
pub fn draw_on<D>(frame: &mut Frame, drawable: &D) -> D::Output
where
    D: Drawable<Color = Rgb888>,
{
    match drawable.draw(frame) {
        Ok(output) => output,
        Err(never) => match never {},
    }
}
