// src/frame.rs

//! The frame buffer: one bitmap of fixed size and pixel mode.
//!
//! `Frame` is an `embedded-graphics` draw target, so every primitive and
//! font of that crate can be drawn onto it. Pixels arrive as `Rgb888` and are
//! stored in the frame's own mode; out-of-bounds pixels are dropped.

use crate::color::Color;
use crate::error::{EpdError, Result};
use embedded_graphics::{
    geometry::{Dimensions, OriginDimensions, Point, Size},
    pixelcolor::{Rgb888, RgbColor},
    prelude::DrawTarget,
    primitives::Rectangle,
    Pixel,
};
use image::{
    codecs::png::PngEncoder, DynamicImage, ExtendedColorType, GrayImage, ImageEncoder,
    ImageFormat, Luma, Rgb, RgbImage,
};
use std::collections::HashMap;
use std::convert::Infallible;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// The frame as shared between the caller and the display backend.
pub type SharedFrame = Arc<Mutex<Frame>>;

/// How pixels are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelMode {
    /// Black and white, one byte per pixel holding 0 or 255.
    Binary,
    /// True color, three bytes per pixel.
    Rgb,
}

impl PixelMode {
    pub fn from_use_color(use_color: bool) -> Self {
        if use_color {
            PixelMode::Rgb
        } else {
            PixelMode::Binary
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelMode::Binary => 1,
            PixelMode::Rgb => 3,
        }
    }

    /// Mode name in the usual imaging vocabulary ("1" or "RGB").
    pub fn as_str(self) -> &'static str {
        match self {
            PixelMode::Binary => "1",
            PixelMode::Rgb => "RGB",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Binary(GrayImage),
    Rgb(RgbImage),
}

impl Frame {
    /// A frame of `width` x `height` filled with `background`.
    pub fn new(mode: PixelMode, width: u32, height: u32, background: Color) -> Self {
        match mode {
            PixelMode::Binary => {
                Frame::Binary(GrayImage::from_pixel(width, height, Luma([background.to_binary()])))
            }
            PixelMode::Rgb => {
                let c = background.to_rgb888();
                Frame::Rgb(RgbImage::from_pixel(width, height, Rgb([c.r(), c.g(), c.b()])))
            }
        }
    }

    pub fn mode(&self) -> PixelMode {
        match self {
            Frame::Binary(_) => PixelMode::Binary,
            Frame::Rgb(_) => PixelMode::Rgb,
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            Frame::Binary(img) => img.width(),
            Frame::Rgb(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Frame::Binary(img) => img.height(),
            Frame::Rgb(img) => img.height(),
        }
    }

    /// Reads one pixel back; `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        match self {
            Frame::Binary(img) => img.get_pixel_checked(x, y).map(|p| Color::Luma(p[0])),
            Frame::Rgb(img) => img
                .get_pixel_checked(x, y)
                .map(|p| Color::Rgb(p[0], p[1], p[2])),
        }
    }

    /// Writes one pixel, converting `color` into the frame's mode. Writes
    /// outside the frame are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) {
        if x >= self.width() || y >= self.height() {
            return;
        }
        match self {
            Frame::Binary(img) => img.put_pixel(x, y, Luma([color.to_binary()])),
            Frame::Rgb(img) => {
                let c = color.to_rgb888();
                img.put_pixel(x, y, Rgb([c.r(), c.g(), c.b()]))
            }
        }
    }

    /// Raw pixel bytes, row-major, `bytes_per_pixel` bytes per pixel.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Frame::Binary(img) => img.as_raw().clone(),
            Frame::Rgb(img) => img.as_raw().clone(),
        }
    }

    /// Distinct colors with their pixel counts, most frequent first.
    pub fn colors(&self) -> Vec<(usize, Color)> {
        let mut counts: HashMap<Color, usize> = HashMap::new();
        match self {
            Frame::Binary(img) => {
                for p in img.pixels() {
                    *counts.entry(Color::Luma(p[0])).or_default() += 1;
                }
            }
            Frame::Rgb(img) => {
                for p in img.pixels() {
                    *counts.entry(Color::Rgb(p[0], p[1], p[2])).or_default() += 1;
                }
            }
        }
        let mut colors: Vec<(usize, Color)> =
            counts.into_iter().map(|(color, n)| (n, color)).collect();
        colors.sort_by(|a, b| b.0.cmp(&a.0));
        colors
    }

    /// PNG encoding of the frame (8-bit gray for binary frames).
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut png = Vec::new();
        let encoder = PngEncoder::new(&mut png);
        match self {
            Frame::Binary(img) => {
                encoder.write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::L8)?
            }
            Frame::Rgb(img) => encoder.write_image(
                img.as_raw(),
                img.width(),
                img.height(),
                ExtendedColorType::Rgb8,
            )?,
        }
        Ok(png)
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        match self {
            Frame::Binary(img) => img.save_with_format(path, ImageFormat::Png)?,
            Frame::Rgb(img) => img.save_with_format(path, ImageFormat::Png)?,
        }
        Ok(())
    }

    /// Pixels as `0x00RRGGBB` words, the layout window surfaces expect.
    pub fn to_0rgb(&self) -> Vec<u32> {
        match self {
            Frame::Binary(img) => img
                .pixels()
                .map(|p| {
                    let v = p[0] as u32;
                    (v << 16) | (v << 8) | v
                })
                .collect(),
            Frame::Rgb(img) => img
                .pixels()
                .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32)
                .collect(),
        }
    }

    pub fn to_dynamic(&self) -> DynamicImage {
        match self {
            Frame::Binary(img) => DynamicImage::ImageLuma8(img.clone()),
            Frame::Rgb(img) => DynamicImage::ImageRgb8(img.clone()),
        }
    }

    /// Copies `image` onto the frame with its top-left corner at `at`.
    ///
    /// With a mask (same size as `image`), each mask level weights the pasted
    /// pixel against the frame: 255 copies, 0 leaves the frame untouched.
    /// Parts falling outside the frame are clipped.
    pub fn paste(&mut self, image: &DynamicImage, at: Point, mask: Option<&GrayImage>) -> Result<()> {
        let source = image.to_rgb8();
        if let Some(mask) = mask {
            if mask.dimensions() != source.dimensions() {
                return Err(EpdError::InvalidGeometry(format!(
                    "mask is {}x{} but the image is {}x{}",
                    mask.width(),
                    mask.height(),
                    source.width(),
                    source.height()
                )));
            }
        }

        for (sx, sy, src) in source.enumerate_pixels() {
            let (dx, dy) = (at.x + sx as i32, at.y + sy as i32);
            if dx < 0 || dy < 0 {
                continue;
            }
            let (dx, dy) = (dx as u32, dy as u32);
            let Some(dst) = self.pixel(dx, dy) else {
                continue;
            };

            let weight = mask.map_or(255, |m| m.get_pixel(sx, sy)[0]) as u32;
            let color = match weight {
                0 => continue,
                255 => Color::Rgb(src[0], src[1], src[2]),
                w => {
                    let d = dst.to_rgb888();
                    let blend = |s: u8, d: u8| ((s as u32 * w + d as u32 * (255 - w) + 127) / 255) as u8;
                    Color::Rgb(blend(src[0], d.r()), blend(src[1], d.g()), blend(src[2], d.b()))
                }
            };
            self.set_pixel(dx, dy, color);
        }
        Ok(())
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }
}

impl DrawTarget for Frame {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> std::result::Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(Point { x, y }, color) in pixels {
            if x < 0 || y < 0 {
                continue;
            }
            self.set_pixel(x as u32, y as u32, color.into());
        }
        Ok(())
    }

    /// Clips `area` to the frame first, so the cost follows the visible part
    /// of the area rather than its full size.
    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> std::result::Result<(), Self::Error> {
        let visible = area.intersection(&self.bounding_box());
        let Some(bottom_right) = visible.bottom_right() else {
            return Ok(());
        };
        let color = Color::from(color);
        for y in visible.top_left.y..=bottom_right.y {
            for x in visible.top_left.x..=bottom_right.x {
                self.set_pixel(x as u32, y as u32, color);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::prelude::*;
    use embedded_graphics::primitives::{Line, PrimitiveStyle};
    use proptest::prelude::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    #[test]
    fn new_frame_is_uniform_background() {
        let frame = Frame::new(PixelMode::Rgb, 10, 4, Color::Rgb(255, 0, 0));
        assert_eq!(frame.colors(), vec![(40, Color::Rgb(255, 0, 0))]);

        let frame = Frame::new(PixelMode::Binary, 10, 4, Color::Rgb(255, 255, 255));
        assert_eq!(frame.colors(), vec![(40, Color::Luma(255))]);
    }

    #[test]
    fn byte_length_follows_mode() {
        let binary = Frame::new(PixelMode::Binary, 122, 250, Color::WHITE);
        assert_eq!(binary.to_bytes().len(), 122 * 250);
        let rgb = Frame::new(PixelMode::Rgb, 122, 250, Color::WHITE);
        assert_eq!(rgb.to_bytes().len(), 122 * 250 * 3);
    }

    #[test]
    fn drawing_outside_the_frame_is_clipped() {
        let mut frame = Frame::new(PixelMode::Binary, 8, 8, Color::WHITE);
        Line::new(Point::new(-5, 3), Point::new(20, 3))
            .into_styled(PrimitiveStyle::with_stroke(Rgb888::BLACK, 1))
            .draw(&mut frame)
            .unwrap();

        assert_eq!(frame.size(), Size::new(8, 8));
        for x in 0..8 {
            assert_eq!(frame.pixel(x, 3), Some(Color::Luma(0)));
        }
        assert_eq!(frame.pixel(8, 3), None);
        assert_eq!(frame.colors()[0], (56, Color::Luma(255)));
    }

    #[test]
    fn binary_frames_threshold_colors() {
        let mut frame = Frame::new(PixelMode::Binary, 2, 1, Color::WHITE);
        frame.set_pixel(0, 0, Color::Rgb(200, 200, 200));
        frame.set_pixel(1, 0, Color::Rgb(255, 0, 0));
        assert_eq!(frame.pixel(0, 0), Some(Color::Luma(255)));
        assert_eq!(frame.pixel(1, 0), Some(Color::Luma(0)));
    }

    #[test]
    fn png_encoding_produces_a_png() {
        for mode in [PixelMode::Binary, PixelMode::Rgb] {
            let png = Frame::new(mode, 16, 9, Color::WHITE).to_png().unwrap();
            assert_eq!(&png[..8], &PNG_SIGNATURE);
            let decoded = image::load_from_memory(&png).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (16, 9));
        }
    }

    #[test]
    fn packed_words_match_pixels() {
        let mut frame = Frame::new(PixelMode::Rgb, 2, 1, Color::BLACK);
        frame.set_pixel(1, 0, Color::Rgb(0x12, 0x34, 0x56));
        assert_eq!(frame.to_0rgb(), vec![0x000000, 0x123456]);
    }

    #[test]
    fn paste_clips_and_honours_the_mask() {
        let mut frame = Frame::new(PixelMode::Rgb, 4, 4, Color::WHITE);
        let patch = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([0, 0, 0])));
        let mut mask = GrayImage::from_pixel(2, 2, Luma([255]));
        mask.put_pixel(0, 0, Luma([0]));
        mask.put_pixel(1, 0, Luma([128]));

        frame.paste(&patch, Point::new(3, 2), Some(&mask)).unwrap();
        frame.paste(&patch, Point::new(-1, -1), None).unwrap();

        // Pasted at (3, 2): column 4 is clipped, (3, 2) is masked out.
        assert_eq!(frame.pixel(3, 2), Some(Color::Rgb(255, 255, 255)));
        assert_eq!(frame.pixel(3, 3), Some(Color::Rgb(0, 0, 0)));
        // Pasted at (-1, -1): only (0, 0) lands.
        assert_eq!(frame.pixel(0, 0), Some(Color::Rgb(0, 0, 0)));
        assert_eq!(frame.pixel(1, 1), Some(Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn partial_mask_blends() {
        let mut frame = Frame::new(PixelMode::Rgb, 1, 1, Color::WHITE);
        let patch = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([0, 0, 0])));
        let mask = GrayImage::from_pixel(1, 1, Luma([128]));
        frame.paste(&patch, Point::zero(), Some(&mask)).unwrap();
        assert_eq!(frame.pixel(0, 0), Some(Color::Rgb(127, 127, 127)));
    }

    #[test]
    fn mismatched_mask_is_a_geometry_error() {
        let mut frame = Frame::new(PixelMode::Binary, 4, 4, Color::WHITE);
        let patch = DynamicImage::ImageLuma8(GrayImage::new(2, 2));
        let mask = GrayImage::new(3, 2);
        assert!(matches!(
            frame.paste(&patch, Point::zero(), Some(&mask)),
            Err(EpdError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn fill_solid_clips_to_the_frame() {
        let mut frame = Frame::new(PixelMode::Binary, 6, 4, Color::WHITE);
        frame
            .fill_solid(&Rectangle::new(Point::new(-2, 2), Size::new(4, 10)), Rgb888::BLACK)
            .unwrap();
        for y in 0..4 {
            for x in 0..6 {
                let expected = if x < 2 && y >= 2 { Color::BLACK } else { Color::WHITE };
                assert_eq!(frame.pixel(x, y), Some(expected), "pixel ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn huge_filled_rectangle_costs_only_the_visible_pixels() {
        let mut frame = Frame::new(PixelMode::Binary, 122, 250, Color::WHITE);
        let huge = Rectangle::new(Point::new(-500_000, -500_000), Size::new(1_000_000, 1_000_000));

        let started = std::time::Instant::now();
        huge.into_styled(PrimitiveStyle::with_fill(Rgb888::BLACK))
            .draw(&mut frame)
            .unwrap();
        assert!(
            started.elapsed() < std::time::Duration::from_secs(1),
            "filling took {:?}",
            started.elapsed()
        );
        assert_eq!(frame.colors(), vec![(122 * 250, Color::BLACK)]);
    }

    proptest! {
        #[test]
        fn fresh_frames_hold_exactly_one_color(
            w in 1u32..40,
            h in 1u32..40,
            level in any::<u8>(),
            color in any::<bool>(),
        ) {
            let mode = PixelMode::from_use_color(color);
            let frame = Frame::new(mode, w, h, Color::Luma(level));
            let colors = frame.colors();
            prop_assert_eq!(colors.len(), 1);
            prop_assert_eq!(colors[0].0, (w * h) as usize);
            prop_assert_eq!(frame.to_bytes().len(), (w * h) as usize * mode.bytes_per_pixel());
        }
    }
}
