// src/color.rs

//! Color values accepted by the drawing API (`NamedColor`, `Color`) and their
//! conversion into the pixel mode of the frame being drawn on.

use crate::error::EpdError;
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Colors that can be referred to by name, e.g. in a display descriptor.
/// The palette covers what Waveshare panels can show (black/white, the
/// red/yellow tri-color panels and the 7-color ACeP panels) plus gray.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedColor {
    White,
    Black,
    Red,
    Green,
    Blue,
    Yellow,
    Orange,
    Gray,
}

impl NamedColor {
    pub const ALL: [NamedColor; 8] = [
        NamedColor::White,
        NamedColor::Black,
        NamedColor::Red,
        NamedColor::Green,
        NamedColor::Blue,
        NamedColor::Yellow,
        NamedColor::Orange,
        NamedColor::Gray,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NamedColor::White => "white",
            NamedColor::Black => "black",
            NamedColor::Red => "red",
            NamedColor::Green => "green",
            NamedColor::Blue => "blue",
            NamedColor::Yellow => "yellow",
            NamedColor::Orange => "orange",
            NamedColor::Gray => "gray",
        }
    }

    /// Case-insensitive lookup. `grey` is accepted as an alias of `gray`.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower == "grey" {
            return Some(NamedColor::Gray);
        }
        NamedColor::ALL.into_iter().find(|c| c.name() == lower)
    }

    /// sRGB values, following the CSS color keywords.
    pub fn to_rgb(self) -> (u8, u8, u8) {
        match self {
            NamedColor::White => (255, 255, 255),
            NamedColor::Black => (0, 0, 0),
            NamedColor::Red => (255, 0, 0),
            NamedColor::Green => (0, 128, 0),
            NamedColor::Blue => (0, 0, 255),
            NamedColor::Yellow => (255, 255, 0),
            NamedColor::Orange => (255, 165, 0),
            NamedColor::Gray => (128, 128, 128),
        }
    }
}

/// A color as passed to `clear` or a drawing call.
///
/// `Luma` is a single level (0 = black, 255 = white), the natural value for
/// binary panels. `Rgb` is a true color. Either can be drawn on either pixel
/// mode; see [`Color::to_binary`] and [`Color::to_rgb888`].
///
/// In JSON a color is either a number (`255`) or a string (`"white"`,
/// `"#ff8000"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawColor", into = "RawColor")]
pub enum Color {
    Luma(u8),
    Rgb(u8, u8, u8),
}

impl Color {
    pub const WHITE: Color = Color::Luma(255);
    pub const BLACK: Color = Color::Luma(0);

    /// Luminance using the ITU-R 601-2 weights.
    pub fn luma(self) -> u8 {
        match self {
            Color::Luma(level) => level,
            Color::Rgb(r, g, b) => {
                let weighted = r as u32 * 19595 + g as u32 * 38470 + b as u32 * 7471;
                ((weighted + 0x8000) >> 16) as u8
            }
        }
    }

    /// Value stored in a binary frame: 255 when the luminance is at least
    /// half scale, 0 otherwise.
    pub fn to_binary(self) -> u8 {
        if self.luma() >= 128 {
            255
        } else {
            0
        }
    }

    pub fn to_rgb888(self) -> Rgb888 {
        match self {
            Color::Luma(level) => Rgb888::new(level, level, level),
            Color::Rgb(r, g, b) => Rgb888::new(r, g, b),
        }
    }
}

impl From<u8> for Color {
    fn from(level: u8) -> Self {
        Color::Luma(level)
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Color::Rgb(r, g, b)
    }
}

impl From<NamedColor> for Color {
    fn from(named: NamedColor) -> Self {
        let (r, g, b) = named.to_rgb();
        Color::Rgb(r, g, b)
    }
}

impl From<Rgb888> for Color {
    fn from(c: Rgb888) -> Self {
        Color::Rgb(c.r(), c.g(), c.b())
    }
}

impl FromStr for Color {
    type Err = EpdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(|| EpdError::UnknownColor(s.to_string()));
        }
        if let Ok(level) = s.parse::<u8>() {
            return Ok(Color::Luma(level));
        }
        NamedColor::from_name(s)
            .map(Color::from)
            .ok_or_else(|| EpdError::UnknownColor(s.to_string()))
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Luma(level) => write!(f, "{}", level),
            Color::Rgb(r, g, b) => write!(f, "#{:02x}{:02x}{:02x}", r, g, b),
        }
    }
}

// Wire form of `Color` in descriptor files.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawColor {
    Level(u8),
    Name(String),
}

impl TryFrom<RawColor> for Color {
    type Error = EpdError;

    fn try_from(raw: RawColor) -> Result<Self, Self::Error> {
        match raw {
            RawColor::Level(level) => Ok(Color::Luma(level)),
            RawColor::Name(name) => name.parse(),
        }
    }
}

impl From<Color> for RawColor {
    fn from(color: Color) -> Self {
        match color {
            Color::Luma(level) => RawColor::Level(level),
            rgb => RawColor::Name(rgb.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("Red".parse::<Color>().unwrap(), Color::Rgb(255, 0, 0));
        assert_eq!("grey".parse::<Color>().unwrap(), Color::Rgb(128, 128, 128));
        assert_eq!(" white ".parse::<Color>().unwrap(), Color::Rgb(255, 255, 255));
    }

    #[test]
    fn parses_hex_and_levels() {
        assert_eq!("#ff8000".parse::<Color>().unwrap(), Color::Rgb(255, 128, 0));
        assert_eq!("0".parse::<Color>().unwrap(), Color::Luma(0));
        assert_eq!("255".parse::<Color>().unwrap(), Color::Luma(255));
    }

    #[test]
    fn rejects_unknown_colors() {
        assert!(matches!(
            "chartreuse".parse::<Color>(),
            Err(EpdError::UnknownColor(name)) if name == "chartreuse"
        ));
        assert!("#12345".parse::<Color>().is_err());
        assert!("256".parse::<Color>().is_err());
    }

    #[test]
    fn deserializes_numbers_and_strings_from_json() {
        let colors: Vec<Color> = serde_json::from_str(r##"[0, "black", "#0000ff"]"##).unwrap();
        assert_eq!(colors, vec![Color::Luma(0), Color::Rgb(0, 0, 0), Color::Rgb(0, 0, 255)]);
        assert!(serde_json::from_str::<Color>(r#""mauve""#).is_err());
    }

    #[test]
    fn named_colors_map_to_expected_binary_levels() {
        assert_eq!(Color::from(NamedColor::White).to_binary(), 255);
        assert_eq!(Color::from(NamedColor::Yellow).to_binary(), 255);
        assert_eq!(Color::from(NamedColor::Black).to_binary(), 0);
        assert_eq!(Color::from(NamedColor::Red).to_binary(), 0);
        assert_eq!(Color::from(NamedColor::Blue).to_binary(), 0);
    }

    #[test]
    fn luma_expands_to_gray_in_rgb() {
        assert_eq!(Color::Luma(42).to_rgb888(), Rgb888::new(42, 42, 42));
    }

    proptest! {
        #[test]
        fn binary_conversion_is_two_level(r: u8, g: u8, b: u8) {
            let level = Color::Rgb(r, g, b).to_binary();
            prop_assert!(level == 0 || level == 255);
        }

        #[test]
        fn gray_rgb_has_its_own_luma(v: u8) {
            prop_assert_eq!(Color::Rgb(v, v, v).luma(), v);
            prop_assert_eq!(Color::Rgb(v, v, v).to_binary(), Color::Luma(v).to_binary());
        }
    }
}
