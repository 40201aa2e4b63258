use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{IciclesError, Result};

/// Static description of an animation and the installation it targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub x_count: u32,
    pub y_count: u32,
    pub radio_panels_count: u32,
    #[serde(default = "default_loops_count")]
    pub loops_count: u32,
    #[serde(default = "default_version_number")]
    pub version_number: u32,
}

fn default_loops_count() -> u32 {
    1
}

fn default_version_number() -> u32 {
    Header::CURRENT_VERSION
}

impl Header {
    pub const CURRENT_VERSION: u32 = 1;
    /// Panel indices travel as one byte on the wire.
    pub const MAX_RADIO_PANELS: u32 = u8::MAX as u32;

    /// Creates a single-loop header for the given grid and panel counts.
    pub fn new(name: impl Into<String>, x_count: u32, y_count: u32, radio_panels_count: u32) -> Self {
        Self {
            name: name.into(),
            x_count,
            y_count,
            radio_panels_count,
            loops_count: 1,
            version_number: Self::CURRENT_VERSION,
        }
    }

    /// Total number of pixels in the grid (`x_count * y_count`).
    pub fn pixels_count(&self) -> usize {
        self.x_count as usize * self.y_count as usize
    }

    pub fn panels_count(&self) -> usize {
        self.radio_panels_count as usize
    }

    /// Rejects headers whose panels cannot be addressed in a frame payload.
    pub fn validate(&self) -> Result<()> {
        if self.radio_panels_count > Self::MAX_RADIO_PANELS {
            return Err(IciclesError::decode(format!(
                "`{}` declares {} radio panels, at most {} are addressable",
                self.name,
                self.radio_panels_count,
                Self::MAX_RADIO_PANELS
            )));
        }
        Ok(())
    }
}

/// 8-bit RGB color. Serialized as its packed 32-bit value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Packed `0xAARRGGBB` value with a fully opaque alpha channel.
    pub const fn value(self) -> u32 {
        0xFF00_0000 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    /// Unpacks a `0xAARRGGBB` value; the alpha channel is ignored.
    pub const fn from_value(value: u32) -> Self {
        Self {
            r: (value >> 16) as u8,
            g: (value >> 8) as u8,
            b: value as u8,
        }
    }

    /// Component-wise linear interpolation from `from` to `to`.
    ///
    /// `factor` is clamped to `[0, 1]`; a NaN factor is treated as `0`.
    pub fn linear_blend(from: Color, to: Color, factor: f32) -> Color {
        let t = if factor.is_nan() {
            0.0
        } else {
            factor.clamp(0.0, 1.0)
        };
        let lerp = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Color {
            r: lerp(from.r, to.r),
            g: lerp(from.g, to.g),
            b: lerp(from.b, to.b),
        }
    }
}

impl From<u32> for Color {
    fn from(value: u32) -> Self {
        Color::from_value(value)
    }
}

impl From<Color> for u32 {
    fn from(color: Color) -> Self {
        color.value()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Named colors used by the codec defaults.
pub mod colors {
    use super::Color;

    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const RED: Color = Color::new(255, 0, 0);
    pub const BLUE: Color = Color::new(0, 0, 255);
    pub const ORANGE: Color = Color::new(255, 165, 0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_and_unpacks_values() {
        let color = Color::new(0x12, 0x34, 0x56);
        assert_eq!(color.value(), 0xFF12_3456);
        assert_eq!(Color::from_value(0x0012_3456), color);
    }

    #[test]
    fn blends_with_rounding_and_clamping() {
        let mid = Color::linear_blend(colors::BLACK, colors::WHITE, 0.5);
        assert_eq!(mid, Color::new(128, 128, 128));
        assert_eq!(Color::linear_blend(colors::RED, colors::BLUE, 2.0), colors::BLUE);
        assert_eq!(Color::linear_blend(colors::RED, colors::BLUE, -1.0), colors::RED);
        assert_eq!(Color::linear_blend(colors::RED, colors::BLUE, f32::NAN), colors::RED);
    }

    #[test]
    fn serializes_as_packed_value() {
        let json = serde_json::to_string(&colors::ORANGE).unwrap();
        assert_eq!(json, (0xFFFF_A500u32).to_string());
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, colors::ORANGE);
    }

    #[test]
    fn header_defaults_loops_and_version() {
        let header: Header = serde_json::from_str(
            r#"{"name":"a","x_count":4,"y_count":5,"radio_panels_count":2}"#,
        )
        .unwrap();
        assert_eq!(header.loops_count, 1);
        assert_eq!(header.version_number, Header::CURRENT_VERSION);
        assert_eq!(header.pixels_count(), 20);
    }

    #[test]
    fn panel_count_is_limited_to_one_byte() {
        assert!(Header::new("edge", 1, 1, 255).validate().is_ok());
        let err = Header::new("wide", 1, 1, 256).validate().unwrap_err();
        assert!(format!("{err}").contains("256 radio panels"));
    }
}
