//! Pixel frames, radio panel state and the byte layout sent to the display.
//!
//! A serialized [`AnimationView`] is a fixed-size record:
//!
//! ```text
//! radio panels (radio_panels_count * 4 bytes):
//!   index: u8, r: u8, g: u8, b: u8
//! pixels (pixels_count * 3 bytes):
//!   r: u8, g: u8, b: u8
//! ```
//!
//! Neither count is stored in the payload; decoding needs the [`Header`].
//! Panel indices are a single byte, hence [`Header::MAX_RADIO_PANELS`].

use std::time::Duration;

use crate::{Color, Header, IciclesError, Result};

const PANEL_BYTES: usize = 4;
const PIXEL_BYTES: usize = 3;

/// Full set of pixel colors plus how long they stay on the display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualFrame {
    pub duration: Duration,
    pub pixels: Vec<Color>,
}

impl VisualFrame {
    pub fn new(duration: Duration, pixels: Vec<Color>) -> Self {
        Self { duration, pixels }
    }

    /// Frame of `pixels_count` pixels all set to `color`.
    pub fn filled(pixels_count: usize, color: Color, duration: Duration) -> Self {
        Self {
            duration,
            pixels: vec![color; pixels_count],
        }
    }
}

/// Auxiliary single-color indicator. Index 0 is the broadcast channel, so
/// real panels start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioPanelView {
    pub index: u32,
    pub color: Color,
}

impl RadioPanelView {
    pub const BROADCAST_INDEX: u32 = 0;

    pub fn new(index: u32, color: Color) -> Self {
        Self { index, color }
    }

    pub fn with_color(self, color: Color) -> Self {
        Self { color, ..self }
    }

    /// Panels `1..=count`, all set to `color`.
    pub fn all(count: usize, color: Color) -> Vec<RadioPanelView> {
        (1..=count as u32).map(|index| Self::new(index, color)).collect()
    }
}

/// One unit of playback output: a frame plus the radio panel colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationView {
    pub frame: VisualFrame,
    pub radio_panels: Vec<RadioPanelView>,
}

impl AnimationView {
    pub fn new(frame: VisualFrame, radio_panels: Vec<RadioPanelView>) -> Self {
        Self {
            frame,
            radio_panels,
        }
    }

    /// All pixels and panels off.
    pub fn blank(pixels_count: usize, panels_count: usize, duration: Duration) -> Self {
        Self {
            frame: VisualFrame::filled(pixels_count, Color::default(), duration),
            radio_panels: RadioPanelView::all(panels_count, Color::default()),
        }
    }

    /// Blank view sized for `header`.
    pub fn blank_for(header: &Header, duration: Duration) -> Self {
        Self::blank(header.pixels_count(), header.panels_count(), duration)
    }

    /// Number of bytes [`AnimationView::to_bytes`] produces for `header`.
    pub fn encoded_len(header: &Header) -> usize {
        header.panels_count() * PANEL_BYTES + header.pixels_count() * PIXEL_BYTES
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(
            self.radio_panels.len() * PANEL_BYTES + self.frame.pixels.len() * PIXEL_BYTES,
        );
        for panel in &self.radio_panels {
            bytes.extend_from_slice(&[panel.index as u8, panel.color.r, panel.color.g, panel.color.b]);
        }
        for pixel in &self.frame.pixels {
            bytes.extend_from_slice(&[pixel.r, pixel.g, pixel.b]);
        }
        bytes
    }

    /// Decodes a payload produced by [`AnimationView::to_bytes`]. The frame
    /// duration is not transmitted and comes back as zero.
    pub fn from_bytes(bytes: &[u8], header: &Header) -> Result<Self> {
        let expected = Self::encoded_len(header);
        if bytes.len() != expected {
            return Err(IciclesError::decode(format!(
                "view payload has {} bytes, expected {expected}",
                bytes.len()
            )));
        }

        let (panel_bytes, pixel_bytes) = bytes.split_at(header.panels_count() * PANEL_BYTES);
        let radio_panels = panel_bytes
            .chunks_exact(PANEL_BYTES)
            .map(|chunk| RadioPanelView::new(chunk[0] as u32, Color::new(chunk[1], chunk[2], chunk[3])))
            .collect();
        let pixels = pixel_bytes
            .chunks_exact(PIXEL_BYTES)
            .map(|chunk| Color::new(chunk[0], chunk[1], chunk[2]))
            .collect();

        Ok(Self {
            frame: VisualFrame::new(Duration::ZERO, pixels),
            radio_panels,
        })
    }
}

/// Pixel grid of the installation. Each icicle is a column of `y_count`
/// pixels wired one after another, so pixel `(x, y)` lives at
/// `x * y_count + y`.
#[derive(Debug, Clone)]
pub struct Icicles {
    x_count: usize,
    y_count: usize,
    pixels: Vec<Color>,
}

impl Icicles {
    pub fn new(header: &Header) -> Self {
        Self {
            x_count: header.x_count as usize,
            y_count: header.y_count as usize,
            pixels: vec![Color::default(); header.pixels_count()],
        }
    }

    pub fn x_count(&self) -> usize {
        self.x_count
    }

    pub fn y_count(&self) -> usize {
        self.y_count
    }

    pub fn pixel_index(&self, x: usize, y: usize) -> usize {
        x * self.y_count + y
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    pub fn set_all_pixels_color(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    /// Sets one pixel; coordinates outside the grid are ignored.
    pub fn set_pixel_color(&mut self, x: usize, y: usize, color: Color) {
        if x < self.x_count && y < self.y_count {
            let index = self.pixel_index(x, y);
            self.pixels[index] = color;
        }
    }

    /// Snapshot of the current grid with the given display duration.
    pub fn to_frame(&self, duration: Duration) -> VisualFrame {
        VisualFrame::new(duration, self.pixels.clone())
    }
}
