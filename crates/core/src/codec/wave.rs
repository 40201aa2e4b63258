use std::collections::VecDeque;

use super::{blend_panels, cleared_frame, Canvas};
use crate::{
    colors,
    level::{LevelTransformer, CODEC_THRESHOLD},
    spectrum::{column_levels, mirrored_level},
    AnimationView, Color, Header,
};

/// Which end of the icicles new rows enter from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaveDirection {
    /// Newest row at the top, history flows down.
    #[default]
    Down,
    /// Newest row at the bottom, history flows up.
    Up,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaveOptions {
    pub panel_disabled_color: Color,
    pub panel_enabled_color: Color,
    pub threshold: f32,
    pub direction: WaveDirection,
    /// Subtracted from every level; whatever falls below it renders as 0.
    pub noise_floor: Option<f32>,
}

impl Default for WaveOptions {
    fn default() -> Self {
        Self {
            panel_disabled_color: colors::BLACK,
            panel_enabled_color: colors::RED,
            threshold: CODEC_THRESHOLD,
            direction: WaveDirection::Down,
            noise_floor: None,
        }
    }
}

impl WaveOptions {
    /// Waterfall that only shows the loudest bands.
    pub fn cutoff() -> Self {
        Self {
            noise_floor: Some(0.8),
            ..Self::default()
        }
    }
}

/// Scrolling waterfall: one row of mirrored column levels per frame, kept for
/// `y_count` frames.
#[derive(Debug, Clone)]
pub struct WaveCodec {
    pub(super) canvas: Canvas,
    options: WaveOptions,
    level: LevelTransformer,
    rows: VecDeque<Vec<f32>>,
}

impl WaveCodec {
    pub fn new(header: &Header, options: WaveOptions) -> Self {
        let canvas = Canvas::new(header);
        let rows = (0..canvas.icicles.y_count())
            .map(|_| vec![0.0; canvas.icicles.x_count()])
            .collect();
        Self {
            canvas,
            level: LevelTransformer::new(options.threshold),
            options,
            rows,
        }
    }

    pub fn options(&self) -> &WaveOptions {
        &self.options
    }

    pub fn smoothing_time_constant(&self) -> f32 {
        0.0
    }

    pub fn animate(&mut self, audio_bins: &[u8], base_level: f32) -> AnimationView {
        let panel_level = self.level.transform(base_level);
        let radio_panels = blend_panels(
            &self.canvas.radio_panels,
            self.options.panel_disabled_color,
            self.options.panel_enabled_color,
            panel_level,
        );

        let x_count = self.canvas.icicles.x_count();
        let y_count = self.canvas.icicles.y_count();
        let levels = column_levels(audio_bins, x_count);
        let row = (0..x_count)
            .map(|x| self.apply_noise_floor(mirrored_level(&levels, x)))
            .collect();
        self.rows.push_front(row);
        self.rows.truncate(y_count);

        let mut frame = cleared_frame(&mut self.canvas, Color::default());
        for (age, row) in self.rows.iter().enumerate() {
            let y = match self.options.direction {
                WaveDirection::Down => age,
                WaveDirection::Up => y_count - 1 - age,
            };
            for (x, level) in row.iter().enumerate() {
                frame.pixels[self.canvas.icicles.pixel_index(x, y)] = Color::linear_blend(
                    self.options.panel_disabled_color,
                    self.options.panel_enabled_color,
                    *level,
                );
            }
        }

        AnimationView::new(frame, radio_panels)
    }

    fn apply_noise_floor(&self, level: f32) -> f32 {
        match self.options.noise_floor {
            Some(floor) => (level - floor).max(0.0),
            None => level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loud_bins() -> Vec<u8> {
        vec![255; 16]
    }

    #[test]
    fn rows_scroll_down_from_the_top() {
        let header = Header::new("wave", 2, 3, 1);
        let mut codec = WaveCodec::new(&header, WaveOptions::default());

        let first = codec.animate(&loud_bins(), 0.0);
        assert_eq!(first.frame.pixels[0], colors::RED);
        assert_eq!(first.frame.pixels[1], colors::BLACK);

        codec.animate(&[0; 16], 0.0);
        let third = codec.animate(&[0; 16], 0.0);
        // The loud row is now the oldest one at the bottom of both columns.
        assert_eq!(third.frame.pixels[2], colors::RED);
        assert_eq!(third.frame.pixels[5], colors::RED);
        assert_eq!(third.frame.pixels[0], colors::BLACK);

        let fourth = codec.animate(&[0; 16], 0.0);
        assert!(fourth.frame.pixels.iter().all(|pixel| *pixel == colors::BLACK));
    }

    #[test]
    fn rows_scroll_up_from_the_bottom() {
        let header = Header::new("wave", 2, 3, 1);
        let options = WaveOptions {
            direction: WaveDirection::Up,
            ..WaveOptions::default()
        };
        let mut codec = WaveCodec::new(&header, options);
        let view = codec.animate(&loud_bins(), 0.0);
        assert_eq!(view.frame.pixels[2], colors::RED);
        assert_eq!(view.frame.pixels[0], colors::BLACK);
    }

    #[test]
    fn noise_floor_drops_quiet_bands() {
        let header = Header::new("wave", 2, 2, 0);
        let mut codec = WaveCodec::new(&header, WaveOptions::cutoff());
        // Level 0.6 sits under the 0.8 floor.
        let quiet = codec.animate(&[153; 16], 0.0);
        assert_eq!(quiet.frame.pixels[0], colors::BLACK);
        // Level 230/255 keeps only what exceeds the floor, about 0.102.
        let loud = codec.animate(&[230; 16], 0.0);
        assert_eq!(loud.frame.pixels[0], Color::new(26, 0, 0));
        let full = codec.animate(&loud_bins(), 0.0);
        assert_eq!(full.frame.pixels[0], Color::new(51, 0, 0));
        assert!((codec.apply_noise_floor(0.9) - 0.1).abs() < 1e-4);
        assert_eq!(codec.apply_noise_floor(0.5), 0.0);
    }
}
