use std::f32::consts::PI;

use super::{blend_panels, cleared_frame, Canvas};
use crate::{
    colors,
    level::{LevelTransformer, CODEC_THRESHOLD},
    AnimationView, Color, Header,
};

const MIN_WAVE_FREQUENCY: f32 = PI / 8.0;
const MAX_WAVE_FREQUENCY: f32 = PI * 4.0;

#[derive(Debug, Clone, PartialEq)]
pub struct MusicWaveOptions {
    pub wave_color: Color,
    pub background_color: Color,
    pub panel_disabled_color: Color,
    pub panel_enabled_color: Color,
    pub threshold: f32,
    /// Gain applied to the loudest bin before it is capped at 1.
    pub amplitude_scale: f32,
    /// Phase added after every frame.
    pub phase_step: f32,
}

impl Default for MusicWaveOptions {
    fn default() -> Self {
        Self {
            wave_color: colors::BLUE,
            background_color: colors::BLACK,
            panel_disabled_color: colors::BLACK,
            panel_enabled_color: colors::RED,
            threshold: CODEC_THRESHOLD,
            amplitude_scale: 1.5,
            phase_step: 0.1,
        }
    }
}

/// A single sine wave across the columns. Loudness sets its height, the
/// spectral centroid sets how many periods fit on the grid, and the phase
/// keeps moving on its own.
#[derive(Debug, Clone)]
pub struct MusicWaveCodec {
    pub(super) canvas: Canvas,
    options: MusicWaveOptions,
    level: LevelTransformer,
    phase: f32,
}

impl MusicWaveCodec {
    pub fn new(header: &Header, options: MusicWaveOptions) -> Self {
        Self {
            canvas: Canvas::new(header),
            level: LevelTransformer::new(options.threshold),
            options,
            phase: 0.0,
        }
    }

    pub fn options(&self) -> &MusicWaveOptions {
        &self.options
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn smoothing_time_constant(&self) -> f32 {
        0.0
    }

    pub fn animate(&mut self, audio_bins: &[u8], base_level: f32) -> AnimationView {
        let mut frame = cleared_frame(&mut self.canvas, self.options.background_color);

        let panel_level = self.level.transform(base_level);
        let radio_panels = blend_panels(
            &self.canvas.radio_panels,
            self.options.panel_disabled_color,
            self.options.panel_enabled_color,
            panel_level,
        );

        let x_count = self.canvas.icicles.x_count();
        let y_count = self.canvas.icicles.y_count();
        let center = y_count.saturating_sub(1) as f32 / 2.0;
        let wave_amplitude = peak_amplitude(audio_bins, self.options.amplitude_scale) * center;
        let wave_frequency = MIN_WAVE_FREQUENCY
            + (MAX_WAVE_FREQUENCY - MIN_WAVE_FREQUENCY) * normalized_centroid(audio_bins);

        for x in 0..x_count {
            let angle = wave_frequency * (x as f32 / x_count as f32) * 2.0 * PI + self.phase;
            let y = (wave_amplitude * angle.sin() + center).round();
            if y >= 0.0 && (y as usize) < y_count {
                frame.pixels[self.canvas.icicles.pixel_index(x, y as usize)] = self.options.wave_color;
            }
        }

        self.phase += self.options.phase_step;

        AnimationView::new(frame, radio_panels)
    }
}

/// Loudest bin scaled by `scale`, capped at 1. Empty input is silent.
fn peak_amplitude(bins: &[u8], scale: f32) -> f32 {
    let peak = bins.iter().copied().max().unwrap_or(0);
    (peak as f32 / 255.0 * scale).min(1.0)
}

/// Magnitude-weighted mean bin index divided by the bin count, in `[0, 1)`.
/// Silence maps to 0.
fn normalized_centroid(bins: &[u8]) -> f32 {
    let mut frequency_sum = 0.0f32;
    let mut amplitude_sum = 0.0f32;
    for (index, &bin) in bins.iter().enumerate() {
        let value = bin as f32 / 255.0;
        frequency_sum += value * index as f32;
        amplitude_sum += value;
    }
    if amplitude_sum == 0.0 {
        return 0.0;
    }
    frequency_sum / amplitude_sum / bins.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_draws_a_flat_line() {
        let header = Header::new("wave", 8, 5, 1);
        let mut codec = MusicWaveCodec::new(&header, MusicWaveOptions::default());
        let view = codec.animate(&[0; 64], 0.0);

        for x in 0..8 {
            for y in 0..5 {
                let expected = if y == 2 { colors::BLUE } else { colors::BLACK };
                assert_eq!(view.frame.pixels[x * 5 + y], expected, "({x}, {y})");
            }
        }
        assert_eq!(view.radio_panels[0].color, colors::BLACK);
    }

    #[test]
    fn phase_advances_every_frame() {
        let header = Header::new("wave", 4, 4, 0);
        let mut codec = MusicWaveCodec::new(&header, MusicWaveOptions::default());
        codec.animate(&[], 0.0);
        codec.animate(&[10; 8], 0.0);
        assert!((codec.phase() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn one_pixel_per_column_when_loud() {
        let header = Header::new("wave", 10, 9, 0);
        let mut codec = MusicWaveCodec::new(&header, MusicWaveOptions::default());
        let view = codec.animate(&[255; 32], 0.0);
        for x in 0..10 {
            let lit = (0..9)
                .filter(|&y| view.frame.pixels[x * 9 + y] == colors::BLUE)
                .count();
            assert_eq!(lit, 1, "column {x}");
        }
    }

    #[test]
    fn centroid_guards_silence() {
        assert_eq!(normalized_centroid(&[]), 0.0);
        assert_eq!(normalized_centroid(&[0; 16]), 0.0);
        let centroid = normalized_centroid(&[0, 0, 0, 255]);
        assert!((centroid - 0.75).abs() < 1e-6);
        assert_eq!(peak_amplitude(&[], 1.5), 0.0);
        assert_eq!(peak_amplitude(&[200], 1.5), 1.0);
    }
}
