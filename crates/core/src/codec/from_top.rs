use super::{blend_panels, cleared_frame, Canvas};
use crate::{
    colors,
    level::{LevelTransformer, CLASSIC_THRESHOLD, CODEC_THRESHOLD},
    spectrum::{column_levels, mirrored_level},
    AnimationView, Color, Header,
};

#[derive(Debug, Clone, PartialEq)]
pub struct FromTopOptions {
    pub panel_disabled_color: Color,
    pub panel_enabled_color: Color,
    /// Bar color at level 0. `None` reuses `panel_disabled_color`.
    pub bar_low_color: Option<Color>,
    /// Bar color at level 1. `None` reuses `panel_enabled_color`.
    pub bar_high_color: Option<Color>,
    pub threshold: f32,
    pub smoothing_time_constant: f32,
}

impl Default for FromTopOptions {
    fn default() -> Self {
        Self {
            panel_disabled_color: colors::BLACK,
            panel_enabled_color: colors::WHITE,
            bar_low_color: None,
            bar_high_color: None,
            threshold: CODEC_THRESHOLD,
            smoothing_time_constant: 0.35,
        }
    }
}

impl FromTopOptions {
    /// Orange panels and red-to-blue bars, the stock music rendering.
    pub fn classic() -> Self {
        Self {
            panel_disabled_color: Color::linear_blend(colors::BLACK, colors::ORANGE, 0.1),
            panel_enabled_color: colors::ORANGE,
            bar_low_color: Some(colors::RED),
            bar_high_color: Some(colors::BLUE),
            threshold: CLASSIC_THRESHOLD,
            smoothing_time_constant: 0.4,
        }
    }
}

/// Bars hanging from the top of each icicle, as long as the column level.
#[derive(Debug, Clone)]
pub struct FromTopCodec {
    pub(super) canvas: Canvas,
    options: FromTopOptions,
    level: LevelTransformer,
}

impl FromTopCodec {
    pub fn new(header: &Header, options: FromTopOptions) -> Self {
        Self {
            canvas: Canvas::new(header),
            level: LevelTransformer::new(options.threshold),
            options,
        }
    }

    pub fn options(&self) -> &FromTopOptions {
        &self.options
    }

    pub fn smoothing_time_constant(&self) -> f32 {
        self.options.smoothing_time_constant
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

        let bar_low = self.options.bar_low_color.unwrap_or(self.options.panel_disabled_color);
        let bar_high = self.options.bar_high_color.unwrap_or(self.options.panel_enabled_color);

        let mut frame = cleared_frame(&mut self.canvas, Color::default());
        for x in 0..x_count {
            let level = mirrored_level(&levels, x);
            let lit = ((level * y_count as f32).ceil() as usize).min(y_count);
            let color = Color::linear_blend(bar_low, bar_high, level);
            for y in 0..lit {
                frame.pixels[self.canvas.icicles.pixel_index(x, y)] = color;
            }
        }

        AnimationView::new(frame, radio_panels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_renders_background_and_disabled_panels() {
        let header = Header::new("silence", 20, 30, 2);
        let mut codec = FromTopCodec::new(&header, FromTopOptions::default());
        let view = codec.animate(&[0; 128], 0.0);

        assert!(view.frame.pixels.iter().all(|pixel| *pixel == Color::default()));
        assert!(view
            .radio_panels
            .iter()
            .all(|panel| panel.color == codec.options().panel_disabled_color));
        let indexes: Vec<u32> = view.radio_panels.iter().map(|panel| panel.index).collect();
        assert_eq!(indexes, vec![1, 2]);
    }

    #[test]
    fn bar_length_follows_mirrored_level() {
        let header = Header::new("bars", 4, 10, 1);
        let mut codec = FromTopCodec::new(&header, FromTopOptions::default());
        // 16 bins, 4 columns: two bins per level, levels [1.0, 0.5, 0, 0].
        let mut bins = [0u8; 16];
        bins[0] = 255;
        bins[1] = 255;
        bins[2] = 255;
        let view = codec.animate(&bins, 0.0);

        let lit = |x: usize| {
            (0..10)
                .filter(|&y| view.frame.pixels[x * 10 + y] != Color::default())
                .count()
        };
        // half = 2: columns 1 and 2 read levels[0], columns 0 and 3 read levels[1].
        assert_eq!(lit(1), 10);
        assert_eq!(lit(2), 10);
        assert_eq!(lit(0), 5);
        assert_eq!(lit(3), 5);
        assert_eq!(view.frame.pixels[10], colors::WHITE);
        assert_eq!(view.frame.pixels[0], Color::new(128, 128, 128));
    }

    #[test]
    fn bars_follow_custom_panel_colors_unless_overridden() {
        let header = Header::new("tinted", 2, 4, 1);
        let options = FromTopOptions {
            panel_disabled_color: colors::RED,
            panel_enabled_color: colors::BLUE,
            ..FromTopOptions::default()
        };
        let mut codec = FromTopCodec::new(&header, options.clone());
        let view = codec.animate(&[255; 8], 0.0);
        assert_eq!(view.frame.pixels[0], colors::BLUE);

        let mut codec = FromTopCodec::new(
            &header,
            FromTopOptions {
                bar_high_color: Some(colors::WHITE),
                ..options
            },
        );
        let view = codec.animate(&[255; 8], 0.0);
        assert_eq!(view.frame.pixels[0], colors::WHITE);
    }

    #[test]
    fn panels_follow_base_level_envelope() {
        let header = Header::new("panels", 2, 2, 3);
        let mut codec = FromTopCodec::new(&header, FromTopOptions::default());
        assert_eq!(codec.animate(&[], 0.9).radio_panels[0].color, colors::WHITE);
        let decayed = codec.animate(&[], 0.0).radio_panels[2].color;
        assert_eq!(decayed, Color::new(191, 191, 191));
    }
}
