//! Codecs turn one spectrum snapshot and a base level into an
//! [`AnimationView`].
//!
//! Every codec owns its frame buffer, panel list and [`LevelTransformer`], and
//! is bound to the header it was built for. Rendering always starts from a
//! fully cleared grid.

mod from_top;
mod music_wave;
mod wave;

use std::{fmt, str::FromStr, time::Duration};

pub use from_top::{FromTopCodec, FromTopOptions};
pub use music_wave::{MusicWaveCodec, MusicWaveOptions};
pub use wave::{WaveCodec, WaveDirection, WaveOptions};

use crate::{AnimationView, Color, Header, Icicles, IciclesError, RadioPanelView, VisualFrame};

/// Display duration of codec frames unless overridden.
pub const MIN_FRAME_DURATION: Duration = Duration::from_millis(20);

/// Closed set of codecs, dispatched by value.
#[derive(Debug, Clone)]
pub enum Codec {
    FromTop(FromTopCodec),
    Wave(WaveCodec),
    MusicWave(MusicWaveCodec),
}

impl Codec {
    /// Builds the codec selected by `kind` for an animation with `header`.
    pub fn build(kind: CodecKind, header: &Header) -> Self {
        match kind {
            CodecKind::Classic => Codec::FromTop(FromTopCodec::new(header, FromTopOptions::classic())),
            CodecKind::FromTop => Codec::FromTop(FromTopCodec::new(header, FromTopOptions::default())),
            CodecKind::Wave => Codec::Wave(WaveCodec::new(header, WaveOptions::default())),
            CodecKind::WaveUp => Codec::Wave(WaveCodec::new(
                header,
                WaveOptions {
                    direction: WaveDirection::Up,
                    ..WaveOptions::default()
                },
            )),
            CodecKind::WaveCutoff => Codec::Wave(WaveCodec::new(header, WaveOptions::cutoff())),
            CodecKind::MusicWave => {
                Codec::MusicWave(MusicWaveCodec::new(header, MusicWaveOptions::default()))
            }
        }
    }

    /// Smoothing the spectrum analyser should use while this codec renders.
    pub fn smoothing_time_constant(&self) -> f32 {
        match self {
            Codec::FromTop(codec) => codec.smoothing_time_constant(),
            Codec::Wave(codec) => codec.smoothing_time_constant(),
            Codec::MusicWave(codec) => codec.smoothing_time_constant(),
        }
    }

    pub fn animate(&mut self, audio_bins: &[u8], base_level: f32) -> AnimationView {
        match self {
            Codec::FromTop(codec) => codec.animate(audio_bins, base_level),
            Codec::Wave(codec) => codec.animate(audio_bins, base_level),
            Codec::MusicWave(codec) => codec.animate(audio_bins, base_level),
        }
    }

    pub fn set_frame_duration(&mut self, duration: Duration) {
        self.canvas_mut().frame_duration = duration;
    }

    /// Grid and panel counts the codec renders for.
    pub fn dimensions(&self) -> (usize, usize, usize) {
        let canvas = self.canvas();
        (
            canvas.icicles.x_count(),
            canvas.icicles.y_count(),
            canvas.radio_panels.len(),
        )
    }

    /// Fails unless the codec was built for a grid shaped like `header`.
    pub fn ensure_fits(&self, header: &Header) -> crate::Result<()> {
        let expected = (
            header.x_count as usize,
            header.y_count as usize,
            header.panels_count(),
        );
        if self.dimensions() == expected {
            Ok(())
        } else {
            Err(IciclesError::InvalidInput(
                "codec was built for a different grid or panel count",
            ))
        }
    }

    fn canvas(&self) -> &Canvas {
        match self {
            Codec::FromTop(codec) => &codec.canvas,
            Codec::Wave(codec) => &codec.canvas,
            Codec::MusicWave(codec) => &codec.canvas,
        }
    }

    fn canvas_mut(&mut self) -> &mut Canvas {
        match self {
            Codec::FromTop(codec) => &mut codec.canvas,
            Codec::Wave(codec) => &mut codec.canvas,
            Codec::MusicWave(codec) => &mut codec.canvas,
        }
    }
}

/// Named codec configurations selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodecKind {
    #[default]
    Classic,
    FromTop,
    Wave,
    WaveUp,
    WaveCutoff,
    MusicWave,
}

impl CodecKind {
    pub const ALL: [CodecKind; 6] = [
        CodecKind::Classic,
        CodecKind::FromTop,
        CodecKind::Wave,
        CodecKind::WaveUp,
        CodecKind::WaveCutoff,
        CodecKind::MusicWave,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CodecKind::Classic => "classic",
            CodecKind::FromTop => "from-top",
            CodecKind::Wave => "wave",
            CodecKind::WaveUp => "wave-up",
            CodecKind::WaveCutoff => "wave-cutoff",
            CodecKind::MusicWave => "music-wave",
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CodecKind {
    type Err = IciclesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CodecKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| IciclesError::msg(format!("unknown codec `{s}`")))
    }
}

/// Drawing state shared by every codec variant.
#[derive(Debug, Clone)]
pub(crate) struct Canvas {
    pub(crate) icicles: Icicles,
    pub(crate) radio_panels: Vec<RadioPanelView>,
    pub(crate) frame_duration: Duration,
}

impl Canvas {
    pub(crate) fn new(header: &Header) -> Self {
        Self {
            icicles: Icicles::new(header),
            radio_panels: RadioPanelView::all(header.panels_count(), Color::default()),
            frame_duration: MIN_FRAME_DURATION,
        }
    }
}

/// Every panel set to the blend of `disabled` and `enabled` at `level`.
pub(crate) fn blend_panels(
    panels: &[RadioPanelView],
    disabled: Color,
    enabled: Color,
    level: f32,
) -> Vec<RadioPanelView> {
    let color = Color::linear_blend(disabled, enabled, level);
    panels.iter().map(|panel| panel.with_color(color)).collect()
}

/// Resets the grid to `background` and returns a frame to draw into.
pub(crate) fn cleared_frame(canvas: &mut Canvas, background: Color) -> VisualFrame {
    canvas.icicles.set_all_pixels_color(background);
    canvas.icicles.to_frame(canvas.frame_duration)
}
