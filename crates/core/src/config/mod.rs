use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{Header, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub player: PlayerConfig,
    pub music: MusicConfig,
    pub base_analyser: AnalyserConfig,
    pub spectrum_analyser: AnalyserConfig,
    pub spectrum: SpectrumConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            player: PlayerConfig::default(),
            music: MusicConfig::default(),
            base_analyser: AnalyserConfig::base_level(),
            spectrum_analyser: AnalyserConfig::spectrum(),
            spectrum: SpectrumConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing sections keep their defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that would break frame encoding.
    pub fn validate(&self) -> Result<()> {
        self.music.header("config").validate()?;
        let fallback = Header::new(
            "fallback",
            self.player.fallback_x_count,
            self.player.fallback_y_count,
            self.player.fallback_radio_panels_count,
        );
        fallback.validate()
    }
}

/// How the player schedules the next pull.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacingMode {
    /// Next deadline is measured from the moment the frame was handled, so
    /// timer latency accumulates.
    #[default]
    Relaxed,
    /// Next deadline is measured from the previous deadline.
    Compensated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub pacing: PacingMode,
    /// Duration declared by the blank view emitted on stop.
    pub blank_frame_ms: u64,
    /// Grid used for the blank view while nothing is loaded.
    pub fallback_x_count: u32,
    pub fallback_y_count: u32,
    pub fallback_radio_panels_count: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            pacing: PacingMode::Relaxed,
            blank_frame_ms: 16,
            fallback_x_count: 20,
            fallback_y_count: 30,
            fallback_radio_panels_count: 2,
        }
    }
}

impl PlayerConfig {
    pub fn blank_frame_duration(&self) -> Duration {
        Duration::from_millis(self.blank_frame_ms)
    }
}

/// Grid and frame rate of audio-driven animations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicConfig {
    pub x_count: u32,
    pub y_count: u32,
    pub radio_panels_count: u32,
    pub frame_ms: u64,
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            x_count: 20,
            y_count: 30,
            radio_panels_count: 2,
            frame_ms: 20,
        }
    }
}

impl MusicConfig {
    pub fn header(&self, name: impl Into<String>) -> Header {
        Header::new(name, self.x_count, self.y_count, self.radio_panels_count)
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_millis(self.frame_ms)
    }
}

/// Tuning of one frequency analyser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyserConfig {
    pub fft_size: usize,
    pub smoothing: f32,
    pub min_db: f32,
    pub max_db: f32,
}

impl AnalyserConfig {
    /// Large analyser feeding the base level detection.
    pub fn base_level() -> Self {
        Self {
            fft_size: 16_384,
            smoothing: 0.1,
            min_db: -40.0,
            max_db: -30.0,
        }
    }

    /// Small analyser feeding the codec spectrum.
    pub fn spectrum() -> Self {
        Self {
            fft_size: 256,
            smoothing: 0.4,
            min_db: -100.0,
            max_db: -30.0,
        }
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self::spectrum()
    }
}

/// Band selection and smoothing of the base level spectrum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumConfig {
    pub start_bin: usize,
    pub keep_bins: usize,
    pub smoothing_points: usize,
    pub smoothing_passes: usize,
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            start_bin: 8,
            keep_bins: 40,
            smoothing_points: 3,
            smoothing_passes: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{"player":{"pacing":"compensated"},"music":{"x_count":8}}"#,
        )
        .unwrap();

        assert_eq!(config.player.pacing, PacingMode::Compensated);
        assert_eq!(config.player.blank_frame_ms, 16);
        assert_eq!(config.music.x_count, 8);
        assert_eq!(config.music.y_count, 30);
        assert_eq!(config.spectrum, SpectrumConfig::default());
        assert_eq!(config.base_analyser, AnalyserConfig::base_level());
    }

    #[test]
    fn rejects_unaddressable_panel_counts() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());
        config.music.radio_panels_count = 1000;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.player.fallback_radio_panels_count = 256;
        assert!(config.validate().is_err());
    }

    #[test]
    fn analyser_presets_differ() {
        assert_eq!(AnalyserConfig::base_level().frequency_bin_count(), 8192);
        assert_eq!(AnalyserConfig::spectrum().frequency_bin_count(), 128);
    }
}
