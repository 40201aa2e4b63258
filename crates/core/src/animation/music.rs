use std::fmt;

use super::Pull;
use crate::{
    analysis::FrequencyAnalyser,
    audio::AudioSignal,
    codec::{Codec, CodecKind},
    config::AppConfig,
    spectrum::SpectrumPreprocessor,
    AnimationView, Header, Result,
};

/// Exponent applied to the spectrum multiplier before it becomes the base
/// level handed to the codec.
const BASE_LEVEL_EXPONENT: f64 = 0.8;

/// Where a music animation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicState {
    /// Nothing acquired yet; the next pull loads the pipeline.
    Unloaded,
    /// Pipeline loaded, playback not requested yet.
    Buffering,
    /// Playback requested, waiting for the signal to confirm.
    AwaitingStart,
    Producing,
    /// The signal failed to start; only blank views are produced.
    Degraded,
    Ended,
}

/// Analysers and scratch buffers that exist only while audio is live.
struct AudioPipeline {
    base: FrequencyAnalyser,
    spectrum: FrequencyAnalyser,
    base_window: Vec<f32>,
    spectrum_window: Vec<f32>,
    base_bins: Vec<u8>,
    audio_bins: Vec<u8>,
}

impl AudioPipeline {
    fn acquire(config: &AppConfig, codec_smoothing: f32) -> Result<Self> {
        let base = FrequencyAnalyser::new(config.base_analyser.clone())?;
        let mut spectrum = FrequencyAnalyser::new(config.spectrum_analyser.clone())?;
        spectrum.set_smoothing(codec_smoothing);
        Ok(Self {
            base_window: vec![0.0; base.fft_size()],
            spectrum_window: vec![0.0; spectrum.fft_size()],
            base_bins: vec![0; base.frequency_bin_count()],
            audio_bins: vec![0; spectrum.frequency_bin_count()],
            base,
            spectrum,
        })
    }
}

/// Frames rendered live from an audio signal through a codec.
pub struct MusicAnimation {
    header: Header,
    config: AppConfig,
    signal: Box<dyn AudioSignal>,
    codec: Codec,
    preprocessor: SpectrumPreprocessor,
    pipeline: Option<AudioPipeline>,
    state: MusicState,
}

impl MusicAnimation {
    /// Music animation on the grid from `config.music`, rendered with the
    /// classic codec.
    pub fn new(signal: Box<dyn AudioSignal>, config: AppConfig) -> Self {
        let header = config.music.header(signal.name());
        let mut codec = Codec::build(CodecKind::Classic, &header);
        codec.set_frame_duration(config.music.frame_duration());
        Self {
            preprocessor: SpectrumPreprocessor::new(config.spectrum.clone()),
            header,
            config,
            signal,
            codec,
            pipeline: None,
            state: MusicState::Unloaded,
        }
    }

    pub fn with_codec(mut self, kind: CodecKind) -> Self {
        let mut codec = Codec::build(kind, &self.header);
        codec.set_frame_duration(self.config.music.frame_duration());
        self.codec = codec;
        self
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn state(&self) -> MusicState {
        self.state
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn signal(&self) -> &dyn AudioSignal {
        self.signal.as_ref()
    }

    /// Smoothing currently applied by the live spectrum analyser.
    pub fn live_smoothing(&self) -> Option<f32> {
        self.pipeline.as_ref().map(|pipeline| pipeline.spectrum.smoothing())
    }

    /// Swaps the codec. A live spectrum analyser picks up the new codec's
    /// smoothing before the next pull.
    pub fn set_codec(&mut self, mut codec: Codec) -> Result<()> {
        codec.ensure_fits(&self.header)?;
        codec.set_frame_duration(self.config.music.frame_duration());
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.spectrum.set_smoothing(codec.smoothing_time_constant());
        }
        self.codec = codec;
        Ok(())
    }

    /// Rewinds to the unloaded state, releasing anything live.
    pub fn play(&mut self) {
        self.dispose();
    }

    pub fn pull_next(&mut self) -> Pull {
        match self.state {
            MusicState::Unloaded => {
                self.acquire();
                Pull::Frame(self.blank())
            }
            MusicState::Buffering => match self.signal.start() {
                Ok(()) if self.signal.is_started() => {
                    self.state = MusicState::Producing;
                    self.produce()
                }
                Ok(()) => {
                    self.state = MusicState::AwaitingStart;
                    Pull::Frame(self.blank())
                }
                Err(err) => {
                    tracing::warn!(name = %self.header.name, error = %err, "music animation degraded to blank frames");
                    self.state = MusicState::Degraded;
                    Pull::Frame(self.blank())
                }
            },
            MusicState::AwaitingStart => {
                if self.signal.is_started() {
                    self.state = MusicState::Producing;
                    self.produce()
                } else {
                    Pull::Frame(self.blank())
                }
            }
            MusicState::Producing => self.produce(),
            MusicState::Degraded => Pull::Frame(self.blank()),
            MusicState::Ended => Pull::Ended,
        }
    }

    /// Releases the audio pipeline and stops the signal. Idempotent.
    pub fn dispose(&mut self) {
        if self.pipeline.take().is_some() {
            tracing::debug!(name = %self.header.name, "audio pipeline released");
        }
        self.signal.stop();
        self.state = MusicState::Unloaded;
    }

    pub fn progress(&self) -> f64 {
        let duration = self.signal.duration();
        if duration > 0.0 {
            (self.signal.position() / duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn set_progress(&mut self, progress: f64) {
        let duration = self.signal.duration();
        self.signal.seek(duration * progress.clamp(0.0, 1.0));
    }

    fn acquire(&mut self) {
        let acquired = self
            .signal
            .load()
            .and_then(|()| AudioPipeline::acquire(&self.config, self.codec.smoothing_time_constant()));
        match acquired {
            Ok(pipeline) => {
                tracing::info!(name = %self.header.name, "audio pipeline acquired");
                self.pipeline = Some(pipeline);
                self.state = MusicState::Buffering;
            }
            Err(err) => {
                tracing::warn!(name = %self.header.name, error = %err, "audio pipeline unavailable");
                self.state = MusicState::Degraded;
            }
        }
    }

    fn produce(&mut self) -> Pull {
        if self.signal.is_ended() {
            self.dispose();
            self.state = MusicState::Ended;
            return Pull::Ended;
        }

        let Some(pipeline) = self.pipeline.as_mut() else {
            return Pull::Frame(self.blank());
        };

        self.signal.fill_window(&mut pipeline.base_window);
        self.signal.fill_window(&mut pipeline.spectrum_window);
        let analysed = pipeline
            .base
            .byte_frequency_data(&pipeline.base_window, &mut pipeline.base_bins)
            .and_then(|()| {
                pipeline
                    .spectrum
                    .byte_frequency_data(&pipeline.spectrum_window, &mut pipeline.audio_bins)
            });
        if let Err(err) = analysed {
            tracing::warn!(name = %self.header.name, error = %err, "frequency analysis failed");
            return Pull::Frame(self.blank());
        }

        let spectrum = self.preprocessor.transform(&pipeline.base_bins);
        let base_level = self
            .preprocessor
            .multiplier(&spectrum)
            .max(0.0)
            .powf(BASE_LEVEL_EXPONENT) as f32;

        Pull::Frame(self.codec.animate(&pipeline.audio_bins, base_level))
    }

    fn blank(&self) -> AnimationView {
        AnimationView::blank_for(&self.header, self.config.music.frame_duration())
    }
}

impl fmt::Debug for MusicAnimation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MusicAnimation")
            .field("header", &self.header)
            .field("state", &self.state)
            .field("codec", &self.codec)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{f32::consts::PI, rc::Rc, time::Duration};

    use super::*;
    use crate::{audio::PcmSignal, timeline::ManualClock, Color};

    const RATE: u32 = 8_000;

    fn tone(seconds: f32) -> Vec<f32> {
        (0..(seconds * RATE as f32) as usize)
            .map(|n| (2.0 * PI * 440.0 * n as f32 / RATE as f32).sin())
            .collect()
    }

    fn music(clock: &ManualClock, samples: Vec<f32>, latency_ms: u64) -> MusicAnimation {
        let signal = PcmSignal::new("song.wav", samples, RATE, Rc::new(clock.clone()))
            .with_start_latency(Duration::from_millis(latency_ms));
        MusicAnimation::new(Box::new(signal), AppConfig::default())
    }

    fn is_blank(pull: &Pull) -> bool {
        match pull {
            Pull::Frame(view) => {
                view.frame.pixels.iter().all(|pixel| *pixel == Color::default())
                    && view.radio_panels.iter().all(|panel| panel.color == Color::default())
            }
            Pull::Ended => false,
        }
    }

    #[test]
    fn yields_grace_frames_until_playback_confirms() {
        let clock = ManualClock::new();
        let mut animation = music(&clock, tone(1.0), 30);
        assert_eq!(animation.header().pixels_count(), 600);

        assert!(is_blank(&animation.pull_next()));
        assert_eq!(animation.state(), MusicState::Buffering);

        assert!(is_blank(&animation.pull_next()));
        assert_eq!(animation.state(), MusicState::AwaitingStart);

        clock.advance(Duration::from_millis(20));
        assert!(is_blank(&animation.pull_next()));
        assert_eq!(animation.state(), MusicState::AwaitingStart);

        clock.advance(Duration::from_millis(20));
        let pull = animation.pull_next();
        assert_eq!(animation.state(), MusicState::Producing);
        let view = pull.into_view().unwrap();
        assert_eq!(view.frame.pixels.len(), 600);
        assert_eq!(view.radio_panels.len(), 2);
        assert_eq!(view.frame.duration, Duration::from_millis(20));
    }

    #[test]
    fn ends_and_releases_when_signal_ends() {
        let clock = ManualClock::new();
        let mut animation = music(&clock, tone(0.1), 0);
        animation.pull_next();
        assert!(animation.live_smoothing().is_some());
        animation.pull_next();
        assert_eq!(animation.state(), MusicState::Producing);

        clock.advance(Duration::from_millis(200));
        assert_eq!(animation.pull_next(), Pull::Ended);
        assert_eq!(animation.state(), MusicState::Ended);
        assert!(animation.live_smoothing().is_none());
        assert!(!animation.signal().is_started());
        assert_eq!(animation.pull_next(), Pull::Ended);

        animation.play();
        assert_eq!(animation.state(), MusicState::Unloaded);
        assert!(is_blank(&animation.pull_next()));
    }

    #[test]
    fn failed_start_degrades_to_blank_frames() {
        let clock = ManualClock::new();
        let mut animation = music(&clock, Vec::new(), 0);
        animation.pull_next();
        for _ in 0..3 {
            assert!(is_blank(&animation.pull_next()));
        }
        assert_eq!(animation.state(), MusicState::Degraded);
    }

    #[test]
    fn set_codec_retunes_live_analyser() {
        let clock = ManualClock::new();
        let mut animation = music(&clock, tone(1.0), 0).with_codec(CodecKind::FromTop);
        animation.pull_next();
        assert_eq!(animation.live_smoothing(), Some(0.35));

        let header = animation.header().clone();
        animation
            .set_codec(Codec::build(CodecKind::MusicWave, &header))
            .unwrap();
        assert_eq!(animation.live_smoothing(), Some(0.0));

        let foreign = Codec::build(CodecKind::Wave, &Header::new("other", 3, 3, 1));
        assert!(animation.set_codec(foreign).is_err());
        assert_eq!(animation.codec().smoothing_time_constant(), 0.0);
    }

    #[test]
    fn dispose_is_idempotent() {
        let clock = ManualClock::new();
        let mut animation = music(&clock, tone(1.0), 0);
        animation.dispose();
        animation.pull_next();
        animation.dispose();
        animation.dispose();
        assert_eq!(animation.state(), MusicState::Unloaded);
        assert!(animation.live_smoothing().is_none());
    }

    #[test]
    fn progress_tracks_signal_position() {
        let clock = ManualClock::new();
        let mut animation = music(&clock, tone(2.0), 0);
        animation.pull_next();
        animation.pull_next();
        clock.advance(Duration::from_millis(500));
        assert!((animation.progress() - 0.25).abs() < 1e-6);

        animation.set_progress(0.5);
        assert!((animation.progress() - 0.5).abs() < 1e-6);
    }
}
