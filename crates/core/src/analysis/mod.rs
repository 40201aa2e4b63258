use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{config::AnalyserConfig, IciclesError, Result};

const MIN_FFT_SIZE: usize = 32;
const MAX_FFT_SIZE: usize = 32_768;
const BLACKMAN_ALPHA: f32 = 0.16;

/// Byte spectrum of the most recent audio, computed the way a browser
/// analyser node does it: Blackman window, FFT, magnitude over `fft_size`,
/// exponential smoothing across calls, then decibels mapped linearly from
/// `[min_db, max_db]` onto `0..=255`.
pub struct FrequencyAnalyser {
    config: AnalyserConfig,
    fft: FftResources,
    window: Vec<f32>,
    smoothed: Vec<f32>,
}

impl FrequencyAnalyser {
    pub fn new(config: AnalyserConfig) -> Result<Self> {
        let size = config.fft_size;
        if !size.is_power_of_two() || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&size) {
            return Err(IciclesError::InvalidInput(
                "fft size must be a power of two between 32 and 32768",
            ));
        }
        if config.max_db <= config.min_db {
            return Err(IciclesError::InvalidInput(
                "analyser max_db must be greater than min_db",
            ));
        }

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);
        let fft = FftResources {
            input: plan.make_input_vec(),
            spectrum: plan.make_output_vec(),
            scratch: plan.make_scratch_vec(),
            plan,
        };

        let mut config = config;
        config.smoothing = config.smoothing.clamp(0.0, 1.0);

        Ok(Self {
            window: (0..size).map(|index| blackman_value(index, size)).collect(),
            smoothed: vec![0.0; size / 2],
            fft,
            config,
        })
    }

    pub fn config(&self) -> &AnalyserConfig {
        &self.config
    }

    pub fn fft_size(&self) -> usize {
        self.config.fft_size
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.config.frequency_bin_count()
    }

    pub fn smoothing(&self) -> f32 {
        self.config.smoothing
    }

    /// Changes the temporal smoothing of a live analyser. Takes effect on the
    /// next call to [`FrequencyAnalyser::byte_frequency_data`].
    pub fn set_smoothing(&mut self, smoothing: f32) {
        self.config.smoothing = smoothing.clamp(0.0, 1.0);
    }

    /// Forgets the smoothing history.
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
    }

    /// Analyses the last `fft_size` samples of `samples` (left-padded with
    /// silence when shorter) and writes up to `frequency_bin_count` bytes
    /// into `out`.
    pub fn byte_frequency_data(&mut self, samples: &[f32], out: &mut [u8]) -> Result<()> {
        let size = self.config.fft_size;
        let tail = &samples[samples.len().saturating_sub(size)..];
        let pad = size - tail.len();

        let input = &mut self.fft.input;
        input[..pad].fill(0.0);
        for (index, sample) in tail.iter().enumerate() {
            input[pad + index] = sample * self.window[pad + index];
        }

        self.fft
            .plan
            .process_with_scratch(&mut self.fft.input, &mut self.fft.spectrum, &mut self.fft.scratch)
            .map_err(|err| IciclesError::msg(format!("fft failed: {err}")))?;

        let tau = self.config.smoothing;
        let scale = 255.0 / (self.config.max_db - self.config.min_db);
        for (index, value) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.fft.spectrum[index].norm() / size as f32;
            let next = tau * *value + (1.0 - tau) * magnitude;
            *value = if next.is_finite() { next } else { 0.0 };

            if let Some(byte) = out.get_mut(index) {
                let db = 20.0 * value.log10();
                *byte = if db.is_finite() {
                    (scale * (db - self.config.min_db)).floor().clamp(0.0, 255.0) as u8
                } else {
                    0
                };
            }
        }

        Ok(())
    }
}

struct FftResources {
    plan: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
}

impl fmt::Debug for FrequencyAnalyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrequencyAnalyser")
            .field("config", &self.config)
            .finish()
    }
}

fn blackman_value(index: usize, len: usize) -> f32 {
    let a0 = 0.5 * (1.0 - BLACKMAN_ALPHA);
    let a1 = 0.5;
    let a2 = 0.5 * BLACKMAN_ALPHA;
    let phase = 2.0 * PI * index as f32 / len as f32;
    a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(bin: usize, size: usize) -> Vec<f32> {
        (0..size)
            .map(|n| (2.0 * PI * bin as f32 * n as f32 / size as f32).sin())
            .collect()
    }

    fn analyser(smoothing: f32) -> FrequencyAnalyser {
        FrequencyAnalyser::new(AnalyserConfig {
            smoothing,
            ..AnalyserConfig::spectrum()
        })
        .unwrap()
    }

    #[test]
    fn silence_maps_to_zero() {
        let mut analyser = analyser(0.0);
        let mut out = vec![7u8; analyser.frequency_bin_count()];
        analyser.byte_frequency_data(&[0.0; 256], &mut out).unwrap();
        assert!(out.iter().all(|&byte| byte == 0));
    }

    #[test]
    fn peaks_at_tone_bin() {
        let mut analyser = analyser(0.0);
        let mut out = vec![0u8; 128];
        analyser.byte_frequency_data(&sine(8, 256), &mut out).unwrap();
        assert_eq!(out[8], 255);
        assert!(out[40] < out[8] / 2, "{}", out[40]);
    }

    #[test]
    fn smoothing_holds_previous_energy() {
        let mut held = analyser(0.9);
        let mut immediate = analyser(0.9);
        let mut out = vec![0u8; 128];
        held.byte_frequency_data(&sine(8, 256), &mut out).unwrap();
        immediate.byte_frequency_data(&sine(8, 256), &mut out).unwrap();

        immediate.set_smoothing(0.0);
        immediate.byte_frequency_data(&[0.0; 256], &mut out).unwrap();
        assert_eq!(out[8], 0);

        held.byte_frequency_data(&[0.0; 256], &mut out).unwrap();
        assert!(out[8] > 0);
    }

    #[test]
    fn short_input_is_padded() {
        let mut analyser = analyser(0.0);
        let mut out = vec![0u8; 4];
        analyser.byte_frequency_data(&[0.5; 10], &mut out).unwrap();
        analyser.byte_frequency_data(&[], &mut out).unwrap();
        assert_eq!(out, vec![0; 4]);
    }

    #[test]
    fn rejects_bad_sizes() {
        for fft_size in [0, 100, 16, 65_536] {
            let config = AnalyserConfig {
                fft_size,
                ..AnalyserConfig::spectrum()
            };
            assert!(FrequencyAnalyser::new(config).is_err(), "{fft_size}");
        }
    }
}
