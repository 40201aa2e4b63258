//! Shaping of raw analyser bins before they reach a codec.

use crate::config::SpectrumConfig;

/// Exponent of the ease curve applied by [`SpectrumPreprocessor::multiplier`].
const MULTIPLIER_EXPONENT: f64 = 1.2;

/// Cuts a band out of the analyser output and smooths it.
#[derive(Debug, Clone)]
pub struct SpectrumPreprocessor {
    config: SpectrumConfig,
}

impl SpectrumPreprocessor {
    pub fn new(config: SpectrumConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SpectrumConfig {
        &self.config
    }

    /// Keeps bins `[start_bin, start_bin + keep_bins)` (clamped to the input)
    /// and runs the smoothing passes over them.
    pub fn transform(&self, raw_bins: &[u8]) -> Vec<u8> {
        let start = self.config.start_bin.min(raw_bins.len());
        let end = self
            .config
            .start_bin
            .saturating_add(self.config.keep_bins)
            .min(raw_bins.len());
        self.smooth(&raw_bins[start..end])
    }

    /// Moving average with an additive tap offset.
    ///
    /// Every tap contributes `cn * value + n` where `n` is its offset from the
    /// center. The first pass reads from `input`; later passes run in place,
    /// so they see values already rewritten earlier in the same pass. Sums
    /// are stored with 8-bit wrapping, not clamping. With zero passes the
    /// output is all zeros.
    pub fn smooth(&self, input: &[u8]) -> Vec<u8> {
        let side = self.config.smoothing_points / 2;
        let mut out = vec![0u8; input.len()];
        for pass in 0..self.config.smoothing_passes {
            let source = if pass == 0 { Some(input) } else { None };
            smoothing_pass(&mut out, source, side);
        }
        out
    }

    /// Loudness of a transformed spectrum mapped through
    /// `f(i) = (t * i - i^t) / (t - 1)` with `t = 1.2`.
    pub fn multiplier(&self, spectrum: &[u8]) -> f64 {
        let sum: f64 = spectrum.iter().map(|&bin| bin as f64).sum();
        let intermediate = if self.config.keep_bins == 0 {
            0.0
        } else {
            sum / self.config.keep_bins as f64 / 256.0
        };
        let t = MULTIPLIER_EXPONENT;
        (1.0 / (t - 1.0)) * (t * intermediate - intermediate.powf(t))
    }
}

fn smoothing_pass(out: &mut [u8], source: Option<&[u8]>, side: usize) {
    let len = out.len();
    let read = |out: &[u8], index: usize| source.map_or(out[index], |source| source[index]);
    let cn = 1.0 / (2 * side + 1) as f64;

    for i in 0..side.min(len) {
        out[i] = read(out, i);
        let mirrored = len - i - 1;
        out[mirrored] = read(out, mirrored);
    }

    for i in side..len.saturating_sub(side) {
        let mut sum = 0.0f64;
        for n in -(side as isize)..=side as isize {
            let value = read(out, (i as isize + n) as usize);
            sum += cn * value as f64 + n as f64;
        }
        out[i] = wrap_to_u8(sum);
    }
}

/// Truncates toward zero and wraps modulo 256; non-finite values become 0.
fn wrap_to_u8(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.trunc().rem_euclid(256.0) as u8
}

/// Averages `bins` into `columns` levels in `[0, 1]`.
///
/// Groups are `len / (columns * 2)` bins wide and laid out from bin 0, so only
/// the lower half of the spectrum is used. Groups of width zero yield level 0.
pub fn column_levels(bins: &[u8], columns: usize) -> Vec<f32> {
    if columns == 0 {
        return Vec::new();
    }
    let per_level = bins.len() / (columns * 2);
    if per_level == 0 {
        return vec![0.0; columns];
    }

    (0..columns)
        .map(|level| {
            let start = level * per_level;
            let sum: u32 = bins[start..start + per_level].iter().map(|&bin| bin as u32).sum();
            sum as f32 / per_level as f32 / 255.0
        })
        .collect()
}

/// Level shown in column `x`, mirrored around the center of the grid so the
/// lowest band sits in the two middle columns.
pub fn mirrored_level(levels: &[f32], x: usize) -> f32 {
    let half = levels.len() / 2;
    let index = if x < half { half - 1 - x } else { x - half };
    levels.get(index).copied().unwrap_or(0.0)
}
