/// Intensity above which codecs treat the input as a hit.
pub const CODEC_THRESHOLD: f32 = 0.7;

/// Threshold used by the classic music rendering.
pub const CLASSIC_THRESHOLD: f32 = 0.6;

/// Linear decay applied per call once the input drops below the threshold.
pub const DECAY_STEP: f32 = 0.25;

/// Attack-fast, decay-slow envelope follower producing the base level.
#[derive(Debug, Clone)]
pub struct LevelTransformer {
    threshold: f32,
    value: f32,
}

impl LevelTransformer {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            value: 0.0,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Snaps to 1 when `intensity` exceeds the threshold, otherwise decays by
    /// [`DECAY_STEP`] towards 0. Returns the updated value.
    pub fn transform(&mut self, intensity: f32) -> f32 {
        if intensity > self.threshold {
            self.value = 1.0;
        } else if self.value > 0.0 {
            self.value -= DECAY_STEP;
        }

        if self.value < 0.0 {
            self.value = 0.0;
        }

        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}

impl Default for LevelTransformer {
    fn default() -> Self {
        Self::new(CODEC_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attacks_instantly_and_decays_linearly() {
        let mut level = LevelTransformer::default();
        assert_eq!(level.transform(0.9), 1.0);
        assert_eq!(level.transform(0.1), 0.75);
        assert_eq!(level.transform(0.7), 0.5);
        assert_eq!(level.transform(0.0), 0.25);
        assert_eq!(level.transform(0.0), 0.0);
        assert_eq!(level.transform(0.0), 0.0);
        assert_eq!(level.transform(0.71), 1.0);
    }

    #[test]
    fn threshold_is_per_instance() {
        let mut classic = LevelTransformer::new(CLASSIC_THRESHOLD);
        let mut codec = LevelTransformer::new(CODEC_THRESHOLD);
        assert_eq!(classic.transform(0.65), 1.0);
        assert_eq!(codec.transform(0.65), 0.0);
    }

    #[test]
    fn stays_in_unit_range() {
        let mut level = LevelTransformer::default();
        let inputs = [f32::NAN, -3.0, 5.0, 0.2, 0.8, 0.0, 0.0, 0.0, 0.0, 0.0, 1e9];
        for input in inputs {
            let value = level.transform(input);
            assert!((0.0..=1.0).contains(&value), "{input} -> {value}");
        }
    }
}
