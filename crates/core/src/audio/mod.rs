use std::{fmt, time::Duration};

use crate::{timeline::SharedClock, IciclesError, Result};

/// Playback resource behind a music animation.
///
/// `start` only requests playback; the signal reports `is_started` once the
/// host confirms it, which may be some time later.
pub trait AudioSignal {
    fn name(&self) -> &str;
    /// Prepares the decode/playback resource.
    fn load(&mut self) -> Result<()>;
    /// Requests playback from the current position.
    fn start(&mut self) -> Result<()>;
    fn is_started(&self) -> bool;
    fn is_ended(&self) -> bool;
    /// Writes the samples leading up to the playback cursor into `out`,
    /// right-aligned and padded with silence.
    fn fill_window(&self, out: &mut [f32]);
    /// Playback position in seconds.
    fn position(&self) -> f64;
    /// Total length in seconds.
    fn duration(&self) -> f64;
    fn seek(&mut self, seconds: f64);
    /// Releases the resource. Calling it again is a no-op.
    fn stop(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SignalState {
    Idle,
    Loaded,
    Playing { requested_at: Duration },
}

/// Decoded mono PCM played back against a shared clock.
pub struct PcmSignal {
    name: String,
    samples: Vec<f32>,
    sample_rate: u32,
    clock: SharedClock,
    start_latency: Duration,
    state: SignalState,
    offset: f64,
}

impl PcmSignal {
    pub fn new(name: impl Into<String>, samples: Vec<f32>, sample_rate: u32, clock: SharedClock) -> Self {
        Self {
            name: name.into(),
            samples,
            sample_rate: sample_rate.max(1),
            clock,
            start_latency: Duration::ZERO,
            state: SignalState::Idle,
            offset: 0.0,
        }
    }

    /// Delay between a start request and the signal reporting it started.
    pub fn with_start_latency(mut self, latency: Duration) -> Self {
        self.start_latency = latency;
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn confirmed_at(&self) -> Option<Duration> {
        match self.state {
            SignalState::Playing { requested_at } => Some(requested_at + self.start_latency),
            _ => None,
        }
    }
}

impl AudioSignal for PcmSignal {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&mut self) -> Result<()> {
        if self.state == SignalState::Idle {
            self.state = SignalState::Loaded;
            tracing::debug!(name = %self.name, samples = self.samples.len(), "audio signal loaded");
        }
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        match self.state {
            SignalState::Idle => Err(IciclesError::AudioStart(format!(
                "`{}` has not been loaded",
                self.name
            ))),
            _ if self.samples.is_empty() => Err(IciclesError::AudioStart(format!(
                "`{}` contains no samples",
                self.name
            ))),
            SignalState::Loaded => {
                self.state = SignalState::Playing {
                    requested_at: self.clock.now(),
                };
                Ok(())
            }
            SignalState::Playing { .. } => Ok(()),
        }
    }

    fn is_started(&self) -> bool {
        self.confirmed_at()
            .is_some_and(|confirmed| self.clock.now() >= confirmed)
    }

    fn is_ended(&self) -> bool {
        self.is_started() && self.position() >= self.duration()
    }

    fn fill_window(&self, out: &mut [f32]) {
        let cursor = ((self.position() * self.sample_rate as f64) as usize).min(self.samples.len());
        let start = cursor.saturating_sub(out.len());
        let available = &self.samples[start..cursor];
        let pad = out.len() - available.len();
        out[..pad].fill(0.0);
        out[pad..].copy_from_slice(available);
    }

    fn position(&self) -> f64 {
        let played = match self.confirmed_at() {
            Some(confirmed) => self.clock.now().saturating_sub(confirmed).as_secs_f64(),
            None => 0.0,
        };
        (self.offset + played).min(self.duration())
    }

    fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    fn seek(&mut self, seconds: f64) {
        let target = if seconds.is_finite() {
            seconds.clamp(0.0, self.duration())
        } else {
            0.0
        };
        self.offset = target;
        if let SignalState::Playing { requested_at } = self.state {
            let now = self.clock.now();
            // Before confirmation the cursor has not moved yet, so the pending
            // confirmation time stays as it is.
            if now >= requested_at + self.start_latency {
                self.state = SignalState::Playing {
                    requested_at: now.saturating_sub(self.start_latency),
                };
            }
        }
    }

    fn stop(&mut self) {
        if self.state != SignalState::Idle {
            tracing::debug!(name = %self.name, "audio signal released");
        }
        self.state = SignalState::Idle;
        self.offset = 0.0;
    }
}

impl fmt::Debug for PcmSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcmSignal")
            .field("name", &self.name)
            .field("samples", &self.samples.len())
            .field("sample_rate", &self.sample_rate)
            .field("state", &self.state)
            .finish()
    }
}
