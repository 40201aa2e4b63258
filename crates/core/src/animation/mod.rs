//! Sources of [`AnimationView`]s.
//!
//! A source is restarted with [`Animation::play`] and then pulled one view
//! at a time with [`Animation::pull_next`] until it reports [`Pull::Ended`].
//! File animations end after their last frame; music animations end when the
//! audio signal does.

mod file;
mod music;

pub use file::{FileAnimation, FileFrame};
pub use music::{MusicAnimation, MusicState};

use crate::{AnimationView, Header};

/// Result of pulling one step from a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pull {
    Frame(AnimationView),
    Ended,
}

impl Pull {
    pub fn into_view(self) -> Option<AnimationView> {
        match self {
            Pull::Frame(view) => Some(view),
            Pull::Ended => None,
        }
    }
}

/// Closed set of playlist entries.
#[derive(Debug)]
pub enum Animation {
    File(FileAnimation),
    Music(MusicAnimation),
}

impl Animation {
    pub fn header(&self) -> &Header {
        match self {
            Animation::File(animation) => animation.header(),
            Animation::Music(animation) => animation.header(),
        }
    }

    pub fn name(&self) -> &str {
        &self.header().name
    }

    /// Whether the source holds live audio resources between pulls.
    pub fn is_audio_backed(&self) -> bool {
        matches!(self, Animation::Music(_))
    }

    /// Rewinds the source so the next pull yields its first view.
    pub fn play(&mut self) {
        match self {
            Animation::File(animation) => animation.play(),
            Animation::Music(animation) => animation.play(),
        }
    }

    pub fn pull_next(&mut self) -> Pull {
        match self {
            Animation::File(animation) => animation.pull_next(),
            Animation::Music(animation) => animation.pull_next(),
        }
    }

    /// Releases held resources. Safe to call any number of times.
    pub fn dispose(&mut self) {
        match self {
            Animation::File(_) => {}
            Animation::Music(animation) => animation.dispose(),
        }
    }

    /// Playback progress in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        match self {
            Animation::File(animation) => animation.progress(),
            Animation::Music(animation) => animation.progress(),
        }
    }

    /// Seeks audio-backed sources; file animations ignore it.
    pub fn set_progress(&mut self, progress: f64) {
        if let Animation::Music(animation) = self {
            animation.set_progress(progress);
        }
    }

    /// Number of views a full play yields, when known up front.
    pub fn animation_frames_count(&self) -> Option<usize> {
        match self {
            Animation::File(animation) => Some(animation.animation_frames_count()),
            Animation::Music(_) => None,
        }
    }
}

impl From<FileAnimation> for Animation {
    fn from(animation: FileAnimation) -> Self {
        Animation::File(animation)
    }
}

impl From<MusicAnimation> for Animation {
    fn from(animation: MusicAnimation) -> Self {
        Animation::Music(animation)
    }
}
