//! Frame synthesis and playback engine for the Icicles LED installation.
//!
//! Animation sources produce [`AnimationView`]s either by replaying decoded
//! animation files or by running live audio through a frequency analyser, the
//! spectrum preprocessor and a [`Codec`]. The [`Player`] paces those views in
//! real time and hands their encoded bytes to a [`Transport`].

pub mod analysis;
pub mod animation;
pub mod audio;
pub mod codec;
pub mod config;
pub mod error;
pub mod frame;
pub mod level;
pub mod model;
pub mod player;
pub mod spectrum;
pub mod timeline;
pub mod transport;

pub use analysis::FrequencyAnalyser;
pub use animation::{Animation, FileAnimation, FileFrame, MusicAnimation, MusicState, Pull};
pub use audio::{AudioSignal, PcmSignal};
pub use codec::{Codec, CodecKind};
pub use config::{AnalyserConfig, AppConfig, MusicConfig, PacingMode, PlayerConfig, SpectrumConfig};
pub use error::{IciclesError, Result};
pub use frame::{AnimationView, Icicles, RadioPanelView, VisualFrame};
pub use level::LevelTransformer;
pub use model::{colors, Color, Header};
pub use player::{FrameListener, PlaybackStats, Player};
pub use spectrum::SpectrumPreprocessor;
pub use timeline::{Clock, ManualClock, PacingTimer, SharedClock, SystemClock};
pub use transport::{MemoryTransport, Submission, Transport, WriterTransport};
