/// Result alias that carries the custom [`IciclesError`] type.
pub type Result<T> = std::result::Result<T, IciclesError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum IciclesError {
    /// A playlist index outside `0..len` was requested.
    #[error("animation index {index} is out of range (playlist has {len} entries)")]
    IndexOutOfRange { index: usize, len: usize },
    /// `play` was given an explicit, but empty, playlist.
    #[error("at least one animation is required")]
    EmptyPlaylist,
    /// `play` was called without a playlist and none was loaded before.
    #[error("nothing to play")]
    NothingToPlay,
    /// The same listener was registered twice.
    #[error("listener is already registered")]
    DuplicateListener,
    /// Removal of a listener that was never registered.
    #[error("listener is not registered")]
    UnknownListener,
    /// The player was asked to pull a frame without an active source.
    #[error("player has no active animation")]
    NoActiveSource,
    /// The underlying audio signal could not be started.
    #[error("audio signal failed to start: {0}")]
    AudioStart(String),
    /// Malformed animation container or frame payload.
    #[error("decode error: {0}")]
    Decode(String),
    /// Structurally invalid input to a computation.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Free-form message for failures without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON (de)serialization errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl IciclesError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Creates a decode error from the provided message.
    pub fn decode<T: Into<String>>(msg: T) -> Self {
        Self::Decode(msg.into())
    }
}

impl From<&str> for IciclesError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for IciclesError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
