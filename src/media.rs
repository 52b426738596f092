use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Resolves once the engine has started producing audio or given up.
pub type PlayRequest = BoxFuture<'static, Result<(), MediaError>>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("no source loaded")]
    NoSource,
    #[error("failed to open {path}: {reason}")]
    Open { path: PathBuf, reason: String },
    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("audio output unavailable: {0}")]
    Output(String),
    #[error("seek failed: {0}")]
    Seek(String),
    #[error("playback rejected: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    TimeUpdate,
    Ended,
    LoadedMetadata,
    Error(MediaError),
}

/// Host media element. Load and decode failures are reported through
/// [`MediaEvent::Error`] rather than from `set_source`.
pub trait MediaEngine {
    fn set_source(&mut self, src: &Path);

    fn play(&mut self) -> PlayRequest;

    fn pause(&mut self);

    fn current_time(&self) -> f64;

    /// `None` until metadata for the current source is known.
    fn duration(&self) -> Option<f64>;

    fn set_current_time(&mut self, seconds: f64);

    fn poll_events(&mut self) -> Vec<MediaEvent>;
}
