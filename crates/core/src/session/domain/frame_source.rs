use thiserror::Error;

use crate::session::domain::transport::TransportError;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum FrameSourceError {
    /// Transient failure reading one frame; the caller skips the iteration.
    #[error("failed to acquire frame: {0}")]
    Acquisition(String),
    /// The connection delivering frames failed; fatal for the session.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Port for whatever supplies inbound frames: a capture device, a directory
/// of images, or the decoded uploads of a connected client.
///
/// The source is exclusively owned by one session for its lifetime and
/// released exactly once via [`FrameSource::close`].
pub trait FrameSource: Send {
    /// Produce the next frame. `Ok(None)` means the source is exhausted
    /// and will never yield again; a transient read failure is an
    /// [`FrameSourceError::Acquisition`] error instead.
    fn next_frame(&mut self) -> Result<Option<Frame>, FrameSourceError>;

    /// Release the underlying resource. Idempotent.
    fn close(&mut self);
}
