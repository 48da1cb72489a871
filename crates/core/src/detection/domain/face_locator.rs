use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

/// Domain interface for face localization.
///
/// Returns the backend's single best detection for the frame, or `None`
/// when nothing qualifies. Implementations may be stateful (e.g., a
/// detector session), hence `&mut self`.
pub trait FaceLocator: Send {
    fn locate(&mut self, frame: &Frame) -> Result<Option<FaceRegion>, Box<dyn std::error::Error>>;
}
