//! Real-time face-distance estimation over a persistent connection.
//!
//! A session calibrates the camera's focal length from a face of known
//! physical width at a known distance (or takes a fixed focal length),
//! then streams annotated frames and distance readings derived from the
//! pinhole-camera relationship. Face localization, the image codec, and
//! the transport are ports with pluggable implementations.

pub mod detection;
pub mod estimation;
pub mod pipeline;
pub mod session;
pub mod shared;
