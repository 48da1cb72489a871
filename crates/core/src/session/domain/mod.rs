pub mod frame_source;
pub mod transport;
