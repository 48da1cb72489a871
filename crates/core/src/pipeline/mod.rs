pub mod annotator;
pub mod frame_processor;
