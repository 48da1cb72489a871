pub mod frame_codec;
pub mod image_dir_source;
pub mod json_line_transport;
