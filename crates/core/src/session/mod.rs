pub mod domain;
pub mod infrastructure;
pub mod protocol;
pub mod stream_session;
