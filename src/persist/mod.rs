//! Session file layout and the background writer that fills it.

pub mod session;
pub mod writer;

pub use session::{create_session_path, session_file_path, session_now};
pub use writer::{spawn_writer, StopReason, WriterHandle, WriterMessage, WriterState};
