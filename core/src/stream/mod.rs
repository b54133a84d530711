mod guard;
pub mod io_pump;
mod pipe;
mod streamer;
pub mod types;

pub use streamer::{stream, ChunkStream, OutputStreamer, ProcessOutput, StreamOptions};
pub use types::{ChunkKind, ExitOutcome, OutputChunk, ProcessInvocation};
