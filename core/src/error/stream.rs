use thiserror::Error;

/// Failures of the process output streamer itself.
///
/// Per-line decode problems and read failures after spawn are reported
/// in-band as [`OutputChunk`](crate::stream::OutputChunk)s and never show up here.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("output of this invocation was already consumed")]
    AlreadyConsumed,
    #[error("failed to create output pipe: {0}")]
    Pipe(std::io::Error),
}

impl StreamError {
    /// Stable code reported to HTTP clients and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Spawn { .. } => "SPAWN_FAILURE",
            Self::AlreadyConsumed => "USAGE_ERROR",
            Self::Pipe(_) => "STREAM_ERROR",
        }
    }
}
