//! Stable re-exports for consumers (`cli` and external crates).
//!
//! Prefer importing from `gsctl_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load, AppConfig, GameServerConfig, GamesConfig, HttpServerConfig, LoggingConfig, RestartConfig,
    StreamingConfig,
};
pub use crate::encoding::{decode_with_fallback, TextEncoding, DEFAULT_ENCODINGS};
pub use crate::error::{CliError, ConfigError, FileError, StreamError};
pub use crate::files::{
    overwrite_config_text, overwrite_config_text_with, read_config_text, read_config_text_with, write_config_text, DecodedText,
    MAX_CONFIG_FILE_BYTES,
};
pub use crate::games::{
    config_file_path, restart_invocation, ConfigFileKind, GameKind, RestartError, RestartOptions,
};
pub use crate::stream::{
    stream, ChunkKind, ChunkStream, ExitOutcome, OutputChunk, OutputStreamer, ProcessInvocation,
    ProcessOutput, StreamOptions,
};
