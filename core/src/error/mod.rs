#[allow(clippy::module_inception)]
pub mod error;
pub mod file;
pub mod stream;

pub use error::{CliError, ConfigError};
pub use file::FileError;
pub use stream::StreamError;
