use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{} is neither valid UTF-8 nor GBK", .0.display())]
    Undecodable(PathBuf),

    #[error("{} is too large: {size} bytes (limit: {limit} bytes)", path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("text cannot be represented in {encoding}: unmappable character")]
    Unencodable { encoding: &'static str },
}

impl FileError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::NotFound(path);
        }
        Self::Io { path, source }
    }
}
