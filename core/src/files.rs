//! Game config file I/O that keeps whatever encoding the file already uses.

use std::path::Path;

use crate::encoding::{decode_with_fallback, TextEncoding, DEFAULT_ENCODINGS};
use crate::error::FileError;

/// Config files are small ini/lua files; anything bigger is a wrong path.
pub const MAX_CONFIG_FILE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding: TextEncoding,
}

/// Read `path` as text, UTF-8 first, then GBK.
pub async fn read_config_text(path: &Path) -> Result<DecodedText, FileError> {
    read_config_text_with(path, DEFAULT_ENCODINGS).await
}

pub async fn read_config_text_with(
    path: &Path,
    encodings: &[TextEncoding],
) -> Result<DecodedText, FileError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| FileError::io(path, e))?;
    if !meta.is_file() {
        return Err(FileError::NotFound(path.to_path_buf()));
    }
    if meta.len() > MAX_CONFIG_FILE_BYTES {
        return Err(FileError::TooLarge {
            path: path.to_path_buf(),
            size: meta.len(),
            limit: MAX_CONFIG_FILE_BYTES,
        });
    }

    let bytes = tokio::fs::read(path).await.map_err(|e| FileError::io(path, e))?;
    let (text, encoding) = decode_with_fallback(&bytes, encodings)
        .ok_or_else(|| FileError::Undecodable(path.to_path_buf()))?;

    tracing::debug!(path = %path.display(), %encoding, bytes = bytes.len(), "read config file");
    Ok(DecodedText { text, encoding })
}

/// Write `text` to `path` in `encoding`, creating parent directories.
pub async fn write_config_text(
    path: &Path,
    text: &str,
    encoding: TextEncoding,
) -> Result<(), FileError> {
    let bytes = encoding.encode(text)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| FileError::io(parent, e))?;
    }
    tokio::fs::write(path, &bytes)
        .await
        .map_err(|e| FileError::io(path, e))?;

    tracing::info!(path = %path.display(), %encoding, bytes = bytes.len(), "wrote config file");
    Ok(())
}

/// Overwrite `path`, reusing the encoding of the existing file.
///
/// `encoding` forces a specific encoding. Otherwise an existing, decodable
/// file keeps its encoding and anything else is written as UTF-8. Returns
/// the encoding used.
pub async fn overwrite_config_text(
    path: &Path,
    text: &str,
    encoding: Option<TextEncoding>,
) -> Result<TextEncoding, FileError> {
    overwrite_config_text_with(path, text, encoding, DEFAULT_ENCODINGS).await
}

/// [`overwrite_config_text`] detecting the existing encoding with `order`.
pub async fn overwrite_config_text_with(
    path: &Path,
    text: &str,
    encoding: Option<TextEncoding>,
    order: &[TextEncoding],
) -> Result<TextEncoding, FileError> {
    let encoding = match encoding {
        Some(enc) => enc,
        None => match read_config_text_with(path, order).await {
            Ok(existing) => existing.encoding,
            Err(FileError::NotFound(_)) | Err(FileError::Undecodable(_)) => TextEncoding::Utf8,
            Err(e) => return Err(e),
        },
    };
    write_config_text(path, text, encoding).await?;
    Ok(encoding)
}
