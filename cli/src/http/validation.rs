//! Request validation for path segments and bodies

use gsctl_core::api::{ConfigFileKind, GameKind, MAX_CONFIG_FILE_BYTES};

use super::models::HttpServerError;

/// Resolve the `:game` path segment.
pub fn validate_game(raw: &str) -> Result<GameKind, HttpServerError> {
    raw.parse::<GameKind>()
        .map_err(|_| HttpServerError::GameNotFound(format!("unknown game '{raw}'")))
}

/// Reject file kinds the game does not have (e.g. a PalWorld sandbox file).
pub fn validate_file_kind(game: GameKind, file: ConfigFileKind) -> Result<(), HttpServerError> {
    if game.has_config_file(file) {
        return Ok(());
    }
    Err(HttpServerError::InvalidRequest(format!(
        "{game} has no {} config file",
        file.as_str()
    )))
}

pub fn validate_content(content: &str) -> Result<(), HttpServerError> {
    if content.len() as u64 > MAX_CONFIG_FILE_BYTES {
        return Err(HttpServerError::InvalidRequest(format!(
            "Content too large ({} bytes, max {MAX_CONFIG_FILE_BYTES})",
            content.len()
        )));
    }
    Ok(())
}

pub fn validate_upload_size(len: usize) -> Result<(), HttpServerError> {
    if len as u64 > MAX_CONFIG_FILE_BYTES {
        return Err(HttpServerError::InvalidRequest(format!(
            "Uploaded file too large ({len} bytes, max {MAX_CONFIG_FILE_BYTES})"
        )));
    }
    Ok(())
}
