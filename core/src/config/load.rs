use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::AppConfig;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const CONFIG_PATH_ENV: &str = "GSCTL_CONFIG";

/// Default data directory: ~/.gsctl
pub fn get_gsctl_data_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok()
        .map(|home| PathBuf::from(home).join(".gsctl"))
}

pub fn parse_config(contents: &str, origin: &Path) -> Result<AppConfig, ConfigError> {
    toml::from_str::<AppConfig>(contents).map_err(|source| ConfigError::Parse {
        path: origin.display().to_string(),
        source,
    })
}

pub fn load_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&s, path)
}

/// Load configuration.
///
/// Priority: `explicit` path, then `$GSCTL_CONFIG`, then `./config.toml`,
/// then `~/.gsctl/config.toml`, then built-in defaults. An explicitly named
/// file that cannot be read is an error; the implicit locations are optional.
pub fn load(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut cfg = match find_config_file(explicit) {
        Some(path) => {
            let mut cfg = load_from_path(&path)?;
            cfg.source = Some(path);
            cfg
        }
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;
    cfg.expand_paths();
    Ok(cfg)
}

/// The config file [`load`] reads, if any. Implicit locations must exist;
/// an explicit or `$GSCTL_CONFIG` path is returned as given.
pub fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(path));
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    let home = get_gsctl_data_dir().map(|d| d.join(CONFIG_FILE_NAME));
    std::iter::once(local).chain(home).find(|p| p.exists())
}

/// Environment variable overrides: GSCTL_HOST, GSCTL_PORT, GSCTL_LOG_LEVEL.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = non_empty("GSCTL_HOST") {
        cfg.http_server.host = v;
    }
    if let Some(v) = non_empty("GSCTL_PORT") {
        cfg.http_server.port = v.trim().parse().map_err(|_| ConfigError::InvalidValue {
            field: "GSCTL_PORT",
            value: v.clone(),
        })?;
    }
    if let Some(v) = non_empty("GSCTL_LOG_LEVEL") {
        cfg.logging.level = v;
    }
    Ok(())
}
