use std::path::Path;

use crate::config::{GameServerConfig, RestartConfig};
use crate::error::{CliError, ConfigError, FileError};
use crate::stream::ProcessInvocation;

use super::{require, GameKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct RestartOptions {
    /// Wipe saves before starting again. Only Project Zomboid supports it.
    pub force_delete_saves: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum RestartError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    File(#[from] FileError),
}

impl From<RestartError> for CliError {
    fn from(e: RestartError) -> Self {
        match e {
            RestartError::Config(e) => CliError::Config(e),
            RestartError::File(e) => CliError::File(e),
        }
    }
}

/// Build the `<shell> <shell_args..> <script> [flags]` command for `game`.
///
/// The script must exist; the working directory is the script's directory.
pub fn restart_invocation(
    game: GameKind,
    cfg: &GameServerConfig,
    restart: &RestartConfig,
    opts: RestartOptions,
) -> Result<ProcessInvocation, RestartError> {
    let script = Path::new(require(&cfg.restart_script_path, game, "restart_script_path")?);
    if !script.is_file() {
        return Err(FileError::NotFound(script.to_path_buf()).into());
    }
    let server_path = require(&cfg.server_path, game, "server_path")?;

    let mut flags: Vec<String> = Vec::new();
    match game {
        GameKind::ProjectZomboid => {
            if opts.force_delete_saves {
                flags.push("-ForceDeleteSaves".into());
            }
            flags.push("-ZomboidSavePath".into());
            flags.push(require(&cfg.server_save_path, game, "server_save_path")?.into());
            flags.push("-SteamCmdPath".into());
            flags.push(require(&cfg.steamcmd_path, game, "steamcmd_path")?.into());
            flags.push("-ServerStartPath".into());
            flags.push(server_path.into());
        }
        GameKind::Satisfactory | GameKind::PalWorld => {
            if opts.force_delete_saves {
                tracing::warn!(game = %game, "force_delete_saves is not supported, ignoring");
            }
            if let Some(steamcmd) = optional(&cfg.steamcmd_path) {
                flags.push("-SteamCmdPath".into());
                flags.push(steamcmd.into());
            }
            flags.push("-ServerStartPath".into());
            flags.push(server_path.into());
            if game == GameKind::PalWorld {
                if let Some(save) = optional(&cfg.server_save_path) {
                    flags.push("-SavePath".into());
                    flags.push(save.into());
                }
            }
        }
    }

    let mut invocation = ProcessInvocation::new(&restart.shell)
        .args(&restart.shell_args)
        .arg(script)
        .args(flags);
    if let Some(dir) = script.parent().filter(|d| !d.as_os_str().is_empty()) {
        invocation = invocation.current_dir(dir);
    }
    Ok(invocation)
}

fn optional(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
