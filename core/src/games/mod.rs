//! Game registry: which games exist, where their config files live and how
//! their restart script is invoked.

mod restart;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::config::GameServerConfig;
use crate::error::ConfigError;

pub use restart::{restart_invocation, RestartError, RestartOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    ProjectZomboid,
    Satisfactory,
    #[serde(rename = "palworld")]
    PalWorld,
}

impl GameKind {
    pub const ALL: [GameKind; 3] = [Self::ProjectZomboid, Self::Satisfactory, Self::PalWorld];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProjectZomboid => "project_zomboid",
            Self::Satisfactory => "satisfactory",
            Self::PalWorld => "palworld",
        }
    }

    /// Config files an operator may view and overwrite for this game.
    pub fn config_files(self) -> &'static [ConfigFileKind] {
        match self {
            Self::ProjectZomboid => &[ConfigFileKind::Server, ConfigFileKind::Sandbox],
            Self::Satisfactory => &[],
            Self::PalWorld => &[ConfigFileKind::Server],
        }
    }

    pub fn has_config_file(self, file: ConfigFileKind) -> bool {
        self.config_files().contains(&file)
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| format!("unknown game '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigFileKind {
    Server,
    Sandbox,
}

impl ConfigFileKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Sandbox => "sandbox",
        }
    }
}

impl FromStr for ConfigFileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "server" => Ok(Self::Server),
            "sandbox" => Ok(Self::Sandbox),
            other => Err(format!("unknown config file '{other}' (expected server or sandbox)")),
        }
    }
}

pub(crate) fn require<'a>(
    value: &'a Option<String>,
    game: GameKind,
    field: &'static str,
) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingField {
            game: game.as_str().to_string(),
            field,
        })
}

/// Location of `file` for `game`, or `None` if the game has no such file.
pub fn config_file_path(
    game: GameKind,
    cfg: &GameServerConfig,
    file: ConfigFileKind,
) -> Result<Option<PathBuf>, ConfigError> {
    if !game.has_config_file(file) {
        return Ok(None);
    }
    let dir = Path::new(require(&cfg.server_config_path, game, "server_config_path")?);

    let name = match (game, file) {
        (GameKind::ProjectZomboid, ConfigFileKind::Server) => {
            format!("{}.ini", require(&cfg.server_name, game, "server_name")?)
        }
        (GameKind::ProjectZomboid, ConfigFileKind::Sandbox) => {
            format!("{}_SandboxVars.lua", require(&cfg.server_name, game, "server_name")?)
        }
        (GameKind::PalWorld, ConfigFileKind::Server) => "PalWorldSettings.ini".to_string(),
        _ => return Ok(None),
    };
    Ok(Some(dir.join(name)))
}
