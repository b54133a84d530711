use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::encoding::{TextEncoding, DEFAULT_ENCODINGS};
use crate::games::GameKind;
use crate::util::expand_env;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub http_server: HttpServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub streaming: StreamingConfig,

    #[serde(default)]
    pub restart: RestartConfig,

    #[serde(default)]
    pub games: GamesConfig,

    /// File this config was loaded from; `None` for built-in defaults.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub fn game(&self, kind: GameKind) -> Option<&GameServerConfig> {
        match kind {
            GameKind::ProjectZomboid => self.games.project_zomboid.as_ref(),
            GameKind::Satisfactory => self.games.satisfactory.as_ref(),
            GameKind::PalWorld => self.games.palworld.as_ref(),
        }
    }

    /// Expand `$VAR`, `${VAR}`, `%VAR%` and `~` in every configured path.
    pub fn expand_paths(&mut self) {
        for game in [
            self.games.project_zomboid.as_mut(),
            self.games.satisfactory.as_mut(),
            self.games.palworld.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            game.expand_paths();
        }
        self.http_server.static_dir = expand_env(&self.http_server.static_dir);
        if let Some(dir) = self.logging.directory.as_mut() {
            *dir = expand_env(dir);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory with the browser frontend, served for unmatched paths.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "gsctl_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,

    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    #[serde(default = "default_exit_wait_ms")]
    pub exit_wait_ms: u64,

    #[serde(default = "default_kill_grace_ms")]
    pub kill_grace_ms: u64,

    /// Output still read after the child exits, for lines a background
    /// process it left behind keeps the pipe open for.
    #[serde(default = "default_drain_grace_ms")]
    pub drain_grace_ms: u64,

    /// Tried in order for every output line and every config file read.
    #[serde(default = "default_encodings")]
    pub encodings: Vec<TextEncoding>,
}

fn default_max_line_bytes() -> usize {
    64 * 1024
}

fn default_channel_capacity() -> usize {
    256
}

fn default_exit_wait_ms() -> u64 {
    5_000
}

fn default_kill_grace_ms() -> u64 {
    3_000
}

fn default_drain_grace_ms() -> u64 {
    500
}

fn default_encodings() -> Vec<TextEncoding> {
    DEFAULT_ENCODINGS.to_vec()
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: default_max_line_bytes(),
            channel_capacity: default_channel_capacity(),
            exit_wait_ms: default_exit_wait_ms(),
            kill_grace_ms: default_kill_grace_ms(),
            drain_grace_ms: default_drain_grace_ms(),
            encodings: default_encodings(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestartConfig {
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Arguments placed between the shell and the script path.
    #[serde(default = "default_shell_args")]
    pub shell_args: Vec<String>,
}

fn default_shell() -> String {
    if cfg!(windows) {
        "pwsh.exe".to_string()
    } else {
        "pwsh".to_string()
    }
}

fn default_shell_args() -> Vec<String> {
    vec!["-File".to_string()]
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            shell_args: default_shell_args(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GamesConfig {
    #[serde(default)]
    pub project_zomboid: Option<GameServerConfig>,

    #[serde(default)]
    pub satisfactory: Option<GameServerConfig>,

    #[serde(default)]
    pub palworld: Option<GameServerConfig>,
}

/// Paths for one game server. Which fields are required depends on the game.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameServerConfig {
    #[serde(default)]
    pub server_path: Option<String>,

    #[serde(default)]
    pub server_config_path: Option<String>,

    #[serde(default)]
    pub server_save_path: Option<String>,

    /// Project Zomboid server name; config files are named after it.
    #[serde(default)]
    pub server_name: Option<String>,

    #[serde(default, alias = "restart_server_script_path")]
    pub restart_script_path: Option<String>,

    #[serde(default)]
    pub steamcmd_path: Option<String>,
}

impl GameServerConfig {
    fn expand_paths(&mut self) {
        for field in [
            &mut self.server_path,
            &mut self.server_config_path,
            &mut self.server_save_path,
            &mut self.restart_script_path,
            &mut self.steamcmd_path,
        ] {
            if let Some(value) = field.as_mut() {
                *value = expand_env(value);
            }
        }
    }
}
