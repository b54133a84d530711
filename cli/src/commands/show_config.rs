use gsctl_core::api::{
    config_file_path, read_config_text_with, AppConfig, CliError, ConfigError, ConfigFileKind,
    StreamOptions,
};

use super::cli::{ConfigFileArg, ShowConfigArgs};
use super::restart::parse_game;

impl From<ConfigFileArg> for ConfigFileKind {
    fn from(arg: ConfigFileArg) -> Self {
        match arg {
            ConfigFileArg::Server => ConfigFileKind::Server,
            ConfigFileArg::Sandbox => ConfigFileKind::Sandbox,
        }
    }
}

/// Print the decoded file to stdout; path and detected encoding go to stderr.
pub async fn handle_show_config(args: ShowConfigArgs, cfg: &AppConfig) -> Result<i32, CliError> {
    let game = parse_game(&args.game)?;
    let file = ConfigFileKind::from(args.file);
    let game_cfg = cfg
        .game(game)
        .ok_or_else(|| ConfigError::GameNotConfigured(game.to_string()))?;

    let path = config_file_path(game, game_cfg, file)?.ok_or_else(|| {
        CliError::Command(format!("{game} has no {} config file", file.as_str()))
    })?;
    let encodings = StreamOptions::from(&cfg.streaming).encodings;
    let decoded = read_config_text_with(&path, &encodings).await?;

    eprintln!("# {} ({})", path.display(), decoded.encoding);
    print!("{}", decoded.text);
    Ok(0)
}
