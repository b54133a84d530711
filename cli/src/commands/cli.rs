use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFileArg {
    Server,
    Sandbox,
}

#[derive(Parser, Debug)]
#[command(name = "gsctl", version, about = "Game server control panel")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config.toml (overrides $GSCTL_CONFIG and the default locations).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ServeArgs {
    /// Bind address; defaults to [http_server].host.
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port; defaults to [http_server].port.
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RestartArgs {
    /// project_zomboid, satisfactory or palworld
    pub game: String,

    /// Delete world saves before starting (Project Zomboid only).
    #[arg(long, default_value_t = false)]
    pub force_delete_saves: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ShowConfigArgs {
    pub game: String,

    #[arg(long, value_enum, default_value_t = ConfigFileArg::Server)]
    pub file: ConfigFileArg,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP control panel.
    Serve(ServeArgs),
    /// Run a game's restart script here and print its output.
    Restart(RestartArgs),
    /// Print a game's config file.
    ShowConfig(ShowConfigArgs),
}
