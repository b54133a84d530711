use clap::Parser;
use gsctl_cli::commands::{cli, restart, show_config};
use gsctl_cli::http;
use gsctl_core::api::{self, CliError, FileError, StreamError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let args = cli::Args::parse();
    let cfg = api::load(args.config.as_deref())?;
    init_tracing(&cfg.logging).map_err(CliError::Command)?;
    match cfg.source.as_deref() {
        Some(path) => tracing::debug!(path = %path.display(), "loaded config"),
        None => tracing::debug!("no config file found, using defaults"),
    }

    match args.command {
        cli::Commands::Serve(serve_args) => {
            http::handle_serve(serve_args, cfg).await?;
            Ok(0)
        }
        cli::Commands::Restart(restart_args) => restart::handle_restart(restart_args, &cfg).await,
        cli::Commands::ShowConfig(show_args) => {
            show_config::handle_show_config(show_args, &cfg).await
        }
    }
}

fn exit_code_for_error(e: &CliError) -> i32 {
    // 0: success
    // 11: config error
    // 20: spawn / IO error
    // 50: internal/uncategorized
    // `restart` returns the script's own exit code instead of an error.
    match e {
        CliError::Config(_) => 11,
        CliError::Stream(se) => match se {
            StreamError::Spawn { .. } => 20,
            StreamError::Pipe(_) => 20,
            StreamError::AlreadyConsumed => 50,
        },
        CliError::File(fe) => match fe {
            FileError::NotFound(_) | FileError::Io { .. } => 20,
            FileError::Undecodable(_) | FileError::TooLarge { .. } | FileError::Unencodable { .. } => 50,
        },
        CliError::Io(_) => 20,
        CliError::Command(_) => 20,
        CliError::Anyhow(_) => 50,
    }
}

fn init_tracing(logging: &api::LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(d),
            None => std::env::temp_dir().join("gsctl"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let appender = tracing_appender::rolling::daily(dir, "gsctl.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging enabled but both console and file are off".to_string());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
