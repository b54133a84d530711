use gsctl_core::api::{
    restart_invocation, AppConfig, CliError, ConfigError, ExitOutcome, GameKind, OutputStreamer,
    RestartOptions, StreamOptions,
};
use tokio::io::AsyncWriteExt;

use super::cli::RestartArgs;

/// Exit code used when the child ended without one (killed by a signal).
const TERMINATED_EXIT_CODE: i32 = 1;

/// Final line appended after the streamed output of a restart.
pub fn status_line(outcome: Option<ExitOutcome>) -> String {
    match outcome {
        Some(o) if o.success() => "[Done] exit code 0\n".to_string(),
        Some(ExitOutcome { code: Some(code), .. }) => format!("[Failed] exit code {code}\n"),
        _ => "[Failed] process terminated\n".to_string(),
    }
}

pub fn parse_game(raw: &str) -> Result<GameKind, CliError> {
    raw.parse::<GameKind>().map_err(CliError::Command)
}

/// Run the restart script in the foreground, copying its output to stdout.
///
/// Returns the script's exit code. Ctrl+C kills the script.
pub async fn handle_restart(args: RestartArgs, cfg: &AppConfig) -> Result<i32, CliError> {
    let game = parse_game(&args.game)?;
    let game_cfg = cfg
        .game(game)
        .ok_or_else(|| ConfigError::GameNotConfigured(game.to_string()))?;
    let invocation = restart_invocation(
        game,
        game_cfg,
        &cfg.restart,
        RestartOptions {
            force_delete_saves: args.force_delete_saves,
        },
    )?;

    let streamer = OutputStreamer::new(StreamOptions::from(&cfg.streaming));
    let mut output = streamer.stream(&invocation)?;
    let mut chunks = output.chunks()?;
    tracing::info!(game = %game, pid = ?chunks.pid(), "restart started");

    let mut stdout = tokio::io::stdout();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            chunk = chunks.next_chunk() => match chunk {
                Some(chunk) => {
                    stdout.write_all(chunk.render().as_bytes()).await?;
                    stdout.flush().await?;
                }
                None => break,
            },
            _ = &mut ctrl_c => {
                tracing::warn!(game = %game, "interrupted, stopping restart script");
                chunks.terminate().await;
                break;
            }
        }
    }

    let outcome = chunks.exit_status();
    eprint!("{}", status_line(outcome));
    tracing::info!(game = %game, exit_code = ?outcome.and_then(|o| o.code), "restart finished");

    Ok(outcome
        .and_then(|o| o.code)
        .unwrap_or(TERMINATED_EXIT_CODE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line() {
        let ok = ExitOutcome {
            code: Some(0),
            killed: false,
        };
        let failed = ExitOutcome {
            code: Some(2),
            killed: false,
        };
        let killed = ExitOutcome {
            code: None,
            killed: true,
        };
        assert_eq!(status_line(Some(ok)), "[Done] exit code 0\n");
        assert_eq!(status_line(Some(failed)), "[Failed] exit code 2\n");
        assert_eq!(status_line(Some(killed)), "[Failed] process terminated\n");
        assert_eq!(status_line(None), "[Failed] process terminated\n");
    }

    #[test]
    fn test_unknown_game() {
        assert!(matches!(parse_game("minecraft"), Err(CliError::Command(_))));
    }

    #[tokio::test]
    async fn test_unconfigured_game_is_config_error() {
        let args = RestartArgs {
            game: "satisfactory".into(),
            force_delete_saves: false,
        };
        let err = handle_restart(args, &AppConfig::default()).await.unwrap_err();
        assert!(matches!(
            err,
            CliError::Config(ConfigError::GameNotConfigured(_))
        ));
    }
}
