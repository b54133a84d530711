//! HTTP route handlers

use std::convert::Infallible;
use std::path::PathBuf;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use chrono::Local;
use futures::Stream;
use gsctl_core::api::{
    config_file_path, overwrite_config_text_with, read_config_text_with, restart_invocation,
    ChunkStream, ConfigFileKind, GameKind, RestartOptions, MAX_CONFIG_FILE_BYTES,
};
use tower_http::services::ServeDir;
use uuid::Uuid;

use crate::commands::restart::status_line;
use crate::http::{
    models::*,
    state::AppState,
    validation::{validate_content, validate_file_kind, validate_game},
};

/// Request bodies up to twice the config file cap, leaving room for JSON
/// escaping and multipart framing around a file of the largest allowed size.
const MAX_BODY_BYTES: usize = 2 * MAX_CONFIG_FILE_BYTES as usize;

/// Build all routes; unmatched paths fall through to the static frontend.
pub fn create_router(state: AppState) -> Router {
    let static_dir = ServeDir::new(&state.config.http_server.static_dir);

    Router::new()
        .route("/health", get(health_handler))
        .route("/games", get(games_handler))
        .route("/:game/restart", post(restart_handler))
        .route("/:game/get_config", get(get_server_config_handler))
        .route("/:game/get_server_config", get(get_server_config_handler))
        .route("/:game/get_sandbox_config", get(get_sandbox_config_handler))
        .route("/:game/override_config", post(override_server_config_handler))
        .route(
            "/:game/override_server_config",
            post(override_server_config_handler),
        )
        .route(
            "/:game/override_sandbox_config",
            post(override_sandbox_config_handler),
        )
        .fallback_service(static_dir)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// POST /:game/restart - run the restart script and stream its output
async fn restart_handler(
    State(state): State<AppState>,
    Path(game): Path<String>,
    Query(query): Query<RestartQuery>,
) -> Result<Response, HttpServerError> {
    state.record_request("/:game/restart");
    start_restart(&state, &game, query).inspect_err(|_| state.record_error())
}

fn start_restart(
    state: &AppState,
    game: &str,
    query: RestartQuery,
) -> Result<Response, HttpServerError> {
    let game = validate_game(game)?;
    let cfg = state.game_config(game)?;
    let invocation = restart_invocation(
        game,
        cfg,
        &state.config.restart,
        RestartOptions {
            force_delete_saves: query.force_delete_saves,
        },
    )?;

    let run_id = Uuid::new_v4().to_string();
    let mut output = state.streamer.stream(&invocation)?;
    let chunks = output.chunks()?;

    tracing::info!(
        run_id = %run_id,
        game = %game,
        pid = ?chunks.pid(),
        force_delete_saves = query.force_delete_saves,
        "restart started"
    );
    {
        let mut stats = state
            .stats
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        stats.restarts_started += 1;
    }

    let body = Body::from_stream(restart_body(chunks, game, run_id));
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response())
}

/// Response body: one rendered chunk per output line, then the status line.
///
/// Dropping the body (client gone) drops `chunks`, which kills the script.
fn restart_body(
    mut chunks: ChunkStream,
    game: GameKind,
    run_id: String,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    async_stream::stream! {
        let mut lines: u64 = 0;
        while let Some(chunk) = chunks.next_chunk().await {
            lines += 1;
            yield Ok::<_, Infallible>(Bytes::from(chunk.render()));
        }

        let outcome = chunks.exit_status();
        tracing::info!(
            run_id = %run_id,
            game = %game,
            lines,
            exit_code = ?outcome.and_then(|o| o.code),
            killed = outcome.is_some_and(|o| o.killed),
            "restart finished"
        );
        yield Ok(Bytes::from(status_line(outcome)));
    }
}

/// GET /:game/get_server_config (alias: /:game/get_config)
async fn get_server_config_handler(
    State(state): State<AppState>,
    Path(game): Path<String>,
) -> Result<Json<ConfigContentResponse>, HttpServerError> {
    state.record_request("/:game/get_server_config");
    read_config(&state, &game, ConfigFileKind::Server)
        .await
        .inspect_err(|_| state.record_error())
        .map(Json)
}

/// GET /:game/get_sandbox_config
async fn get_sandbox_config_handler(
    State(state): State<AppState>,
    Path(game): Path<String>,
) -> Result<Json<ConfigContentResponse>, HttpServerError> {
    state.record_request("/:game/get_sandbox_config");
    read_config(&state, &game, ConfigFileKind::Sandbox)
        .await
        .inspect_err(|_| state.record_error())
        .map(Json)
}

/// POST /:game/override_server_config (alias: /:game/override_config)
async fn override_server_config_handler(
    State(state): State<AppState>,
    Path(game): Path<String>,
    body: OverrideBody,
) -> Result<Json<OverrideConfigResponse>, HttpServerError> {
    state.record_request("/:game/override_server_config");
    override_config(&state, &game, ConfigFileKind::Server, body)
        .await
        .inspect_err(|_| state.record_error())
        .map(Json)
}

/// POST /:game/override_sandbox_config
async fn override_sandbox_config_handler(
    State(state): State<AppState>,
    Path(game): Path<String>,
    body: OverrideBody,
) -> Result<Json<OverrideConfigResponse>, HttpServerError> {
    state.record_request("/:game/override_sandbox_config");
    override_config(&state, &game, ConfigFileKind::Sandbox, body)
        .await
        .inspect_err(|_| state.record_error())
        .map(Json)
}

fn resolve_config_path(
    state: &AppState,
    game: &str,
    file: ConfigFileKind,
) -> Result<PathBuf, HttpServerError> {
    let game = validate_game(game)?;
    validate_file_kind(game, file)?;
    let cfg = state.game_config(game)?;
    config_file_path(game, cfg, file)?.ok_or_else(|| {
        HttpServerError::InvalidRequest(format!("{game} has no {} config file", file.as_str()))
    })
}

async fn read_config(
    state: &AppState,
    game: &str,
    file: ConfigFileKind,
) -> Result<ConfigContentResponse, HttpServerError> {
    let path = resolve_config_path(state, game, file)?;
    let decoded = read_config_text_with(&path, state.encodings()).await?;
    Ok(ConfigContentResponse {
        status: "success",
        content: decoded.text,
        encoding: decoded.encoding,
    })
}

async fn override_config(
    state: &AppState,
    game: &str,
    file: ConfigFileKind,
    body: OverrideBody,
) -> Result<OverrideConfigResponse, HttpServerError> {
    let path = resolve_config_path(state, game, file)?;
    let req = body.into_request(state.encodings())?;
    validate_content(&req.content)?;
    let encoding =
        overwrite_config_text_with(&path, &req.content, req.encoding, state.encodings()).await?;
    tracing::info!(game, file = file.as_str(), path = %path.display(), %encoding, "config overwritten");
    Ok(OverrideConfigResponse {
        status: "success",
        encoding,
    })
}

/// GET /games - known games, whether they are configured and their editable files
async fn games_handler(State(state): State<AppState>) -> Json<GamesResponse> {
    state.record_request("/games");
    let games = GameKind::ALL
        .into_iter()
        .map(|game| GameInfo {
            id: game.as_str(),
            configured: state.config.game(game).is_some(),
            config_files: game.config_files().iter().map(|f| f.as_str()).collect(),
        })
        .collect();
    Json(GamesResponse { games })
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    state.record_request("/health");
    let stats = state
        .stats
        .read()
        .unwrap_or_else(std::sync::PoisonError::into_inner);

    Json(HealthResponse {
        status: "healthy".into(),
        session_id: state.session_id.clone(),
        uptime_seconds: stats.uptime_seconds(),
        requests_handled: stats.requests_total,
        timestamp: Local::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use gsctl_core::api::{AppConfig, GameServerConfig, RestartConfig, TextEncoding};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    // "PublicName=你好\n" in GBK
    const GBK_INI: &[u8] = b"PublicName=\xC4\xE3\xBA\xC3\n";

    fn zomboid_state(dir: &tempfile::TempDir) -> AppState {
        let mut config = AppConfig::default();
        config.games.project_zomboid = Some(GameServerConfig {
            server_config_path: Some(dir.path().to_string_lossy().into_owned()),
            server_name: Some("servertest".into()),
            ..GameServerConfig::default()
        });
        AppState::new("test-session".into(), config)
    }

    fn palworld_state(dir: &tempfile::TempDir) -> AppState {
        let mut config = AppConfig::default();
        config.games.palworld = Some(GameServerConfig {
            server_config_path: Some(dir.path().to_string_lossy().into_owned()),
            ..GameServerConfig::default()
        });
        AppState::new("test-session".into(), config)
    }

    fn multipart_upload(field: &str, bytes: &[u8], encoding: Option<&str>) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--XBOUNDARY\r\nContent-Disposition: form-data; name=\"{field}\"; \
                 filename=\"PalWorldSettings.ini\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
        if let Some(encoding) = encoding {
            body.extend_from_slice(
                format!(
                    "--XBOUNDARY\r\nContent-Disposition: form-data; name=\"encoding\"\r\n\r\n{encoding}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(b"--XBOUNDARY--\r\n");

        Request::builder()
            .method("POST")
            .uri("/palworld/override_config")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_of(response: Response) -> (StatusCode, serde_json::Value) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn status_of(err: HttpServerError) -> StatusCode {
        err.into_response().status()
    }

    #[tokio::test]
    async fn test_health_handler() {
        let state = AppState::new("test-session".into(), AppConfig::default());
        let response = health_handler(State(state.clone())).await.0;
        assert_eq!(response.status, "healthy");
        assert_eq!(response.session_id, "test-session");
        assert_eq!(response.requests_handled, 1);
    }

    #[tokio::test]
    async fn test_games_handler_lists_all_games() {
        let dir = tempfile::tempdir().unwrap();
        let response = games_handler(State(zomboid_state(&dir))).await.0;
        let ids: Vec<&str> = response.games.iter().map(|g| g.id).collect();
        assert_eq!(ids, vec!["project_zomboid", "satisfactory", "palworld"]);
        assert!(response.games[0].configured);
        assert_eq!(response.games[0].config_files, vec!["server", "sandbox"]);
        assert!(!response.games[2].configured);
    }

    #[tokio::test]
    async fn test_get_config_detects_gbk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("servertest.ini"), GBK_INI).unwrap();
        let state = zomboid_state(&dir);

        let response = get_server_config_handler(State(state), Path("project_zomboid".into()))
            .await
            .map_err(|e| e.error_code())
            .unwrap()
            .0;
        assert_eq!(response.content, "PublicName=你好\n");
        assert_eq!(response.encoding, TextEncoding::Gbk);
    }

    #[tokio::test]
    async fn test_override_keeps_existing_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servertest.ini");
        std::fs::write(&path, GBK_INI).unwrap();
        let state = zomboid_state(&dir);

        let req = OverrideConfigRequest {
            content: "PublicName=服务器\n".into(),
            encoding: None,
        };
        let response =
            override_server_config_handler(
                State(state),
                Path("project_zomboid".into()),
                OverrideBody::Json(req),
            )
                .await
                .map_err(|e| e.error_code())
                .unwrap()
                .0;
        assert_eq!(response.encoding, TextEncoding::Gbk);

        let expected = TextEncoding::Gbk.encode("PublicName=服务器\n").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), expected);
    }

    #[tokio::test]
    async fn test_get_config_uses_configured_encoding_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("servertest.ini"), "MaxPlayers=8\n").unwrap();
        let mut config = AppConfig::default();
        config.streaming.encodings = vec![TextEncoding::Gbk, TextEncoding::Utf8];
        config.games.project_zomboid = Some(GameServerConfig {
            server_config_path: Some(dir.path().to_string_lossy().into_owned()),
            server_name: Some("servertest".into()),
            ..GameServerConfig::default()
        });
        let state = AppState::new("test-session".into(), config);
        assert_eq!(state.encodings(), &[TextEncoding::Gbk, TextEncoding::Utf8]);

        let response = get_server_config_handler(State(state), Path("project_zomboid".into()))
            .await
            .map_err(|e| e.error_code())
            .unwrap()
            .0;
        assert_eq!(response.content, "MaxPlayers=8\n");
        assert_eq!(response.encoding, TextEncoding::Gbk);
    }

    #[tokio::test]
    async fn test_utf8_only_order_rejects_gbk_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("servertest.ini"), GBK_INI).unwrap();
        let mut config = AppConfig::default();
        config.streaming.encodings = vec![TextEncoding::Utf8];
        config.games.project_zomboid = Some(GameServerConfig {
            server_config_path: Some(dir.path().to_string_lossy().into_owned()),
            server_name: Some("servertest".into()),
            ..GameServerConfig::default()
        });
        let state = AppState::new("test-session".into(), config);

        let err = get_server_config_handler(State(state), Path("project_zomboid".into()))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn test_multipart_upload_is_decoded_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PalWorldSettings.ini");
        std::fs::write(&path, "ServerName=old\n").unwrap();
        let router = create_router(palworld_state(&dir));

        // "ServerName=你好\n" uploaded as GBK, existing file is UTF-8
        let upload = b"ServerName=\xC4\xE3\xBA\xC3\n";
        let response = router
            .oneshot(multipart_upload("file", upload, None))
            .await
            .unwrap();
        let (status, body) = json_of(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "success");
        assert_eq!(body["encoding"], "utf-8");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "ServerName=你好\n");
    }

    #[tokio::test]
    async fn test_multipart_config_field_with_forced_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PalWorldSettings.ini");
        let router = create_router(palworld_state(&dir));

        let upload = "ServerName=你好\n".as_bytes();
        let response = router
            .oneshot(multipart_upload("config", upload, Some("gbk")))
            .await
            .unwrap();
        let (status, body) = json_of(response).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["encoding"], "gbk");
        assert_eq!(std::fs::read(&path).unwrap(), b"ServerName=\xC4\xE3\xBA\xC3\n");
    }

    #[tokio::test]
    async fn test_multipart_without_file_field_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let router = create_router(palworld_state(&dir));

        let response = router
            .oneshot(multipart_upload("notes", b"hello", None))
            .await
            .unwrap();
        let (status, body) = json_of(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_code"], "INVALID_REQUEST");
        assert!(!dir.path().join("PalWorldSettings.ini").exists());
    }

    #[tokio::test]
    async fn test_json_body_above_default_limit_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("PalWorldSettings.ini");
        let router = create_router(palworld_state(&dir));

        let content = "a".repeat(3 * 1024 * 1024);
        let body = serde_json::json!({ "content": content }).to_string();
        let request = Request::builder()
            .method("POST")
            .uri("/palworld/override_config")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();

        let (status, _) = json_of(router.oneshot(request).await.unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 3 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_missing_sandbox_file_is_404_fail() {
        let dir = tempfile::tempdir().unwrap();
        let state = zomboid_state(&dir);

        let err = get_sandbox_config_handler(State(state.clone()), Path("project_zomboid".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, HttpServerError::FileMissing(_)));
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);

        let stats = state.stats.read().unwrap();
        assert_eq!(stats.errors_total, 1);
    }

    #[tokio::test]
    async fn test_unknown_game_and_unsupported_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = zomboid_state(&dir);

        let err = get_server_config_handler(State(state.clone()), Path("minecraft".into()))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "GAME_NOT_FOUND");

        let err = get_sandbox_config_handler(State(state), Path("palworld".into()))
            .await
            .unwrap_err();
        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }

    #[cfg(unix)]
    fn satisfactory_state(dir: &tempfile::TempDir, script_body: &str, shell: &str) -> AppState {
        let script = dir.path().join("restart.sh");
        std::fs::write(&script, script_body).unwrap();

        let mut config = AppConfig::default();
        config.restart = RestartConfig {
            shell: shell.into(),
            shell_args: vec![],
        };
        config.games.satisfactory = Some(GameServerConfig {
            server_path: Some("/srv/satisfactory".into()),
            restart_script_path: Some(script.to_string_lossy().into_owned()),
            ..GameServerConfig::default()
        });
        AppState::new("test-session".into(), config)
    }

    #[cfg(unix)]
    async fn restart_text(state: AppState) -> (StatusCode, String) {
        let response = match restart_handler(
            State(state),
            Path("satisfactory".into()),
            Query(RestartQuery::default()),
        )
        .await
        {
            Ok(response) => response,
            Err(e) => panic!("restart failed: {}", e.error_code()),
        };
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_restart_streams_output_then_done() {
        let dir = tempfile::tempdir().unwrap();
        let state = satisfactory_state(&dir, "echo \"args: $*\"\n", "sh");

        let (status, text) = restart_text(state.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            text,
            "args: -ServerStartPath /srv/satisfactory\n[Done] exit code 0\n"
        );
        assert_eq!(state.stats.read().unwrap().restarts_started, 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_restart_failure_reports_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let state = satisfactory_state(&dir, "echo boom\nprintf '\\377\\n'\nexit 3\n", "sh");

        let (_, text) = restart_text(state).await;
        assert_eq!(
            text,
            "boom\n[Decode Error] \\xff\n[Failed] exit code 3\n"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_restart_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let state = satisfactory_state(&dir, "echo never\n", "/definitely/missing/shell");

        let result = restart_handler(
            State(state),
            Path("satisfactory".into()),
            Query(RestartQuery::default()),
        )
        .await;
        match result {
            Err(e) => {
                assert_eq!(e.error_code(), "SPAWN_FAILURE");
                assert_eq!(status_of(e), StatusCode::INTERNAL_SERVER_ERROR);
            }
            Ok(_) => panic!("spawn should have failed"),
        }
    }
}
