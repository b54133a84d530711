//! Shared HTTP server state

use chrono::{DateTime, Local};
use gsctl_core::api::{
    AppConfig, GameKind, GameServerConfig, OutputStreamer, StreamOptions, TextEncoding,
};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::models::HttpServerError;

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub session_id: String,
    pub config: Arc<AppConfig>,
    pub streamer: OutputStreamer,
    pub stats: Arc<RwLock<ServerStats>>,
}

impl AppState {
    pub fn new(session_id: String, config: AppConfig) -> Self {
        let streamer = OutputStreamer::new(StreamOptions::from(&config.streaming));
        Self {
            session_id,
            config: Arc::new(config),
            streamer,
            stats: Arc::new(RwLock::new(ServerStats::new())),
        }
    }

    /// Decode order for child output and config files.
    pub fn encodings(&self) -> &[TextEncoding] {
        &self.streamer.options().encodings
    }

    pub fn record_request(&self, endpoint: &str) {
        self.stats
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .increment_request(endpoint);
    }

    pub fn record_error(&self) {
        self.stats
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .increment_error();
    }

    pub fn game_config(&self, game: GameKind) -> Result<&GameServerConfig, HttpServerError> {
        self.config.game(game).ok_or_else(|| {
            HttpServerError::GameNotConfigured(format!("game '{game}' is not configured"))
        })
    }
}

/// Server statistics
pub struct ServerStats {
    pub requests_total: u64,
    pub requests_by_endpoint: HashMap<String, u64>,
    pub errors_total: u64,
    pub restarts_started: u64,
    pub start_time: DateTime<Local>,
}

impl ServerStats {
    pub fn new() -> Self {
        Self {
            requests_total: 0,
            requests_by_endpoint: HashMap::new(),
            errors_total: 0,
            restarts_started: 0,
            start_time: Local::now(),
        }
    }

    pub fn increment_request(&mut self, endpoint: &str) {
        self.requests_total += 1;
        *self
            .requests_by_endpoint
            .entry(endpoint.to_string())
            .or_insert(0) += 1;
    }

    pub fn increment_error(&mut self) {
        self.errors_total += 1;
    }

    pub fn uptime_seconds(&self) -> f64 {
        let now = Local::now();
        (now - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_stats_new() {
        let stats = ServerStats::new();
        assert_eq!(stats.requests_total, 0);
        assert_eq!(stats.errors_total, 0);
        assert!(stats.uptime_seconds() < 1.0);
    }

    #[test]
    fn test_increment_request() {
        let mut stats = ServerStats::new();
        stats.increment_request("/:game/restart");
        stats.increment_request("/:game/restart");
        stats.increment_request("/health");

        assert_eq!(stats.requests_total, 3);
        assert_eq!(stats.requests_by_endpoint["/:game/restart"], 2);
        assert_eq!(stats.requests_by_endpoint["/health"], 1);
    }

    #[test]
    fn test_unconfigured_game() {
        let state = AppState::new("s".into(), AppConfig::default());
        let err = state.game_config(GameKind::PalWorld).unwrap_err();
        assert_eq!(err.error_code(), "GAME_NOT_CONFIGURED");
    }
}
