//! Configuration module for the turn orchestration server
//!
//! Configuration comes from environment variables (with a `.env` file
//! loaded via dotenvy when present). Defaults are chosen so the server
//! runs locally with nothing but `GOOGLE_API_KEY` set.
//!
//! # Modules
//! - `env`: Environment variable loading
//! - `utils`: Utility functions for configuration parsing

use std::path::PathBuf;
use std::time::Duration;

mod env;
mod utils;

pub use utils::parse_bool;

/// Transport used for the utterance-completeness classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmartTurnMode {
    /// Punctuation heuristic, no network calls.
    #[default]
    Local,
    /// Hosted classifier service, keyed by `SMART_TURN_API_KEY`.
    Cloud,
    /// Self-hosted classifier at `SMART_TURN_URL`.
    Http,
}

impl SmartTurnMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Some(SmartTurnMode::Local),
            "cloud" => Some(SmartTurnMode::Cloud),
            "http" => Some(SmartTurnMode::Http),
            _ => None,
        }
    }
}

/// Agent server configuration
///
/// Contains everything needed to run the orchestration server:
/// - Server settings (host, port)
/// - Generator settings (Google API key and model)
/// - Smart endpointing settings (mode, transport, timeout)
/// - Session settings (idle window, default template)
/// - Content paths (flow prompt, flow graph, template catalog, static assets)
#[derive(Debug, Clone)]
pub struct AgentConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // Generator settings
    pub google_api_key: String,
    pub google_model: String,

    // Smart endpointing settings
    pub enable_smart_endpointing: bool,
    pub smart_turn_mode: SmartTurnMode,
    pub smart_turn_url: Option<String>,
    pub smart_turn_api_key: Option<String>,
    pub smart_turn_timeout_ms: u64,

    // Session settings
    pub idle_timeout_secs: f64,
    pub default_category: String,
    pub default_subtitle: Option<String>,

    // Content paths
    pub flow_prompt_path: PathBuf,
    pub flow_spec_path: PathBuf,
    pub templates_path: PathBuf,
    pub static_asset_mount: Option<PathBuf>, // if None, no client bundle is served
}

impl AgentConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.idle_timeout_secs)
    }
}
