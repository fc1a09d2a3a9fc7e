use std::env;
use std::path::PathBuf;

use super::utils::parse_bool;
use super::{AgentConfig, SmartTurnMode};

use crate::errors::AgentError;

impl AgentConfig {
    /// Load configuration from environment variables
    ///
    /// Reads configuration from environment variables, with sensible
    /// defaults. Also loads from a .env file if present using dotenvy.
    ///
    /// # Errors
    /// Returns an error if:
    /// - `GOOGLE_API_KEY` is missing or empty
    /// - Numeric variables (`PORT`, `SMART_TURN_TIMEOUT_MS`,
    ///   `IDLE_TIMEOUT_SECONDS`) are malformed
    /// - `SMART_TURN_MODE` is not one of `local`, `cloud`, `http`
    pub fn from_env() -> Result<Self, AgentError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        // Server configuration
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .map_err(|e| AgentError::Configuration(format!("Invalid port number: {e}")))?;

        // Generator configuration
        let google_api_key = env::var("GOOGLE_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                AgentError::Configuration("GOOGLE_API_KEY must be set".to_string())
            })?;
        let google_model =
            env::var("GOOGLE_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string());

        // Smart endpointing configuration
        let enable_smart_endpointing = env::var("ENABLE_SMART_ENDPOINTING")
            .ok()
            .and_then(|v| parse_bool(&v))
            .unwrap_or(true);
        let smart_turn_mode = match env::var("SMART_TURN_MODE") {
            Ok(raw) => SmartTurnMode::parse(&raw).ok_or_else(|| {
                AgentError::Configuration(format!(
                    "Invalid SMART_TURN_MODE '{raw}'. Must be 'local', 'cloud' or 'http'"
                ))
            })?,
            Err(_) => SmartTurnMode::default(),
        };
        let smart_turn_url = env::var("SMART_TURN_URL").ok();
        let smart_turn_api_key = env::var("SMART_TURN_API_KEY").ok();
        let smart_turn_timeout_ms = env::var("SMART_TURN_TIMEOUT_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u64>()
            .map_err(|e| {
                AgentError::Configuration(format!("Invalid SMART_TURN_TIMEOUT_MS: {e}"))
            })?;

        // Session configuration
        let idle_timeout_secs = env::var("IDLE_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "2.0".to_string())
            .parse::<f64>()
            .map_err(|e| AgentError::Configuration(format!("Invalid IDLE_TIMEOUT_SECONDS: {e}")))?;
        if !idle_timeout_secs.is_finite() || idle_timeout_secs <= 0.0 {
            return Err(AgentError::Configuration(
                "IDLE_TIMEOUT_SECONDS must be a positive number".to_string(),
            ));
        }
        let default_category =
            env::var("INTERVIEW_DEFAULT_CATEGORY").unwrap_or_else(|_| "Software".to_string());
        let default_subtitle = env::var("INTERVIEW_DEFAULT_SUBTITLE").ok();

        // Content paths
        let flow_prompt_path = env::var("FLOW_PROMPT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("assets/flow_prompt.md"));
        let flow_spec_path = env::var("FLOW_SPEC_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("assets/flow.json"));
        let templates_path = env::var("TEMPLATES_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("assets/templates.json"));
        let static_asset_mount = env::var("STATIC_ASSET_MOUNT")
            .ok()
            .filter(|v| !v.trim().is_empty() && v.trim() != "disabled")
            .map(PathBuf::from);

        Ok(AgentConfig {
            host,
            port,
            google_api_key,
            google_model,
            enable_smart_endpointing,
            smart_turn_mode,
            smart_turn_url,
            smart_turn_api_key,
            smart_turn_timeout_ms,
            idle_timeout_secs,
            default_category,
            default_subtitle,
            flow_prompt_path,
            flow_spec_path,
            templates_path,
            static_asset_mount,
        })
    }
}
