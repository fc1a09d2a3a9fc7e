//! Utterance-completeness classification (smart endpointing)
//!
//! The endpointing branch asks an external classifier whether the user has
//! finished speaking before the gate releases the generated response.
//! Classification is best-effort: errors and timeouts are treated as an
//! implicit "complete" (fail-open) so a flaky classifier can add latency
//! but never stall the conversation.

pub mod http;
pub mod local;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{AgentConfig, SmartTurnMode};

pub use http::HttpClassifier;
pub use local::HeuristicClassifier;

/// Hosted classifier endpoint used in `cloud` mode.
const CLOUD_CLASSIFIER_URL: &str = "https://smart-turn.fal.run/v1/classify";

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected classifier response: {0}")]
    InvalidResponse(String),
}

/// Narrow request/response contract with the completeness model.
#[async_trait]
pub trait CompletenessClassifier: Send + Sync {
    /// Judge whether the utterance is a complete statement.
    async fn is_utterance_complete(&self, utterance: &str) -> Result<bool, ClassifierError>;

    fn provider_info(&self) -> &'static str;
}

/// Result of running the completeness check around the classifier call.
pub enum CompletenessOutcome {
    /// Utterance judged complete; open the gate. Carries the detection
    /// method for logging.
    Complete(&'static str),
    /// Utterance judged incomplete; keep the gate closed and wait.
    Incomplete,
    /// Nothing to judge (empty utterance); no signal either way.
    Skipped,
}

/// Run the classifier with a hard timeout and fail-open semantics.
pub async fn run_completeness_check(
    timeout_ms: u64,
    classifier: &dyn CompletenessClassifier,
    utterance: &str,
) -> CompletenessOutcome {
    let utterance = utterance.trim();
    if utterance.is_empty() {
        debug!("Completeness check skipped: empty utterance");
        return CompletenessOutcome::Skipped;
    }

    let result = tokio::time::timeout(
        Duration::from_millis(timeout_ms),
        classifier.is_utterance_complete(utterance),
    )
    .await;

    match result {
        Ok(Ok(true)) => {
            info!(
                "Completeness check: utterance complete ({} chars)",
                utterance.len()
            );
            CompletenessOutcome::Complete("classifier_confirmed")
        }
        Ok(Ok(false)) => {
            info!("Completeness check: utterance incomplete - waiting for more input");
            CompletenessOutcome::Incomplete
        }
        Ok(Err(e)) => {
            warn!("Completeness check error: {:?} - opening anyway", e);
            CompletenessOutcome::Complete("classifier_error_fallback")
        }
        Err(_) => {
            warn!(
                "Completeness check timeout after {}ms - opening anyway",
                timeout_ms
            );
            CompletenessOutcome::Complete("classifier_timeout_fallback")
        }
    }
}

/// Build the configured classifier, or `None` when smart endpointing is
/// disabled or its transport is missing credentials.
pub fn from_config(config: &AgentConfig) -> Option<Arc<dyn CompletenessClassifier>> {
    if !config.enable_smart_endpointing {
        info!("Smart endpointing disabled (faster responses, may have turn detection issues)");
        return None;
    }

    match config.smart_turn_mode {
        SmartTurnMode::Local => {
            info!("Smart endpointing enabled (local heuristic)");
            Some(Arc::new(HeuristicClassifier::new()))
        }
        SmartTurnMode::Http => match config.smart_turn_url.as_deref() {
            Some(url) if !url.trim().is_empty() => {
                info!("Smart endpointing enabled (HTTP): url={}", url);
                Some(Arc::new(HttpClassifier::new(
                    url.to_string(),
                    config.smart_turn_api_key.clone(),
                )))
            }
            _ => {
                warn!("SMART_TURN_MODE=http but SMART_TURN_URL is not set; disabling smart endpointing");
                None
            }
        },
        SmartTurnMode::Cloud => match config.smart_turn_api_key.clone() {
            Some(api_key) if !api_key.trim().is_empty() => {
                info!("Smart endpointing enabled (cloud)");
                Some(Arc::new(HttpClassifier::new(
                    CLOUD_CLASSIFIER_URL.to_string(),
                    Some(api_key),
                )))
            }
            _ => {
                warn!("SMART_TURN_MODE=cloud but SMART_TURN_API_KEY is not set; disabling smart endpointing");
                None
            }
        },
    }
}
