use std::sync::Arc;

use tracing::{info, warn};

use crate::config::AgentConfig;
use crate::core::bootstrap::SessionBootstrap;
use crate::core::catalog::TemplateCatalog;
use crate::core::classifier::{self, CompletenessClassifier};
use crate::core::flow;
use crate::core::generator::{GeminiGenerator, ResponseGenerator};
use crate::core::prompt;
use crate::core::session::Session;

/// Application state shared across handlers
///
/// Everything here is loaded once at startup; per-connection state lives
/// in the session created by `new_bootstrap`.
#[derive(Clone)]
pub struct AppState {
    pub config: AgentConfig,
    /// Interview template catalog, shared by every session
    pub catalog: Arc<TemplateCatalog>,
    /// Composed system prompt (sanitized instructions plus flow summary)
    pub system_prompt: String,
    /// Completeness classifier, absent when smart endpointing is off
    pub classifier: Option<Arc<dyn CompletenessClassifier>>,
    /// Response generator backing every conversation branch
    pub generator: Arc<dyn ResponseGenerator>,
}

impl AppState {
    pub fn new(config: AgentConfig) -> Arc<Self> {
        let raw_instructions = match std::fs::read_to_string(&config.flow_prompt_path) {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    path = %config.flow_prompt_path.display(),
                    "Failed to read flow prompt, continuing without instructions: {e}"
                );
                String::new()
            }
        };
        let flow = flow::load_flow(&config.flow_spec_path);
        let system_prompt = prompt::compose(&raw_instructions, &flow);

        let catalog = Arc::new(TemplateCatalog::load(&config.templates_path));
        match catalog.default_template(&config.default_category, config.default_subtitle.as_deref())
        {
            Some((category, template)) => {
                info!(category, sub_title = %template.sub_title, "Default interview template");
            }
            None => warn!("Template catalog is empty; sessions start without a template"),
        }

        let classifier = classifier::from_config(&config);
        let generator: Arc<dyn ResponseGenerator> = Arc::new(GeminiGenerator::new(
            config.google_api_key.clone(),
            config.google_model.clone(),
        ));
        info!(provider = generator.provider_info(), "Response generator ready");

        Arc::new(Self {
            config,
            catalog,
            system_prompt,
            classifier,
            generator,
        })
    }

    /// Create the bootstrap for a fresh connection: a new session seeded
    /// with the system prompt only. The default template is logged at
    /// startup but never pre-applied; the concrete template arrives from
    /// the client at runtime, so a fresh session must not assert a role
    /// the user never selected.
    pub fn new_bootstrap(&self) -> Arc<SessionBootstrap> {
        let session = Arc::new(Session::new(Some(self.system_prompt.clone())));
        Arc::new(SessionBootstrap::new(session, self.catalog.clone()))
    }
}
