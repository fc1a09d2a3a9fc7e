//! Session bootstrap state machine
//!
//! Guarantees exactly one conversation start per session no matter how
//! `ClientConnected` and `TemplateReceived` interleave, and keeps template
//! application monotonic: each application fully replaces the previous one.
//!
//! The start flag is a genuine test-and-set; whichever event wins the
//! compare-exchange emits the single greeting trigger and the loser's
//! greeting downgrades to a no-op while its history side effects still
//! apply.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use super::catalog::TemplateCatalog;
use super::events::ConversationEvent;
use super::session::{Message, Session};

const GREETING_PROMPT: &str = "Please introduce yourself now and begin the interview. \
    Start with a warm greeting, briefly introduce yourself as an AI interviewer. \
    Then ask the candidate to confirm their name and the role they're interviewing for. \
    IMPORTANT: Do NOT assume or state the role yourself - let the candidate tell you. \
    After they confirm, acknowledge their response and proceed naturally with the \
    interview flow. Keep your introduction concise and friendly.";

/// Maximum number of client-provided questions injected into the context.
const MAX_INJECTED_QUESTIONS: usize = 20;

pub struct SessionBootstrap {
    session: Arc<Session>,
    catalog: Arc<TemplateCatalog>,
    started: AtomicBool,
}

impl SessionBootstrap {
    pub fn new(session: Arc<Session>, catalog: Arc<TemplateCatalog>) -> Self {
        Self {
            session,
            catalog,
            started: AtomicBool::new(false),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Atomically claim the single conversation start. Returns true for
    /// the one caller that wins.
    fn try_start(&self) -> bool {
        self.started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Transport connected. The winning call appends the greeting prompt
    /// and emits the begin-generation trigger; a raced duplicate is a
    /// no-op by design.
    pub fn on_client_connected(&self) -> Option<ConversationEvent> {
        if !self.try_start() {
            return None;
        }
        info!(session = %self.session.id(), "Starting conversation (trigger: client-connected)");
        self.session.append(Message::user(GREETING_PROMPT));
        Some(ConversationEvent::BeginGeneration)
    }

    /// A template was requested by subtitle.
    ///
    /// On a catalog hit the session history grows by exactly two entries
    /// (override + tentative-role guardrail); the trigger is either the
    /// single greeting (if this event wins the start race) or a context
    /// update (if the conversation is already running). On a miss a single
    /// not-found notice is appended and no trigger is emitted.
    pub fn on_template_received(&self, query: &str) -> Option<ConversationEvent> {
        let Some((category, template)) = self.catalog.find_by_subtitle(query) else {
            warn!(session = %self.session.id(), "Template titled '{}' not found", query);
            self.session.append(Message::system(format!(
                "Template titled '{query}' not found. Continue with current template."
            )));
            return None;
        };

        info!(
            session = %self.session.id(),
            category, sub_title = %template.sub_title,
            "Applying interview template"
        );
        let sub_title = template.sub_title.clone();
        self.session.apply_template(category, template);

        if self.try_start() {
            info!(session = %self.session.id(), "Starting conversation (trigger: template-selected)");
            self.session.append(Message::user(format!(
                "{GREETING_PROMPT} (Template will be used: {sub_title})"
            )));
            Some(ConversationEvent::BeginGeneration)
        } else {
            Some(ConversationEvent::ContextUpdated)
        }
    }

    /// Language preference: appends a single instruction, no trigger.
    pub fn on_language_received(&self, language: &str) {
        let language = language.trim();
        if language.is_empty() {
            return;
        }
        self.session
            .append(Message::system(format!("Speak in {language}.")));
    }

    /// Client-supplied question list: appended as one numbered context
    /// entry, capped to the first twenty. Counts as a context update when
    /// the conversation is already running.
    pub fn on_questions_received(&self, questions: &[String]) -> Option<ConversationEvent> {
        let numbered: Vec<String> = questions
            .iter()
            .filter(|q| !q.trim().is_empty())
            .take(MAX_INJECTED_QUESTIONS)
            .enumerate()
            .map(|(i, q)| format!("{}. {}", i + 1, q.trim()))
            .collect();
        if numbered.is_empty() {
            return None;
        }

        self.session.append(Message::system(format!(
            "INTERVIEW QUESTIONS:\n{}",
            numbered.join("\n")
        )));

        self.is_started().then_some(ConversationEvent::ContextUpdated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::Template;

    fn catalog() -> Arc<TemplateCatalog> {
        Arc::new(TemplateCatalog::new(vec![(
            "Software".to_string(),
            vec![
                Template {
                    sub_title: "Backend Engineer".to_string(),
                    difficulty: Some("medium".to_string()),
                    duration_minutes: Some(30),
                    questions: vec!["Q1".to_string()],
                },
                Template {
                    sub_title: "Frontend Engineer".to_string(),
                    difficulty: None,
                    duration_minutes: None,
                    questions: vec![],
                },
            ],
        )]))
    }

    fn bootstrap() -> SessionBootstrap {
        SessionBootstrap::new(Arc::new(Session::new(None)), catalog())
    }

    #[test]
    fn client_connected_starts_once() {
        let bootstrap = bootstrap();

        let first = bootstrap.on_client_connected();
        assert_eq!(first, Some(ConversationEvent::BeginGeneration));
        assert!(bootstrap.is_started());
        assert_eq!(bootstrap.session().history_len(), 1);

        // A raced duplicate is a no-op.
        assert_eq!(bootstrap.on_client_connected(), None);
        assert_eq!(bootstrap.session().history_len(), 1);
    }

    #[test]
    fn template_received_while_idle_starts_with_template_greeting() {
        let bootstrap = bootstrap();

        let trigger = bootstrap.on_template_received("backend");
        assert_eq!(trigger, Some(ConversationEvent::BeginGeneration));
        assert!(bootstrap.is_started());

        // Override + guardrail + template-aware greeting.
        let history = bootstrap.session().history_snapshot();
        assert_eq!(history.len(), 3);
        assert!(history[2].content.contains("Template will be used: Backend Engineer"));

        // The later connect does not greet again.
        assert_eq!(bootstrap.on_client_connected(), None);
        assert_eq!(bootstrap.session().history_len(), 3);
    }

    #[test]
    fn template_hot_swap_after_start_grows_history_by_two() {
        let bootstrap = bootstrap();
        bootstrap.on_client_connected();
        let before = bootstrap.session().history_len();

        let trigger = bootstrap.on_template_received("frontend");
        assert_eq!(trigger, Some(ConversationEvent::ContextUpdated));
        assert_eq!(bootstrap.session().history_len(), before + 2);

        let applied = bootstrap.session().applied_template().unwrap();
        assert_eq!(applied.template.sub_title, "Frontend Engineer");
    }

    #[test]
    fn unknown_template_appends_single_notice_without_trigger() {
        let bootstrap = SessionBootstrap::new(
            Arc::new(Session::new(None)),
            Arc::new(TemplateCatalog::default()),
        );

        assert_eq!(bootstrap.on_template_received("ghost"), None);
        assert!(!bootstrap.is_started());

        let history = bootstrap.session().history_snapshot();
        assert_eq!(history.len(), 1);
        assert!(history[0].content.contains("'ghost' not found"));
    }

    #[test]
    fn language_appends_single_entry() {
        let bootstrap = bootstrap();
        bootstrap.on_language_received("Spanish");
        let history = bootstrap.session().history_snapshot();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "Speak in Spanish.");

        bootstrap.on_language_received("   ");
        assert_eq!(bootstrap.session().history_len(), 1);
    }

    #[test]
    fn questions_capped_and_trigger_only_after_start() {
        let bootstrap = bootstrap();
        let questions: Vec<String> = (1..=25).map(|i| format!("Question {i}")).collect();

        assert_eq!(bootstrap.on_questions_received(&questions), None);
        let entry = &bootstrap.session().history_snapshot()[0];
        assert!(entry.content.contains("20. Question 20"));
        assert!(!entry.content.contains("Question 21"));

        bootstrap.on_client_connected();
        assert_eq!(
            bootstrap.on_questions_received(&questions),
            Some(ConversationEvent::ContextUpdated)
        );
    }

    #[test]
    fn concurrent_connect_and_template_yield_one_greeting() {
        for _ in 0..50 {
            let bootstrap = Arc::new(bootstrap());

            let a = {
                let b = bootstrap.clone();
                std::thread::spawn(move || b.on_client_connected())
            };
            let b = {
                let b = bootstrap.clone();
                std::thread::spawn(move || b.on_template_received("backend"))
            };

            let triggers = [a.join().unwrap(), b.join().unwrap()];
            let greetings = triggers
                .iter()
                .filter(|t| matches!(t, Some(ConversationEvent::BeginGeneration)))
                .count();
            assert_eq!(greetings, 1, "exactly one greeting trigger per session");
            assert!(bootstrap.is_started());
        }
    }
}
