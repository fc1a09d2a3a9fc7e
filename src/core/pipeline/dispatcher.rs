//! Event dispatcher
//!
//! Transport-facing front door of a session. Translates app messages and
//! connection lifecycle into conversation events, forwards bootstrap
//! triggers into the pipeline and runs the idle monitor that nudges the
//! gate open when the generation stream goes quiet.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::core::bootstrap::SessionBootstrap;
use crate::core::events::ConversationEvent;
use crate::core::session::Message;

use super::router::BranchRouter;
use super::ConversationPipeline;

/// A message from the client application, all fields optional so one frame
/// can carry any combination of template, language, questions and text.
#[derive(Debug, Default, Deserialize)]
pub struct AppMessage {
    pub template: Option<String>,
    pub language: Option<String>,
    pub questions: Option<QuestionPayload>,
    pub message: Option<String>,
}

/// Client question payloads arrive either as one newline-separated string
/// or as a list of strings or `{"question": ...}` objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum QuestionPayload {
    Text(String),
    List(Vec<QuestionEntry>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum QuestionEntry {
    Text(String),
    Structured { question: String },
}

impl QuestionPayload {
    pub fn normalize(&self) -> Vec<String> {
        match self {
            QuestionPayload::Text(text) => text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            QuestionPayload::List(entries) => entries
                .iter()
                .map(|entry| match entry {
                    QuestionEntry::Text(q) => q.trim().to_string(),
                    QuestionEntry::Structured { question } => question.trim().to_string(),
                })
                .filter(|q| !q.is_empty())
                .collect(),
        }
    }
}

pub struct EventDispatcher {
    bootstrap: Arc<SessionBootstrap>,
    pipeline: ConversationPipeline,
    router: Arc<BranchRouter>,
    activity_tx: mpsc::Sender<()>,
    idle_task: JoinHandle<()>,
}

impl EventDispatcher {
    pub fn new(
        bootstrap: Arc<SessionBootstrap>,
        pipeline: ConversationPipeline,
        idle_timeout: Duration,
    ) -> Self {
        let router = pipeline.router();
        let (activity_tx, activity_rx) = mpsc::channel(16);
        let idle_task = tokio::spawn(idle_monitor(idle_timeout, activity_rx, router.clone()));

        Self {
            bootstrap,
            pipeline,
            router,
            activity_tx,
            idle_task,
        }
    }

    pub fn bootstrap(&self) -> &Arc<SessionBootstrap> {
        &self.bootstrap
    }

    /// Feed an event into the pipeline. Generation triggers also reset the
    /// idle monitor, so the idle window measures the gap between triggers.
    pub async fn inject(&self, event: ConversationEvent) {
        if event.is_generation_trigger() {
            let _ = self.activity_tx.send(()).await;
        }
        self.router.dispatch(event).await;
    }

    pub async fn on_client_connected(&self) {
        if let Some(trigger) = self.bootstrap.on_client_connected() {
            self.inject(trigger).await;
        }
    }

    pub async fn on_app_message(&self, message: AppMessage) {
        if let Some(template) = message.template.as_deref() {
            if let Some(trigger) = self.bootstrap.on_template_received(template) {
                self.inject(trigger).await;
            }
        }
        if let Some(language) = message.language.as_deref() {
            self.bootstrap.on_language_received(language);
        }
        if let Some(questions) = &message.questions {
            if let Some(trigger) = self.bootstrap.on_questions_received(&questions.normalize()) {
                self.inject(trigger).await;
            }
        }
        if let Some(text) = message.message.as_deref() {
            self.on_user_text(text).await;
        }
    }

    /// Synthesize the speech-event sequence for typed text so it exercises
    /// the same endpointing and generation path as a spoken turn.
    async fn on_user_text(&self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.bootstrap.is_started() {
            debug!("Dropping user text before conversation start");
            return;
        }

        self.inject(ConversationEvent::UserStartedSpeaking).await;
        self.inject(ConversationEvent::Transcription {
            text: text.to_string(),
            timestamp_ms: now_ms(),
        })
        .await;
        self.inject(ConversationEvent::UserStoppedSpeaking).await;
        self.inject(ConversationEvent::MessagesAppend {
            messages: vec![Message::user(text)],
        })
        .await;
    }

    /// Transport gone: stop the idle monitor and cancel the pipeline.
    /// Nothing buffered in the gate is flushed.
    pub fn on_disconnected(&mut self) {
        info!(session = %self.bootstrap.session().id(), "Session disconnected");
        self.idle_task.abort();
        self.pipeline.shutdown();
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.idle_task.abort();
    }
}

async fn idle_monitor(
    idle_timeout: Duration,
    mut activity: mpsc::Receiver<()>,
    router: Arc<BranchRouter>,
) {
    loop {
        match tokio::time::timeout(idle_timeout, activity.recv()).await {
            // Window elapsed with no trigger activity.
            Err(_) => router.dispatch(ConversationEvent::IdleTimeout).await,
            Ok(Some(())) => {}
            Ok(None) => return,
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_message_parses_partial_frames() {
        let msg: AppMessage = serde_json::from_str(r#"{"template": "backend"}"#).unwrap();
        assert_eq!(msg.template.as_deref(), Some("backend"));
        assert!(msg.message.is_none());

        let msg: AppMessage =
            serde_json::from_str(r#"{"message": "hi", "language": "Spanish"}"#).unwrap();
        assert_eq!(msg.message.as_deref(), Some("hi"));
        assert_eq!(msg.language.as_deref(), Some("Spanish"));
    }

    #[test]
    fn questions_normalize_from_all_shapes() {
        let text: QuestionPayload =
            serde_json::from_str(r#""One\n\n  Two  \nThree""#).unwrap();
        assert_eq!(text.normalize(), vec!["One", "Two", "Three"]);

        let list: QuestionPayload =
            serde_json::from_str(r#"["A", {"question": " B "}, ""]"#).unwrap();
        assert_eq!(list.normalize(), vec!["A", "B"]);
    }
}
