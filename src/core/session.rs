//! Per-session conversation state
//!
//! A `Session` owns the append-only message history and the currently
//! applied interview template. It is created per transport connection and
//! passed explicitly to the bootstrap and pipeline at construction time;
//! there is no process-wide session registry.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::catalog::Template;

/// Message author role, OpenAI-style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One entry in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The template currently applied to a session, with its catalog category.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedTemplate {
    pub category: String,
    pub template: Template,
}

/// A single active conversation session.
///
/// The history is an append-only sequence; insertion order is causal order.
/// Appends from the bootstrap and from branch-result handlers are
/// serialized through the mutex, so there is a single concurrent writer at
/// a time even under parallel branch execution.
pub struct Session {
    id: String,
    history: Mutex<Vec<Message>>,
    applied_template: Mutex<Option<AppliedTemplate>>,
}

impl Session {
    /// Create a fresh session, optionally seeding the history with a
    /// composed system prompt.
    pub fn new(system_prompt: Option<String>) -> Self {
        let mut history = Vec::new();
        if let Some(prompt) = system_prompt {
            if !prompt.is_empty() {
                history.push(Message::system(prompt));
            }
        }
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            history: Mutex::new(history),
            applied_template: Mutex::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn append(&self, message: Message) {
        self.history.lock().push(message);
    }

    pub fn append_all(&self, messages: impl IntoIterator<Item = Message>) {
        self.history.lock().extend(messages);
    }

    /// Snapshot of the history in insertion order.
    pub fn history_snapshot(&self) -> Vec<Message> {
        self.history.lock().clone()
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }

    /// Apply a template to the session.
    ///
    /// Replaces any previously applied template and appends exactly two
    /// history entries: the template-override message and the
    /// tentative-role guardrail. Each new application fully supersedes the
    /// previous one in the composed context.
    pub fn apply_template(&self, category: &str, template: &Template) {
        let payload = json!({
            "category": category,
            "subTitle": template.sub_title,
            "difficulty": template.difficulty,
            "duration_minutes": template.duration_minutes,
            "questions": template.questions,
        });

        let override_msg = Message::system(format!(
            "Use the following interview template (overrides any previous template):\n{payload}"
        ));
        let guardrail = Message::system(
            "IMPORTANT: Treat the above role as tentative until the candidate confirms. \
             When you greet, ask the candidate to confirm their name and the role they are \
             interviewing for. Do NOT restate or assert the role yourself until they confirm. \
             If the candidate states a different role than the template, politely acknowledge \
             the correction, update your understanding to that role, and continue accordingly. \
             Never say 'Okay, let's begin' before they confirm.",
        );

        {
            let mut history = self.history.lock();
            history.push(override_msg);
            history.push(guardrail);
        }

        *self.applied_template.lock() = Some(AppliedTemplate {
            category: category.to_string(),
            template: template.clone(),
        });
    }

    pub fn applied_template(&self) -> Option<AppliedTemplate> {
        self.applied_template.lock().clone()
    }
}
