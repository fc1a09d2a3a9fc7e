//! Conversation event types
//!
//! All events flowing through the pipeline are closed tagged unions so that
//! routing decisions are exhaustively matched at compile time, rather than
//! checked dynamically per event.

use serde::{Deserialize, Serialize};

use super::session::Message;

/// A single event on the shared conversation stream.
///
/// Produced by the event dispatcher (from transport signals and app
/// messages) and by the session bootstrap (generation triggers), then
/// fanned out to branches by the router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConversationEvent {
    #[serde(rename = "user_started_speaking")]
    UserStartedSpeaking,
    #[serde(rename = "user_stopped_speaking")]
    UserStoppedSpeaking,
    #[serde(rename = "transcription")]
    Transcription { text: String, timestamp_ms: u64 },
    /// Kick off the first response (greeting). Emitted exactly once per
    /// session by the bootstrap state machine.
    #[serde(rename = "begin_generation")]
    BeginGeneration,
    /// The session context changed (template hot-swap etc.); re-run the
    /// generator against the updated history.
    #[serde(rename = "context_updated")]
    ContextUpdated,
    /// Append messages to the history and run the generator.
    #[serde(rename = "messages_append")]
    MessagesAppend { messages: Vec<Message> },
    #[serde(rename = "start_interruption")]
    StartInterruption,
    #[serde(rename = "stop_interruption")]
    StopInterruption,
    #[serde(rename = "function_call_in_progress")]
    FunctionCallInProgress { name: String },
    #[serde(rename = "function_call_result")]
    FunctionCallResult { name: String, result: String },
    /// No inbound activity for the configured idle window. A hint, not an
    /// error: the endpointing branch treats it as an implicit gate open.
    #[serde(rename = "idle_timeout")]
    IdleTimeout,
}

impl ConversationEvent {
    /// Whether this event should reach the conversation branch (B3) and
    /// ultimately the generator.
    pub fn is_generation_trigger(&self) -> bool {
        matches!(
            self,
            ConversationEvent::BeginGeneration
                | ConversationEvent::ContextUpdated
                | ConversationEvent::MessagesAppend { .. }
                | ConversationEvent::StartInterruption
                | ConversationEvent::StopInterruption
                | ConversationEvent::FunctionCallInProgress { .. }
                | ConversationEvent::FunctionCallResult { .. }
        )
    }
}

/// An event on the merged outbound stream consumed by the transport/TTS
/// layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundEvent {
    /// A conversation event forwarded unchanged by the passthrough branch.
    #[serde(rename = "forwarded")]
    Forwarded { event: ConversationEvent },
    /// A generated agent utterance from the conversation branch.
    #[serde(rename = "bot_utterance")]
    BotUtterance { text: String },
    /// The generator call failed; the outer system may retry or report.
    #[serde(rename = "generation_failed")]
    GenerationFailed { reason: String },
}

/// Control signal from the endpointing branch to the completion gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateSignal {
    /// Flush the buffer and pass subsequent events straight through.
    Open,
    /// Stop passing events through and start buffering.
    Closed,
}
