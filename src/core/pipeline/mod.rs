//! Conversation pipeline
//!
//! Wires the branch router, the three branch tasks and the completion gate
//! into one running unit per session:
//!
//! - the passthrough branch forwards transport-layer events downstream
//!   unchanged, except that `UserStoppedSpeaking` is absorbed (the
//!   endpointing branch decides when a turn actually ended);
//! - the endpointing branch watches speech boundaries, runs the
//!   completeness classifier and drives the gate;
//! - the conversation branch consumes generation triggers, calls the
//!   response generator and feeds utterances through the gate.
//!
//! Without a classifier the endpointing branch is not spawned and the gate
//! runs permanently open, so the pipeline degrades to plain passthrough
//! plus generation.

pub mod dispatcher;
pub mod gate;
pub mod router;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::core::classifier::{CompletenessClassifier, CompletenessOutcome, run_completeness_check};
use crate::core::events::{ConversationEvent, GateSignal, OutboundEvent};
use crate::core::generator::ResponseGenerator;
use crate::core::session::{Message, Session};

pub use dispatcher::EventDispatcher;
pub use gate::CompletionGate;
pub use router::{Branch, BranchRouter};

const CHANNEL_BUFFER_SIZE: usize = 256;

pub struct ConversationPipeline {
    router: Arc<BranchRouter>,
    tasks: Vec<JoinHandle<()>>,
}

impl ConversationPipeline {
    /// Spawn the per-session branch and gate tasks. Returns the pipeline
    /// handle and the merged outbound stream.
    pub fn spawn(
        session: Arc<Session>,
        classifier: Option<Arc<dyn CompletenessClassifier>>,
        generator: Arc<dyn ResponseGenerator>,
        classifier_timeout_ms: u64,
    ) -> (Self, mpsc::Receiver<OutboundEvent>) {
        let (out_tx, out_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let (gate_tx, gate_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let mut branches = Vec::new();
        let mut tasks = Vec::new();

        // Passthrough branch: transport-layer events go straight to the
        // output, bypassing the gate. Stop-speaking is absorbed here and
        // triggers are owned by the conversation branch.
        let (b1_tx, b1_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        branches.push(Branch::new(
            "passthrough",
            |event: &ConversationEvent| {
                !matches!(event, ConversationEvent::UserStoppedSpeaking)
                    && !event.is_generation_trigger()
            },
            b1_tx,
        ));
        tasks.push(tokio::spawn(passthrough_branch(b1_rx, out_tx.clone())));

        // Endpointing branch: only spawned when a classifier is configured.
        // Its absence means the gate never receives signals and stays open.
        let signal_rx = classifier.map(|classifier| {
            let (signal_tx, signal_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
            let (b2_tx, b2_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
            branches.push(Branch::new(
                "endpointing",
                |event: &ConversationEvent| {
                    matches!(
                        event,
                        ConversationEvent::UserStartedSpeaking
                            | ConversationEvent::UserStoppedSpeaking
                            | ConversationEvent::Transcription { .. }
                            | ConversationEvent::IdleTimeout
                    )
                },
                b2_tx,
            ));
            tasks.push(tokio::spawn(endpointing_branch(
                b2_rx,
                signal_tx,
                classifier,
                classifier_timeout_ms,
            )));
            signal_rx
        });

        // Conversation branch: generation triggers in, gated utterances out.
        let (b3_tx, b3_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        branches.push(Branch::new(
            "conversation",
            ConversationEvent::is_generation_trigger,
            b3_tx,
        ));
        tasks.push(tokio::spawn(conversation_branch(
            b3_rx,
            gate_tx,
            session,
            generator,
        )));

        tasks.push(tokio::spawn(
            CompletionGate::new(true).run(gate_rx, signal_rx, out_tx),
        ));

        let pipeline = Self {
            router: Arc::new(BranchRouter::new(branches)),
            tasks,
        };
        (pipeline, out_rx)
    }

    pub fn router(&self) -> Arc<BranchRouter> {
        self.router.clone()
    }

    pub async fn dispatch(&self, event: ConversationEvent) {
        self.router.dispatch(event).await;
    }

    /// Cancel every branch and gate task. Buffered gate contents are
    /// dropped, not flushed.
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for ConversationPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn passthrough_branch(
    mut events: mpsc::Receiver<ConversationEvent>,
    out: mpsc::Sender<OutboundEvent>,
) {
    while let Some(event) = events.recv().await {
        if out.send(OutboundEvent::Forwarded { event }).await.is_err() {
            return;
        }
    }
}

/// Accumulate the transcript of the current turn and translate speech
/// boundaries into gate signals. The pending transcript is cleared on
/// every gate open so the next turn is judged on its own.
async fn endpointing_branch(
    mut events: mpsc::Receiver<ConversationEvent>,
    signals: mpsc::Sender<GateSignal>,
    classifier: Arc<dyn CompletenessClassifier>,
    timeout_ms: u64,
) {
    let mut pending = String::new();

    while let Some(event) = events.recv().await {
        match event {
            ConversationEvent::UserStartedSpeaking => {
                if signals.send(GateSignal::Closed).await.is_err() {
                    return;
                }
            }
            ConversationEvent::Transcription { text, .. } => {
                if !pending.is_empty() {
                    pending.push(' ');
                }
                pending.push_str(text.trim());
            }
            ConversationEvent::UserStoppedSpeaking => {
                match run_completeness_check(timeout_ms, classifier.as_ref(), &pending).await {
                    CompletenessOutcome::Complete(method) => {
                        debug!(method, "Turn complete; opening gate");
                        pending.clear();
                        if signals.send(GateSignal::Open).await.is_err() {
                            return;
                        }
                    }
                    CompletenessOutcome::Incomplete | CompletenessOutcome::Skipped => {}
                }
            }
            ConversationEvent::IdleTimeout => {
                info!("Idle timeout; opening gate");
                pending.clear();
                if signals.send(GateSignal::Open).await.is_err() {
                    return;
                }
            }
            _ => {}
        }
    }
}

async fn conversation_branch(
    mut events: mpsc::Receiver<ConversationEvent>,
    gate: mpsc::Sender<OutboundEvent>,
    session: Arc<Session>,
    generator: Arc<dyn ResponseGenerator>,
) {
    while let Some(event) = events.recv().await {
        match event {
            ConversationEvent::MessagesAppend { messages } => {
                session.append_all(messages);
                if !generate_and_send(&session, generator.as_ref(), &gate).await {
                    return;
                }
            }
            ConversationEvent::BeginGeneration | ConversationEvent::ContextUpdated => {
                if !generate_and_send(&session, generator.as_ref(), &gate).await {
                    return;
                }
            }
            // Interruption and function-call markers ride through the gate
            // so they stay ordered with the utterances around them.
            other => {
                if gate
                    .send(OutboundEvent::Forwarded { event: other })
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }
    }
}

/// Run the generator against the current history, record and emit its
/// utterances. Returns false when the gate is gone.
async fn generate_and_send(
    session: &Session,
    generator: &dyn ResponseGenerator,
    gate: &mpsc::Sender<OutboundEvent>,
) -> bool {
    let history = session.history_snapshot();
    match generator.generate(&history).await {
        Ok(utterances) => {
            for text in utterances {
                session.append(Message::assistant(&text));
                if gate.send(OutboundEvent::BotUtterance { text }).await.is_err() {
                    return false;
                }
            }
            true
        }
        Err(e) => {
            error!(provider = generator.provider_info(), "Generation failed: {e}");
            gate.send(OutboundEvent::GenerationFailed {
                reason: e.to_string(),
            })
            .await
            .is_ok()
        }
    }
}
