//! Dispatcher behavior: idle recovery, template hot-swap, pre-start input.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use turnwise::core::bootstrap::SessionBootstrap;
use turnwise::core::catalog::TemplateCatalog;
use turnwise::core::classifier::{ClassifierError, CompletenessClassifier};
use turnwise::core::events::{ConversationEvent, OutboundEvent};
use turnwise::core::generator::{GeneratorError, ResponseGenerator};
use turnwise::core::pipeline::dispatcher::AppMessage;
use turnwise::core::pipeline::{ConversationPipeline, EventDispatcher};
use turnwise::core::session::{Message, Session};

/// Generator that never produces output, so history growth in these tests
/// comes from the dispatcher and bootstrap alone.
struct SilentGenerator;

#[async_trait]
impl ResponseGenerator for SilentGenerator {
    async fn generate(&self, _history: &[Message]) -> Result<Vec<String>, GeneratorError> {
        Ok(Vec::new())
    }

    fn provider_info(&self) -> &'static str {
        "SilentGenerator (test-only)"
    }
}

/// Always judges the turn unfinished; only the idle monitor can reopen
/// the gate.
struct NeverCompleteClassifier;

#[async_trait]
impl CompletenessClassifier for NeverCompleteClassifier {
    async fn is_utterance_complete(&self, _utterance: &str) -> Result<bool, ClassifierError> {
        Ok(false)
    }

    fn provider_info(&self) -> &'static str {
        "NeverCompleteClassifier (test-only)"
    }
}

struct EchoGenerator;

#[async_trait]
impl ResponseGenerator for EchoGenerator {
    async fn generate(&self, _history: &[Message]) -> Result<Vec<String>, GeneratorError> {
        Ok(vec!["reply".to_string()])
    }

    fn provider_info(&self) -> &'static str {
        "EchoGenerator (test-only)"
    }
}

fn catalog() -> Arc<TemplateCatalog> {
    Arc::new(
        TemplateCatalog::from_json(
            r#"{
                "Software": [
                    {"subTitle": "Backend Engineer", "questions": ["Q1"]},
                    {"subTitle": "Frontend Engineer", "questions": ["Q2"]}
                ]
            }"#,
        )
        .unwrap(),
    )
}

fn new_dispatcher(
    classifier: Option<Arc<dyn CompletenessClassifier>>,
    generator: Arc<dyn ResponseGenerator>,
    idle_timeout: Duration,
) -> (EventDispatcher, mpsc::Receiver<OutboundEvent>) {
    let session = Arc::new(Session::new(None));
    let bootstrap = Arc::new(SessionBootstrap::new(session.clone(), catalog()));
    let (pipeline, out_rx) = ConversationPipeline::spawn(session, classifier, generator, 1_000);
    (
        EventDispatcher::new(bootstrap, pipeline, idle_timeout),
        out_rx,
    )
}

async fn next_event(out: &mut mpsc::Receiver<OutboundEvent>) -> OutboundEvent {
    tokio::time::timeout(Duration::from_secs(5), out.recv())
        .await
        .expect("timed out waiting for outbound event")
        .expect("outbound stream ended")
}

#[tokio::test]
async fn idle_window_emits_timeout_event() {
    let (dispatcher, mut out) = new_dispatcher(
        None,
        Arc::new(SilentGenerator),
        Duration::from_millis(50),
    );
    dispatcher.on_client_connected().await;

    loop {
        if let OutboundEvent::Forwarded {
            event: ConversationEvent::IdleTimeout,
        } = next_event(&mut out).await
        {
            break;
        }
    }
}

#[tokio::test]
async fn idle_timeout_reopens_a_stuck_gate() {
    let (dispatcher, mut out) = new_dispatcher(
        Some(Arc::new(NeverCompleteClassifier)),
        Arc::new(EchoGenerator),
        Duration::from_millis(100),
    );

    dispatcher.on_client_connected().await;
    // Greeting flows out while the gate is open.
    loop {
        if matches!(next_event(&mut out).await, OutboundEvent::BotUtterance { .. }) {
            break;
        }
    }

    // A turn the classifier never completes leaves the reply buffered
    // until the idle monitor forces the gate open.
    dispatcher
        .on_app_message(AppMessage {
            message: Some("well, hmm".to_string()),
            ..Default::default()
        })
        .await;

    loop {
        match next_event(&mut out).await {
            OutboundEvent::BotUtterance { text } => {
                assert_eq!(text, "reply");
                break;
            }
            _ => continue,
        }
    }
}

#[tokio::test]
async fn template_hot_swap_grows_history_by_exactly_two() {
    let (dispatcher, _out) = new_dispatcher(
        None,
        Arc::new(SilentGenerator),
        Duration::from_secs(60),
    );

    // First template wins the start race and greets with the template name.
    dispatcher
        .on_app_message(AppMessage {
            template: Some("backend".to_string()),
            ..Default::default()
        })
        .await;
    let session = dispatcher.bootstrap().session().clone();
    let before = session.history_len();

    dispatcher
        .on_app_message(AppMessage {
            template: Some("frontend".to_string()),
            ..Default::default()
        })
        .await;
    assert_eq!(session.history_len(), before + 2);
    assert_eq!(
        session.applied_template().unwrap().template.sub_title,
        "Frontend Engineer"
    );
}

#[tokio::test]
async fn text_before_start_is_dropped() {
    let (dispatcher, mut out) = new_dispatcher(
        None,
        Arc::new(EchoGenerator),
        Duration::from_secs(60),
    );

    dispatcher
        .on_app_message(AppMessage {
            message: Some("anyone there?".to_string()),
            ..Default::default()
        })
        .await;

    assert_eq!(dispatcher.bootstrap().session().history_len(), 0);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(out.try_recv().is_err());
}
