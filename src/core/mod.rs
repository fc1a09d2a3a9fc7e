pub mod bootstrap;
pub mod catalog;
pub mod classifier;
pub mod events;
pub mod flow;
pub mod generator;
pub mod pipeline;
pub mod prompt;
pub mod session;

// Re-export commonly used types for convenience
pub use bootstrap::SessionBootstrap;
pub use catalog::{Template, TemplateCatalog};
pub use classifier::{ClassifierError, CompletenessClassifier, CompletenessOutcome};
pub use events::{ConversationEvent, GateSignal, OutboundEvent};
pub use flow::{FlowGraph, load_flow};
pub use generator::{GeneratorError, ResponseGenerator};
pub use pipeline::{BranchRouter, CompletionGate, ConversationPipeline, EventDispatcher};
pub use session::{Message, Role, Session};
