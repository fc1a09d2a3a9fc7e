//! Branch router
//!
//! Fans the single conversation event stream out to independently filtered
//! branches. Each branch is a predicate plus the sending half of its task's
//! channel; branches are independent consumers, so evaluation order does
//! not affect correctness.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::core::events::ConversationEvent;

pub type BranchFilter = Arc<dyn Fn(&ConversationEvent) -> bool + Send + Sync>;

pub struct Branch {
    id: &'static str,
    filter: BranchFilter,
    tx: mpsc::Sender<ConversationEvent>,
}

impl Branch {
    pub fn new(
        id: &'static str,
        filter: impl Fn(&ConversationEvent) -> bool + Send + Sync + 'static,
        tx: mpsc::Sender<ConversationEvent>,
    ) -> Self {
        Self {
            id,
            filter: Arc::new(filter),
            tx,
        }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn accepts(&self, event: &ConversationEvent) -> bool {
        (self.filter)(event)
    }
}

pub struct BranchRouter {
    branches: Vec<Branch>,
}

impl BranchRouter {
    pub fn new(branches: Vec<Branch>) -> Self {
        Self { branches }
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    /// Deliver the event to every accepting branch, in branch order.
    ///
    /// A branch whose task has exited simply stops receiving; the rest of
    /// the fan-out is unaffected.
    pub async fn dispatch(&self, event: ConversationEvent) {
        for branch in &self.branches {
            if branch.accepts(&event) && branch.tx.send(event.clone()).await.is_err() {
                debug!(branch = branch.id, "Branch channel closed; dropping event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dispatch_respects_filters() {
        let (all_tx, mut all_rx) = mpsc::channel(8);
        let (trigger_tx, mut trigger_rx) = mpsc::channel(8);

        let router = BranchRouter::new(vec![
            Branch::new("all", |_| true, all_tx),
            Branch::new(
                "triggers",
                ConversationEvent::is_generation_trigger,
                trigger_tx,
            ),
        ]);

        router.dispatch(ConversationEvent::UserStartedSpeaking).await;
        router.dispatch(ConversationEvent::BeginGeneration).await;

        assert_eq!(
            all_rx.recv().await,
            Some(ConversationEvent::UserStartedSpeaking)
        );
        assert_eq!(all_rx.recv().await, Some(ConversationEvent::BeginGeneration));
        // The trigger branch only saw the trigger event.
        assert_eq!(
            trigger_rx.recv().await,
            Some(ConversationEvent::BeginGeneration)
        );
        assert!(trigger_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_branch_does_not_block_the_rest() {
        let (dead_tx, dead_rx) = mpsc::channel(1);
        drop(dead_rx);
        let (live_tx, mut live_rx) = mpsc::channel(8);

        let router = BranchRouter::new(vec![
            Branch::new("dead", |_| true, dead_tx),
            Branch::new("live", |_| true, live_tx),
        ]);

        router.dispatch(ConversationEvent::ContextUpdated).await;
        assert_eq!(live_rx.recv().await, Some(ConversationEvent::ContextUpdated));
    }
}
