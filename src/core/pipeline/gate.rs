//! Completion gate
//!
//! Buffers the conversation branch's output until the endpointing branch
//! signals that the user's utterance is complete. The gate only ever
//! delays the batch as a whole: buffered events are flushed downstream in
//! their original arrival order, never reordered.

use std::collections::VecDeque;

use tokio::sync::mpsc;
use tracing::debug;

use crate::core::events::{GateSignal, OutboundEvent};

/// Gate state, owned exclusively by the gate task.
struct GateState {
    open: bool,
    buffer: VecDeque<OutboundEvent>,
}

pub struct CompletionGate {
    state: GateState,
}

impl CompletionGate {
    /// With no endpointing branch the gate starts (and stays) open:
    /// no classifier means no gating and zero added latency.
    pub fn new(start_open: bool) -> Self {
        Self {
            state: GateState {
                open: start_open,
                buffer: VecDeque::new(),
            },
        }
    }

    /// Run the gate until both inputs are exhausted or the downstream
    /// consumer goes away. Buffered events that were never flushed are
    /// discarded with the task, which is the disconnect semantics: a
    /// cancelled session does not flush.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<OutboundEvent>,
        mut signals: Option<mpsc::Receiver<GateSignal>>,
        out: mpsc::Sender<OutboundEvent>,
    ) {
        loop {
            tokio::select! {
                signal = recv_signal(&mut signals) => match signal {
                    Some(GateSignal::Open) => {
                        if !self.state.open {
                            debug!(buffered = self.state.buffer.len(), "Gate opening");
                        }
                        self.state.open = true;
                        if !self.flush(&out).await {
                            return;
                        }
                    }
                    Some(GateSignal::Closed) => {
                        debug!("Gate closing");
                        self.state.open = false;
                    }
                    None => {
                        // Signal source gone: fail open rather than hold
                        // the buffer forever.
                        signals = None;
                        self.state.open = true;
                        if !self.flush(&out).await {
                            return;
                        }
                    }
                },
                event = events.recv() => match event {
                    Some(event) => {
                        if self.state.open {
                            if out.send(event).await.is_err() {
                                return;
                            }
                        } else {
                            self.state.buffer.push_back(event);
                        }
                    }
                    None => return,
                },
            }
        }
    }

    /// Drain the buffer downstream in arrival order. Returns false when
    /// the consumer is gone.
    async fn flush(&mut self, out: &mpsc::Sender<OutboundEvent>) -> bool {
        while let Some(event) = self.state.buffer.pop_front() {
            if out.send(event).await.is_err() {
                return false;
            }
        }
        true
    }
}

async fn recv_signal(signals: &mut Option<mpsc::Receiver<GateSignal>>) -> Option<GateSignal> {
    match signals {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utterance(text: &str) -> OutboundEvent {
        OutboundEvent::BotUtterance {
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn open_gate_is_identity_passthrough() {
        let (event_tx, event_rx) = mpsc::channel(8);
        let (out_tx, mut out_rx) = mpsc::channel(8);
        let gate = CompletionGate::new(true);
        let task = tokio::spawn(gate.run(event_rx, None, out_tx));

        event_tx.send(utterance("e1")).await.unwrap();
        event_tx.send(utterance("e2")).await.unwrap();

        assert_eq!(out_rx.recv().await, Some(utterance("e1")));
        assert_eq!(out_rx.recv().await, Some(utterance("e2")));

        drop(event_tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn closed_gate_buffers_then_flushes_in_order() {
        let (event_tx, event_rx) = mpsc::channel(8);
        let (signal_tx, signal_rx) = mpsc::channel(8);
        let (out_tx, mut out_rx) = mpsc::channel(8);
        let gate = CompletionGate::new(true);
        let task = tokio::spawn(gate.run(event_rx, Some(signal_rx), out_tx));

        signal_tx.send(GateSignal::Closed).await.unwrap();
        // Let the gate observe the close before events arrive.
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        for text in ["e1", "e2", "e3"] {
            event_tx.send(utterance(text)).await.unwrap();
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(out_rx.try_recv().is_err(), "events must be withheld while closed");

        signal_tx.send(GateSignal::Open).await.unwrap();
        assert_eq!(out_rx.recv().await, Some(utterance("e1")));
        assert_eq!(out_rx.recv().await, Some(utterance("e2")));
        assert_eq!(out_rx.recv().await, Some(utterance("e3")));

        // After the flush the gate passes straight through.
        event_tx.send(utterance("e4")).await.unwrap();
        assert_eq!(out_rx.recv().await, Some(utterance("e4")));

        drop(event_tx);
        drop(signal_tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn close_signal_stops_passthrough() {
        let (event_tx, event_rx) = mpsc::channel(8);
        let (signal_tx, signal_rx) = mpsc::channel(8);
        let (out_tx, mut out_rx) = mpsc::channel(8);
        let task = tokio::spawn(CompletionGate::new(true).run(event_rx, Some(signal_rx), out_tx));

        event_tx.send(utterance("before")).await.unwrap();
        assert_eq!(out_rx.recv().await, Some(utterance("before")));

        signal_tx.send(GateSignal::Closed).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        event_tx.send(utterance("after")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(out_rx.try_recv().is_err());

        drop(event_tx);
        drop(signal_tx);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn dropped_signal_source_fails_open() {
        let (event_tx, event_rx) = mpsc::channel(8);
        let (signal_tx, signal_rx) = mpsc::channel(8);
        let (out_tx, mut out_rx) = mpsc::channel(8);
        let task = tokio::spawn(CompletionGate::new(false).run(event_rx, Some(signal_rx), out_tx));

        event_tx.send(utterance("held")).await.unwrap();
        drop(signal_tx);

        assert_eq!(out_rx.recv().await, Some(utterance("held")));

        drop(event_tx);
        task.await.unwrap();
    }
}
