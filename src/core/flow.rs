//! Conversation flow graph
//!
//! Declarative description of conversation stages (nodes) and their
//! transitions (edges, optionally conditional). Loaded once at startup and
//! immutable afterwards; a malformed flow file degrades to an empty graph
//! so the composer can fall back to a guardrail-only prompt.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowGraph {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "globalPrompt")]
    pub global_prompt: String,
    #[serde(default)]
    pub nodes: Vec<FlowNode>,
    #[serde(default)]
    pub edges: Vec<FlowEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    pub name: String,
    #[serde(default, rename = "isStart")]
    pub is_start: bool,
    #[serde(default)]
    pub prompt: String,
    #[serde(default, rename = "variableExtractionPlan")]
    pub variable_extraction_plan: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub condition: Option<EdgeCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeCondition {
    pub property: String,
    pub operator: String,
    pub value: serde_json::Value,
}

impl FlowGraph {
    /// Structural invariants: at most one start node, and every edge
    /// endpoint references a declared node.
    pub fn validate(&self) -> Result<(), String> {
        let start_count = self.nodes.iter().filter(|n| n.is_start).count();
        if start_count > 1 {
            return Err(format!("flow has {start_count} start nodes, expected at most one"));
        }
        for edge in &self.edges {
            for endpoint in [&edge.from, &edge.to] {
                if !self.nodes.iter().any(|n| &n.name == endpoint) {
                    return Err(format!("edge references unknown node '{endpoint}'"));
                }
            }
        }
        Ok(())
    }

    /// Outgoing edges of a node, in declaration order.
    pub fn outgoing(&self, node_name: &str) -> impl Iterator<Item = &FlowEdge> {
        self.edges.iter().filter(move |e| e.from == node_name)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Load a flow graph from a JSON file.
///
/// Missing files, malformed JSON, and invariant violations all degrade to
/// an empty graph with a warning; the conversation proceeds without a flow
/// summary in its prompt.
pub fn load_flow(path: &Path) -> FlowGraph {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Could not read flow {}: {}", path.display(), e);
            return FlowGraph::default();
        }
    };
    let flow: FlowGraph = match serde_json::from_str(&raw) {
        Ok(flow) => flow,
        Err(e) => {
            warn!("Could not parse flow {}: {}", path.display(), e);
            return FlowGraph::default();
        }
    };
    if let Err(e) = flow.validate() {
        warn!("Invalid flow {}: {}", path.display(), e);
        return FlowGraph::default();
    }
    flow
}
