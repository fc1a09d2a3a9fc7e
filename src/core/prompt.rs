//! System prompt composition
//!
//! Pure transformation of the raw flow instructions plus the flow graph
//! into the system prompt handed to the generator. Sanitization strips the
//! illustrative example sections that bias role selection; the guardrails
//! pin behavior to the runtime-supplied template and forbid the agent from
//! ending the session itself.

use std::fmt::Write as _;

use super::flow::FlowGraph;

/// Section headers whose content biases role selection and must be
/// stripped from the instructions before composing the prompt.
const UNWANTED_SECTION_HEADERS: &[&str] = &[
    "## 🔎 Output Structure",
    "## 💡 Example",
    "## 🗣️ Voice",
    "## ✅ Summary",
];

/// Node prompts longer than this are truncated in the flow summary.
const NODE_PROMPT_MAX_CHARS: usize = 320;

const EXAMPLE_BIAS_GUARDRAIL: &str = "IMPORTANT: Do not assume a role/category from any \
    examples in these instructions. Only use the runtime-provided interview template \
    (sent as a system message starting with 'Use the following interview template'). \
    If a template has not been provided yet, ask the user to confirm their role and \
    wait for the template.";

const NEVER_END_SESSION_GUARDRAIL: &str = "IMPORTANT: Never end or hang up the interview \
    yourself. Do not trigger any end-call tools or say any goodbye phrase that would end \
    the call. Always wait for the user to end the session.";

fn is_section_header(line: &str) -> bool {
    line.trim_start().starts_with("## ")
}

fn is_unwanted_header(line: &str) -> bool {
    let trimmed = line.trim_start();
    UNWANTED_SECTION_HEADERS
        .iter()
        .any(|prefix| trimmed.starts_with(prefix))
}

/// Remove unwanted headed sections from a line-oriented document.
///
/// Single pass with two states. A line matching an unwanted header starts a
/// skipped section; any other section header ends it and is retained.
/// Content outside skipped sections is never altered or reordered, which
/// also makes the operation idempotent.
pub fn sanitize(raw: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut skipping = false;

    for line in raw.lines() {
        if !skipping && is_unwanted_header(line) {
            skipping = true;
            continue;
        }
        if skipping && is_section_header(line) && !is_unwanted_header(line) {
            skipping = false;
            out.push(line);
            continue;
        }
        if !skipping {
            out.push(line);
        }
    }

    out.join("\n")
}

fn render_condition_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate_prompt(prompt: &str) -> String {
    let trimmed = prompt.trim();
    if trimmed.chars().count() > NODE_PROMPT_MAX_CHARS {
        let cut: String = trimmed.chars().take(NODE_PROMPT_MAX_CHARS - 3).collect();
        format!("{cut}…")
    } else {
        trimmed.to_string()
    }
}

/// Render a deterministic text description of the flow graph: name, global
/// policy, then each node in declaration order with its outgoing edges.
pub fn summarize_flow(flow: &FlowGraph) -> String {
    if flow.is_empty() {
        return String::new();
    }

    let name = if flow.name.is_empty() {
        "interview_flow"
    } else {
        &flow.name
    };

    let mut lines = Vec::new();
    lines.push(format!("Flow Name: {name}"));
    if !flow.global_prompt.is_empty() {
        lines.push(format!("Global Policy: {}", flow.global_prompt));
    }
    lines.push("Nodes and Transitions:".to_string());

    for node in &flow.nodes {
        if node.name.is_empty() {
            continue;
        }
        let start = if node.is_start { " (start)" } else { "" };
        lines.push(format!(
            "- {}{}: {}",
            node.name,
            start,
            truncate_prompt(&node.prompt)
        ));
        for edge in flow.outgoing(&node.name) {
            match &edge.condition {
                Some(cond) => lines.push(format!(
                    "  -> {} if {} {} {}",
                    edge.to,
                    cond.property,
                    cond.operator,
                    render_condition_value(&cond.value)
                )),
                None => lines.push(format!("  -> {}", edge.to)),
            }
        }
    }

    lines.join("\n")
}

/// Compose the full system prompt from sanitized instructions and the flow
/// summary, bracketed by the two guardrails.
pub fn compose(raw_instructions: &str, flow: &FlowGraph) -> String {
    let mut parts: Vec<String> = vec![EXAMPLE_BIAS_GUARDRAIL.to_string()];

    let sanitized = sanitize(raw_instructions.trim());
    if !sanitized.is_empty() {
        parts.push(sanitized);
    }

    let summary = summarize_flow(flow);
    if !summary.is_empty() {
        let mut section = String::new();
        let _ = write!(
            section,
            "Interview Flow Specification (stages and transitions):\n{summary}\n\n\
             Follow nodes in order starting from the start node. Ask one question at a time. \
             After the candidate answers, advance to the next node using the transitions and \
             conditions. If a node defines a variableExtractionPlan, implicitly extract those \
             fields for your internal reasoning, but do not read them aloud. If a conditional \
             branch depends on a value (e.g., years_experience), ask a concise clarifying \
             question first if the value is unknown."
        );
        parts.push(section);
    }

    parts.push(NEVER_END_SESSION_GUARDRAIL.to_string());
    parts.join("\n\n")
}
