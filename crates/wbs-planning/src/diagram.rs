//! Mermaid diagrams embedded in task descriptions
//!
//! Task descriptions may carry a ```` ```mermaid ```` block. Rendering is a
//! collaborator behind [`DiagramRenderer`]; a failed render never aborts the
//! surrounding document, it is swapped for an error placeholder.

use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use uuid::Uuid;
use wbs_core::{Result, WbsError};

/// Diagram keywords accepted by [`HtmlEmbedRenderer`]
const DIAGRAM_TYPES: &[&str] = &[
    "flowchart",
    "graph",
    "sequenceDiagram",
    "classDiagram",
    "stateDiagram",
    "stateDiagram-v2",
    "erDiagram",
    "journey",
    "gantt",
    "pie",
    "mindmap",
    "timeline",
];

fn mermaid_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```mermaid[ \t]*\r?\n(.*?)```").unwrap())
}

/// Every mermaid definition in `description`, in order of appearance
pub fn extract_diagrams(description: &str) -> Vec<String> {
    mermaid_block()
        .captures_iter(description)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|d| !d.is_empty())
        .collect()
}

/// Turns a diagram definition into markup
#[async_trait]
pub trait DiagramRenderer: Send + Sync {
    async fn render(&self, definition: &str) -> Result<String>;
}

/// Emits a `<pre class="mermaid">` element for client-side rendering
///
/// Only the diagram header is checked; the body is escaped and passed through.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlEmbedRenderer;

#[async_trait]
impl DiagramRenderer for HtmlEmbedRenderer {
    async fn render(&self, definition: &str) -> Result<String> {
        let header = definition
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.starts_with("%%"))
            .ok_or_else(|| WbsError::Other("Empty diagram definition".to_string()))?;

        let keyword = header.split_whitespace().next().unwrap_or_default();
        if !DIAGRAM_TYPES.contains(&keyword) {
            return Err(WbsError::Other(format!("Unknown diagram type: {}", keyword)));
        }

        Ok(format!(
            "<pre class=\"mermaid\" id=\"{}\">{}</pre>",
            diagram_element_id(),
            escape_html(definition.trim())
        ))
    }
}

/// Unique element id, `mermaid-{millis}-{9 random chars}`
pub fn diagram_element_id() -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("mermaid-{}-{}", Utc::now().timestamp_millis(), &random[..9])
}

/// Markup shown in place of a diagram that failed to render
pub fn error_placeholder(definition: &str, err: &WbsError) -> String {
    format!(
        "<div class=\"mermaid-error\"><strong>Mermaid Diagram Error:</strong><br>{}<br><br><strong>Definition:</strong><br><pre>{}</pre></div>",
        escape_html(&err.to_string()),
        escape_html(definition)
    )
}

/// Render `definition`, falling back to [`error_placeholder`] on failure
pub async fn render_or_placeholder(renderer: &dyn DiagramRenderer, definition: &str) -> String {
    match renderer.render(definition).await {
        Ok(markup) => markup,
        Err(e) => {
            tracing::warn!("Mermaid rendering error: {}", e);
            error_placeholder(definition, &e)
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
