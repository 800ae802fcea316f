//! WBS Planning - turning a project description into a work-breakdown tree
//!
//! Each generation call asks a language model for the children of one node:
//! the prompt is built from the parent, the reply is recovered into a JSON
//! array, each record is validated into a typed node and the batch is handed
//! back for the caller to append.

pub mod diagram;
pub mod generator;
pub mod prompts;
pub mod records;
pub mod sanitize;
pub mod summary;

pub use diagram::{extract_diagrams, render_or_placeholder, DiagramRenderer, HtmlEmbedRenderer};
pub use generator::BreakdownGenerator;
pub use prompts::build_prompt;
pub use records::{EpicRecord, FeatureRecord, LevelRecord, RecordError, StoryRecord, TaskRecord};
pub use sanitize::sanitize_response;
pub use summary::{render_outline, BreakdownSummary};
