//! Level-by-level breakdown generation
//!
//! One call produces the children of one parent:
//!
//! ```text
//! build_prompt -> model.generate -> sanitize_response -> parse -> validate -> nodes
//! ```
//!
//! Calls hold no state beyond the batch clock, so siblings can be expanded
//! concurrently from one generator. Nothing is retried here; the returned
//! error carries its [`wbs_core::ErrorKind`] for the caller to act on.

use std::sync::Arc;

use serde_json::Value;
use wbs_agent::LanguageModel;
use wbs_core::{BatchClock, BatchPolicy, Node, NodeType, Result, WbsError};

use crate::prompts::build_prompt;
use crate::records::{validate_batch, EpicRecord, FeatureRecord, LevelRecord, StoryRecord, TaskRecord};
use crate::sanitize::sanitize_response;

const CONNECTION_PROMPT: &str = "Say \"API connection successful\" and nothing else.";

/// Turns parent nodes into batches of generated children
pub struct BreakdownGenerator {
    model: Arc<dyn LanguageModel>,
    policy: BatchPolicy,
    clock: BatchClock,
}

impl BreakdownGenerator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            policy: BatchPolicy::default(),
            clock: BatchClock::new(),
        }
    }

    /// Set how batches containing invalid records are handled
    pub fn with_policy(mut self, policy: BatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// Generate the epics of a project
    pub async fn generate_epics(&self, project: &Node) -> Result<Vec<Node>> {
        self.generate_level::<EpicRecord>(project).await
    }

    /// Generate the features of an epic
    pub async fn generate_features(&self, epic: &Node) -> Result<Vec<Node>> {
        self.generate_level::<FeatureRecord>(epic).await
    }

    /// Generate the user stories of a feature
    pub async fn generate_stories(&self, feature: &Node) -> Result<Vec<Node>> {
        self.generate_level::<StoryRecord>(feature).await
    }

    /// Generate the tasks of a story
    pub async fn generate_tasks(&self, story: &Node) -> Result<Vec<Node>> {
        self.generate_level::<TaskRecord>(story).await
    }

    /// Generate the next level below `parent`, whatever its type
    pub async fn generate_children(&self, parent: &Node) -> Result<Vec<Node>> {
        match parent.node_type() {
            NodeType::Project => self.generate_epics(parent).await,
            NodeType::Epic => self.generate_features(parent).await,
            NodeType::Feature => self.generate_stories(parent).await,
            NodeType::Story => self.generate_tasks(parent).await,
            NodeType::Task => Err(WbsError::Hierarchy(format!(
                "task {} has no level below it",
                parent.id
            ))),
        }
    }

    /// Check the model answers a trivial prompt
    pub async fn test_connection(&self) -> bool {
        match self.model.generate(CONNECTION_PROMPT).await {
            Ok(reply) => {
                let ok = reply.to_lowercase().contains("successful");
                if !ok {
                    tracing::warn!("Unexpected connection test reply: {}", reply.trim());
                }
                ok
            }
            Err(e) => {
                tracing::error!("API connection test failed: {}", e);
                false
            }
        }
    }

    async fn generate_level<R: LevelRecord>(&self, parent: &Node) -> Result<Vec<Node>> {
        if R::LEVEL.parent() != Some(parent.node_type()) {
            return Err(WbsError::Hierarchy(format!(
                "cannot generate {} under {} {}",
                R::LEVEL.plural(),
                parent.node_type(),
                parent.id
            )));
        }

        let prompt = build_prompt(parent).ok_or_else(|| {
            WbsError::Hierarchy(format!("no prompt for children of {}", parent.id))
        })?;

        tracing::info!(
            "Generating {} for {} {} ({})",
            R::LEVEL.plural(),
            parent.node_type(),
            parent.id,
            self.model.model_name()
        );
        tracing::debug!("Prompt is {} chars", prompt.len());

        let raw = self.model.generate(&prompt).await.map_err(|e| {
            tracing::error!("Error generating {}: {}", R::LEVEL.plural(), e);
            e
        })?;

        let sanitized = sanitize_response(&raw);
        tracing::debug!(
            "Sanitized reply: {} chars -> {} chars",
            raw.len(),
            sanitized.len()
        );

        let values: Vec<Value> = serde_json::from_str(&sanitized).map_err(|e| {
            tracing::error!("Reply for {} is not a JSON array: {}", parent.id, e);
            WbsError::InvalidResponse(format!("expected a JSON array of {}: {}", R::LEVEL.plural(), e))
        })?;

        let total = values.len();
        let records = validate_batch::<R>(values, self.policy)?;
        let stamp = self.clock.next_stamp();

        let nodes: Vec<Node> = records
            .into_iter()
            .map(|(index, record)| record.into_node(&parent.id, stamp, index))
            .collect();

        tracing::info!(
            "Generated {} of {} {} for {}",
            nodes.len(),
            total,
            R::LEVEL.plural(),
            parent.id
        );

        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wbs_agent::ScriptedModel;
    use wbs_core::ErrorKind;

    const EPICS: &str = r###"[
        {"title": "Catalog", "description": "## Overview", "priority": "high", "estimatedDuration": "3 weeks"},
        {"title": "Checkout", "description": "## Overview", "priority": "medium", "estimatedDuration": "1 month"}
    ]"###;

    fn generator(model: ScriptedModel) -> (Arc<ScriptedModel>, BreakdownGenerator) {
        let model = Arc::new(model);
        let generator = BreakdownGenerator::new(model.clone());
        (model, generator)
    }

    #[tokio::test]
    async fn test_generate_epics() {
        let (model, generator) = generator(ScriptedModel::with_texts([EPICS]));
        let project = Node::project("Bookshop", "Sell books online");

        let epics = generator.generate_epics(&project).await.unwrap();

        assert_eq!(epics.len(), 2);
        for epic in &epics {
            assert_eq!(epic.node_type(), NodeType::Epic);
            assert_eq!(epic.parent_id.as_deref(), Some(project.id.as_str()));
        }
        assert_eq!(epics[0].title, "Catalog");
        assert!(epics[1].id.ends_with("_1"));
        assert!(model.prompts()[0].contains("Project: Bookshop"));
    }

    #[tokio::test]
    async fn test_wrong_parent_level() {
        let (model, generator) = generator(ScriptedModel::with_texts([EPICS]));
        let project = Node::project("Bookshop", "Sell books online");

        let err = generator.generate_tasks(&project).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Hierarchy);
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_consecutive_batches_never_collide() {
        let (_, generator) = generator(ScriptedModel::with_texts([EPICS, EPICS]));
        let project = Node::project("Bookshop", "Sell books online");

        let first = generator.generate_epics(&project).await.unwrap();
        let second = generator.generate_epics(&project).await.unwrap();

        for a in &first {
            assert!(second.iter().all(|b| b.id != a.id));
        }
    }

    #[tokio::test]
    async fn test_empty_array_is_empty_batch() {
        let (_, generator) = generator(ScriptedModel::with_texts(["[]"]));
        let project = Node::project("Bookshop", "Sell books online");
        assert!(generator.generate_epics(&project).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_object_reply_is_invalid_response() {
        let (_, generator) = generator(ScriptedModel::with_texts([r#"{"title": "x"}"#]));
        let project = Node::project("Bookshop", "Sell books online");

        let err = generator.generate_epics(&project).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
    }

    #[tokio::test]
    async fn test_connection_check() {
        let (_, ok) = generator(ScriptedModel::with_texts(["API connection successful"]));
        assert!(ok.test_connection().await);

        let (_, wrong) = generator(ScriptedModel::with_texts(["Hello!"]));
        assert!(!wrong.test_connection().await);

        let (_, failing) = generator(ScriptedModel::new(vec![Err(WbsError::Network(
            "connection refused".to_string(),
        ))]));
        assert!(!failing.test_connection().await);
    }

    #[tokio::test]
    async fn test_connection_prompt() {
        let (model, generator) = generator(ScriptedModel::with_texts(["successful"]));
        generator.test_connection().await;
        assert_eq!(model.prompts(), vec![CONNECTION_PROMPT.to_string()]);
    }
}
