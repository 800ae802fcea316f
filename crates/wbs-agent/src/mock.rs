//! Scripted model for tests and offline runs
//!
//! Replays queued replies in order and records every prompt it was sent.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use wbs_core::{Result, WbsError};

use crate::client::LanguageModel;

#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Model that answers successfully with each text in turn
    pub fn with_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(|t| Ok(t.into())).collect())
    }

    /// Queue another reply
    pub fn push(&self, reply: Result<String>) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    /// Prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());

        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| Err(WbsError::Other("No more scripted replies".to_string())))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order() {
        let model = ScriptedModel::with_texts(["one", "two"]);

        assert_eq!(model.generate("a").await.unwrap(), "one");
        assert_eq!(model.generate("b").await.unwrap(), "two");
        assert!(model.generate("c").await.is_err());

        assert_eq!(model.prompts(), vec!["a", "b", "c"]);
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let model = ScriptedModel::new(vec![Err(WbsError::Network("fetch failed".into()))]);
        let err = model.generate("a").await.unwrap_err();
        assert!(matches!(err, WbsError::Network(_)));

        model.push(Ok("late".into()));
        assert_eq!(model.generate("b").await.unwrap(), "late");
    }
}
