//! Typed records parsed from a model reply
//!
//! Each generated level has a record type mirroring the JSON schema its
//! prompt asks for. A raw `serde_json::Value` only becomes a [`Node`] after it
//! deserializes into the record for its level and passes [`LevelRecord::check`].
//!
//! Validation is structural: required fields present, right JSON types, enum
//! values recognised. Estimate ranges are not checked.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use wbs_core::{
    batch_node_id, BatchPolicy, Effort, EpicDetails, FeatureDetails, Node, NodeDetails, NodeType,
    Priority, Result, StoryDetails, TaskDetails, TaskStatus, WbsError,
};

/// A record that failed validation, by position in its batch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{level} record {index}: {reason}")]
pub struct RecordError {
    pub level: NodeType,
    pub index: usize,
    pub reason: String,
}

impl From<RecordError> for WbsError {
    fn from(err: RecordError) -> Self {
        WbsError::InvalidRecord {
            level: err.level,
            index: err.index,
            reason: err.reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpicRecord {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub estimated_duration: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureRecord {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub estimated_effort: Effort,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRecord {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub estimated_story_points: u32,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub estimated_hours: u32,
    #[serde(default)]
    pub status: TaskStatus,
}

/// Record type for one generated level
pub trait LevelRecord: DeserializeOwned + Send {
    /// Level this record becomes
    const LEVEL: NodeType;

    fn title(&self) -> &str;

    /// Split into the shared text fields and the level-specific details
    fn into_parts(self) -> (String, String, NodeDetails);

    /// Checks serde cannot express
    fn check(&self) -> std::result::Result<(), String> {
        if self.title().trim().is_empty() {
            return Err("title is empty".to_string());
        }
        Ok(())
    }

    /// Turn a validated record into a childless node of a batch
    fn into_node(self, parent_id: &str, stamp: DateTime<Utc>, index: usize) -> Node {
        let (title, description, details) = self.into_parts();
        Node {
            id: batch_node_id(Self::LEVEL, stamp, index),
            title,
            description,
            parent_id: Some(parent_id.to_string()),
            timestamp: stamp,
            details,
            children: Vec::new(),
        }
    }
}

impl LevelRecord for EpicRecord {
    const LEVEL: NodeType = NodeType::Epic;

    fn title(&self) -> &str {
        &self.title
    }

    fn into_parts(self) -> (String, String, NodeDetails) {
        let details = NodeDetails::Epic(EpicDetails {
            priority: self.priority,
            estimated_duration: self.estimated_duration,
        });
        (self.title, self.description, details)
    }
}

impl LevelRecord for FeatureRecord {
    const LEVEL: NodeType = NodeType::Feature;

    fn title(&self) -> &str {
        &self.title
    }

    fn into_parts(self) -> (String, String, NodeDetails) {
        let details = NodeDetails::Feature(FeatureDetails {
            priority: self.priority,
            estimated_effort: self.estimated_effort,
        });
        (self.title, self.description, details)
    }
}

impl LevelRecord for StoryRecord {
    const LEVEL: NodeType = NodeType::Story;

    fn title(&self) -> &str {
        &self.title
    }

    fn into_parts(self) -> (String, String, NodeDetails) {
        let details = NodeDetails::Story(StoryDetails {
            priority: self.priority,
            estimated_story_points: self.estimated_story_points,
            acceptance_criteria: self.acceptance_criteria,
        });
        (self.title, self.description, details)
    }
}

impl LevelRecord for TaskRecord {
    const LEVEL: NodeType = NodeType::Task;

    fn title(&self) -> &str {
        &self.title
    }

    fn into_parts(self) -> (String, String, NodeDetails) {
        let details = NodeDetails::Task(TaskDetails {
            priority: self.priority,
            estimated_hours: self.estimated_hours,
            status: self.status,
            dependencies: Default::default(),
        });
        (self.title, self.description, details)
    }
}

/// Validate one raw record at `index` of its batch
pub fn validate_record<R: LevelRecord>(index: usize, value: Value) -> std::result::Result<R, RecordError> {
    let invalid = |reason: String| RecordError {
        level: R::LEVEL,
        index,
        reason,
    };

    let record: R = serde_json::from_value(value).map_err(|e| invalid(e.to_string()))?;
    record.check().map_err(invalid)?;
    Ok(record)
}

/// Validate a whole batch under `policy`
///
/// Returned records keep their original index so ids minted from it stay
/// aligned with the model's array, even when records were skipped.
pub fn validate_batch<R: LevelRecord>(
    values: Vec<Value>,
    policy: BatchPolicy,
) -> Result<Vec<(usize, R)>> {
    let mut records = Vec::with_capacity(values.len());

    for (index, value) in values.into_iter().enumerate() {
        match validate_record::<R>(index, value) {
            Ok(record) => records.push((index, record)),
            Err(err) => match policy {
                BatchPolicy::Strict => return Err(err.into()),
                BatchPolicy::SkipInvalid => {
                    tracing::warn!("Skipping invalid {}", err);
                }
            },
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feature_record_verbatim() {
        let value = json!({
            "title": "Password login",
            "description": "## Feature Overview",
            "priority": "High",
            "estimatedEffort": "medium"
        });
        let record: FeatureRecord = validate_record(0, value).unwrap();
        assert_eq!(record.title, "Password login");
        assert_eq!(record.priority, Priority::High);
        assert_eq!(record.estimated_effort, Effort::Medium);
    }

    #[test]
    fn test_task_status_defaults_to_pending() {
        let value = json!({
            "title": "Add login route",
            "description": "Wire `POST /login`",
            "priority": "medium",
            "estimatedHours": 6
        });
        let record: TaskRecord = validate_record(0, value).unwrap();
        assert_eq!(record.status, TaskStatus::Pending);
    }

    #[test]
    fn test_story_criteria_optional() {
        let value = json!({
            "title": "As a user, I want to log in",
            "description": "",
            "priority": "low",
            "estimatedStoryPoints": 3
        });
        let record: StoryRecord = validate_record(0, value).unwrap();
        assert!(record.acceptance_criteria.is_empty());
    }

    #[test]
    fn test_missing_field_rejected() {
        let value = json!({"title": "No priority", "description": "", "estimatedDuration": "1 week"});
        let err = validate_record::<EpicRecord>(2, value).unwrap_err();
        assert_eq!(err.level, NodeType::Epic);
        assert_eq!(err.index, 2);
        assert!(err.reason.contains("priority"));
    }

    #[test]
    fn test_unknown_enum_rejected() {
        let value = json!({
            "title": "Export",
            "description": "",
            "priority": "urgent",
            "estimatedEffort": "small"
        });
        assert!(validate_record::<FeatureRecord>(0, value).is_err());
    }

    #[test]
    fn test_blank_title_rejected() {
        let value = json!({
            "title": "   ",
            "description": "",
            "priority": "low",
            "estimatedDuration": "1 week"
        });
        let err = validate_record::<EpicRecord>(0, value).unwrap_err();
        assert_eq!(err.reason, "title is empty");
    }

    #[test]
    fn test_batch_policies() {
        let values = vec![
            json!({"title": "A", "description": "", "priority": "high", "estimatedDuration": "1 week"}),
            json!({"title": "B", "description": ""}),
            json!({"title": "C", "description": "", "priority": "low", "estimatedDuration": "2 weeks"}),
        ];

        let err = validate_batch::<EpicRecord>(values.clone(), BatchPolicy::Strict).unwrap_err();
        assert!(matches!(err, WbsError::InvalidRecord { index: 1, .. }));

        let kept = validate_batch::<EpicRecord>(values, BatchPolicy::SkipInvalid).unwrap();
        let indices: Vec<_> = kept.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(kept[1].1.title, "C");
    }

    #[test]
    fn test_into_node() {
        let record = TaskRecord {
            title: "Write migration".to_string(),
            description: "Add `users` table".to_string(),
            priority: Priority::High,
            estimated_hours: 4,
            status: TaskStatus::Pending,
        };
        let stamp = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let node = record.into_node("story_9_0", stamp, 1);

        assert_eq!(node.id, "task_1700000000000_1");
        assert_eq!(node.parent_id.as_deref(), Some("story_9_0"));
        assert_eq!(node.node_type(), NodeType::Task);
        assert_eq!(node.timestamp, stamp);
        assert!(node.children.is_empty());
        assert!(node.task_details().unwrap().dependencies.is_empty());
    }
}
