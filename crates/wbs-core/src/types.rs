//! Core type definitions for the work-breakdown tree

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use uuid::Uuid;

use crate::{Result, WbsError};

/// Level of a node in the fixed project → epic → feature → story → task chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Project,
    Epic,
    Feature,
    Story,
    Task,
}

impl NodeType {
    /// The level directly below this one, if any
    pub fn child(&self) -> Option<Self> {
        match self {
            Self::Project => Some(Self::Epic),
            Self::Epic => Some(Self::Feature),
            Self::Feature => Some(Self::Story),
            Self::Story => Some(Self::Task),
            Self::Task => None,
        }
    }

    /// The level directly above this one, if any
    pub fn parent(&self) -> Option<Self> {
        match self {
            Self::Project => None,
            Self::Epic => Some(Self::Project),
            Self::Feature => Some(Self::Epic),
            Self::Story => Some(Self::Feature),
            Self::Task => Some(Self::Story),
        }
    }

    /// Prefix used when minting ids for nodes of this level
    pub fn id_prefix(&self) -> &'static str {
        self.as_str()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Epic => "epic",
            Self::Feature => "feature",
            Self::Story => "story",
            Self::Task => "task",
        }
    }

    /// Plural label for summaries
    pub fn plural(&self) -> &'static str {
        match self {
            Self::Project => "projects",
            Self::Epic => "epics",
            Self::Feature => "features",
            Self::Story => "stories",
            Self::Task => "tasks",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "project" | "projects" => Ok(Self::Project),
            "epic" | "epics" => Ok(Self::Epic),
            "feature" | "features" => Ok(Self::Feature),
            "story" | "stories" => Ok(Self::Story),
            "task" | "tasks" => Ok(Self::Task),
            _ => Err(format!("Invalid node type: {}", s)),
        }
    }
}

/// Priority levels for every non-project node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

impl TryFrom<String> for Priority {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

/// Relative effort estimate for a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Effort {
    Small,
    Medium,
    Large,
}

impl std::fmt::Display for Effort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Small => write!(f, "small"),
            Self::Medium => write!(f, "medium"),
            Self::Large => write!(f, "large"),
        }
    }
}

impl std::str::FromStr for Effort {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            _ => Err(format!("Invalid effort: {}", s)),
        }
    }
}

impl TryFrom<String> for Effort {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

/// Task workflow status, owned by downstream tooling after creation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", try_from = "String")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in-progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "in-progress" | "in_progress" | "inprogress" => Ok(Self::InProgress),
            "completed" | "done" => Ok(Self::Completed),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

impl TryFrom<String> for TaskStatus {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpicDetails {
    pub priority: Priority,
    /// Free text, e.g. "2-3 weeks"
    pub estimated_duration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDetails {
    pub priority: Priority,
    pub estimated_effort: Effort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryDetails {
    pub priority: Priority,
    pub estimated_story_points: u32,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetails {
    pub priority: Priority,
    pub estimated_hours: u32,
    #[serde(default)]
    pub status: TaskStatus,
    /// Ids of other tasks this one waits on
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
}

/// Level-specific attributes, tagged by node type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeDetails {
    Project,
    Epic(EpicDetails),
    Feature(FeatureDetails),
    Story(StoryDetails),
    Task(TaskDetails),
}

impl NodeDetails {
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Project => NodeType::Project,
            Self::Epic(_) => NodeType::Epic,
            Self::Feature(_) => NodeType::Feature,
            Self::Story(_) => NodeType::Story,
            Self::Task(_) => NodeType::Task,
        }
    }
}

/// One entity in the work-breakdown tree
///
/// Serializes with camelCase keys and a lowercase `type` tag so the JSON
/// shape is `{"id", "type", "title", "description", "parentId", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    pub title: String,
    /// Markdown body; task descriptions may embed a mermaid block
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub details: NodeDetails,
    #[serde(default)]
    pub children: Vec<Node>,
}

/// Build the id for the `index`-th node of a batch minted at `stamp`
///
/// Format: `{prefix}_{millis}_{index}` (e.g. `feature_1718000000000_2`)
pub fn batch_node_id(level: NodeType, stamp: DateTime<Utc>, index: usize) -> String {
    format!("{}_{}_{}", level.id_prefix(), stamp.timestamp_millis(), index)
}

impl Node {
    /// Create the root project node
    pub fn project(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: format!("project_{}", Uuid::new_v4().simple()),
            title: title.into(),
            description: description.into(),
            parent_id: None,
            timestamp: Utc::now(),
            details: NodeDetails::Project,
            children: Vec::new(),
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.details.node_type()
    }

    pub fn priority(&self) -> Option<Priority> {
        match &self.details {
            NodeDetails::Project => None,
            NodeDetails::Epic(d) => Some(d.priority),
            NodeDetails::Feature(d) => Some(d.priority),
            NodeDetails::Story(d) => Some(d.priority),
            NodeDetails::Task(d) => Some(d.priority),
        }
    }

    /// Acceptance criteria of a story; empty for every other level
    pub fn acceptance_criteria(&self) -> &[String] {
        match &self.details {
            NodeDetails::Story(d) => &d.acceptance_criteria,
            _ => &[],
        }
    }

    pub fn task_details(&self) -> Option<&TaskDetails> {
        match &self.details {
            NodeDetails::Task(d) => Some(d),
            _ => None,
        }
    }

    /// Depth-first pre-order traversal including `self`
    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }

    pub fn find(&self, id: &str) -> Option<&Node> {
        self.iter().find(|n| n.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Count nodes of one level in this subtree
    pub fn count(&self, node_type: NodeType) -> usize {
        self.iter().filter(|n| n.node_type() == node_type).count()
    }

    /// Append a generated batch under `parent_id`
    ///
    /// All-or-nothing: every child must sit one level below the parent,
    /// reference it through `parent_id`, carry no children yet, and have an
    /// id unused anywhere in this tree. Existing children are kept.
    pub fn append_children(&mut self, parent_id: &str, children: Vec<Node>) -> Result<()> {
        let mut seen: HashSet<&str> = self.iter().map(|n| n.id.as_str()).collect();

        let parent = self
            .find(parent_id)
            .ok_or_else(|| WbsError::NodeNotFound(parent_id.to_string()))?;
        let expected = parent.node_type().child().ok_or_else(|| {
            WbsError::Hierarchy(format!("{} nodes cannot have children", parent.node_type()))
        })?;

        for child in &children {
            if child.node_type() != expected {
                return Err(WbsError::Hierarchy(format!(
                    "{} {} cannot be a child of {} {}",
                    child.node_type(),
                    child.id,
                    parent.node_type(),
                    parent.id
                )));
            }
            if child.parent_id.as_deref() != Some(parent_id) {
                return Err(WbsError::Hierarchy(format!(
                    "{} has parent_id {:?}, expected {}",
                    child.id, child.parent_id, parent_id
                )));
            }
            if !child.children.is_empty() {
                return Err(WbsError::Hierarchy(format!(
                    "{} must be attached before its own children",
                    child.id
                )));
            }
            if !seen.insert(child.id.as_str()) {
                return Err(WbsError::Hierarchy(format!("duplicate id {}", child.id)));
            }
        }

        let parent = self
            .find_mut(parent_id)
            .ok_or_else(|| WbsError::NodeNotFound(parent_id.to_string()))?;
        parent.children.extend(children);
        Ok(())
    }

    /// Check every structural invariant of this subtree
    pub fn validate_tree(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for node in self.iter() {
            if !seen.insert(node.id.as_str()) {
                return Err(WbsError::Hierarchy(format!("duplicate id {}", node.id)));
            }
            let expected = node.node_type().child();
            for child in &node.children {
                if Some(child.node_type()) != expected {
                    return Err(WbsError::Hierarchy(format!(
                        "{} {} cannot be a child of {} {}",
                        child.node_type(),
                        child.id,
                        node.node_type(),
                        node.id
                    )));
                }
                if child.parent_id.as_deref() != Some(node.id.as_str()) {
                    return Err(WbsError::Hierarchy(format!(
                        "{} has parent_id {:?}, expected {}",
                        child.id, child.parent_id, node.id
                    )));
                }
            }
        }
        if self.node_type() == NodeType::Project && self.parent_id.is_some() {
            return Err(WbsError::Hierarchy("project root must not have a parent".into()));
        }
        Ok(())
    }

    /// Update the status of a task in this tree
    pub fn set_task_status(&mut self, task_id: &str, status: TaskStatus) -> Result<()> {
        let node = self
            .find_mut(task_id)
            .ok_or_else(|| WbsError::NodeNotFound(task_id.to_string()))?;
        match &mut node.details {
            NodeDetails::Task(d) => {
                d.status = status;
                Ok(())
            }
            _ => Err(WbsError::Hierarchy(format!("{} is not a task", task_id))),
        }
    }

    /// Record that `task_id` depends on `depends_on`; both must be tasks in this tree
    pub fn add_task_dependency(&mut self, task_id: &str, depends_on: &str) -> Result<()> {
        if task_id == depends_on {
            return Err(WbsError::Hierarchy(format!("{} cannot depend on itself", task_id)));
        }
        match self.find(depends_on) {
            Some(n) if n.node_type() == NodeType::Task => {}
            Some(_) => return Err(WbsError::Hierarchy(format!("{} is not a task", depends_on))),
            None => return Err(WbsError::NodeNotFound(depends_on.to_string())),
        }

        let node = self
            .find_mut(task_id)
            .ok_or_else(|| WbsError::NodeNotFound(task_id.to_string()))?;
        match &mut node.details {
            NodeDetails::Task(d) => {
                d.dependencies.insert(depends_on.to_string());
                Ok(())
            }
            _ => Err(WbsError::Hierarchy(format!("{} is not a task", task_id))),
        }
    }
}

/// Pre-order iterator over a subtree
pub struct Iter<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
