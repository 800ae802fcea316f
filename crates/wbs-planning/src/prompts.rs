//! Prompt builder for each breakdown level
//!
//! Every prompt has the same skeleton:
//! - A role framing suited to the level being generated
//! - The parent node the new items belong to
//! - The fields each item must carry
//! - Markdown rules for the `description` field
//! - The exact JSON array schema, and an instruction to return nothing else
//!
//! Building a prompt is a pure function of the parent node.

use wbs_core::{Node, NodeType};

/// Fixed wording for one generated level
struct LevelPrompt {
    role: &'static str,
    request: &'static str,
    parent_label: &'static str,
    item_label: &'static str,
    fields: &'static [&'static str],
    formatting: &'static [&'static str],
    schema: &'static str,
}

static EPIC_PROMPT: LevelPrompt = LevelPrompt {
    role: "You are a project management expert.",
    request: "Based on this project description, generate as many high-level epics as are needed to complete the project.",
    parent_label: "Project",
    item_label: "epic",
    fields: &[
        "A clear, actionable title",
        "A detailed description in **markdown format** covering what the epic includes, its key deliverables, and its success criteria",
        "Priority level (high/medium/low)",
        "Estimated duration (e.g. \"2-3 weeks\", \"1 month\")",
    ],
    formatting: &[
        "Use **bold** for important terms",
        "Use bullet points with - for key features",
        "Use ## for subsections",
        "Use `code` for technical terms",
        "Use > for important notes or requirements",
    ],
    schema: r###"[
  {
    "title": "Epic Title",
    "description": "## Overview\n\n**Detailed description** in markdown format with:\n- Key features\n- Deliverables\n- Success criteria\n\n> Important notes or requirements",
    "priority": "high|medium|low",
    "estimatedDuration": "X weeks/months"
  }
]"###,
};

static FEATURE_PROMPT: LevelPrompt = LevelPrompt {
    role: "You are a software architect.",
    request: "Based on this epic, generate 2-4 specific features that are needed to complete it.",
    parent_label: "Epic",
    item_label: "feature",
    fields: &[
        "A clear, specific title",
        "A detailed description in **markdown format** explaining what the feature does, its functionality, and its technical requirements",
        "Priority level (high/medium/low)",
        "Estimated effort (small/medium/large)",
    ],
    formatting: &[
        "Use **bold** for key functionality",
        "Use bullet points with - for feature details",
        "Use ## for subsections (e.g. ## Technical Requirements)",
        "Use `code` for technical terms and APIs",
        "Use > for important implementation notes",
    ],
    schema: r###"[
  {
    "title": "Feature Title",
    "description": "## Feature Overview\n\n**What it does**: Brief description\n\n**Key functionality**:\n- Detail 1\n- Detail 2\n\n## Technical Requirements\n- Requirement 1\n- Requirement 2\n\n> Implementation notes",
    "priority": "high|medium|low",
    "estimatedEffort": "small|medium|large"
  }
]"###,
};

static STORY_PROMPT: LevelPrompt = LevelPrompt {
    role: "You are a product manager.",
    request: "Based on this feature, generate 2-3 user stories that are needed to implement it.",
    parent_label: "Feature",
    item_label: "user story",
    fields: &[
        "A title in the form \"As a [user type], I want [functionality] so that [benefit]\"",
        "A detailed description in **markdown format** explaining the story, its context, and its business value",
        "3-5 acceptance criteria in markdown format",
        "Priority level (high/medium/low)",
        "Estimated story points (1-8)",
    ],
    formatting: &[
        "Use **bold** for key user actions and benefits",
        "Use bullet points with - for lists",
        "Use ## for subsections (e.g. ## Context, ## Business Value)",
        "Use `code` for specific functionality or technical terms",
        "Use > for important notes or edge cases",
        "Write each acceptance criterion as **Given** ..., **when** ..., **then** ...",
    ],
    schema: r###"[
  {
    "title": "As a user, I want to...",
    "description": "## Context\n\n**User need**: Brief explanation\n\n**Business value**: Why this matters\n\n## User Story Details\n\nWhat the user wants to accomplish and why.\n\n> Edge cases to consider",
    "acceptanceCriteria": [
      "**Given** a specific context, **when** the user performs an action, **then** a specific outcome occurs",
      "**Given** another context, **when** the user does something, **then** another outcome happens"
    ],
    "priority": "high|medium|low",
    "estimatedStoryPoints": 5
  }
]"###,
};

static TASK_PROMPT: LevelPrompt = LevelPrompt {
    role: "You are a technical lead.",
    request: "Based on this user story, generate 3-5 specific development tasks that are needed to implement it.",
    parent_label: "User Story",
    item_label: "task",
    fields: &[
        "A clear, actionable title",
        "A detailed description in **markdown format** explaining what needs to be done, the technical approach, and implementation details",
        "Priority level (high/medium/low)",
        "Estimated hours (1-16)",
        "Status (pending)",
        "**A Mermaid flowchart** showing the task workflow, dependencies, and decision points",
    ],
    formatting: &[
        "Use **bold** for key technical concepts and deliverables",
        "Use bullet points with - for implementation steps",
        "Use ## for subsections (e.g. ## Technical Approach, ## Implementation Steps)",
        "Use `code` for specific code, APIs, or technical terms",
        "Use > for important technical notes or considerations",
        "Use numbered lists for step-by-step instructions",
    ],
    schema: r###"[
  {
    "title": "Task Title",
    "description": "## Task Overview\n\n**Objective**: What needs to be accomplished\n\n## Technical Approach\n\nBrief explanation.\n\n## Implementation Steps\n\n1. **Step 1**: Description\n2. **Step 2**: Description\n\n## Deliverables\n\n- Deliverable 1\n\n> Technical considerations\n\n## Workflow Diagram\n\n```mermaid\nflowchart TD\n    A[\"Start\"] --> B[\"Step 1\"]\n    B --> C{\"Decision Point\"}\n    C -->|Yes| D[\"Step 2A\"]\n    C -->|No| E[\"Step 2B\"]\n    D --> F[\"End\"]\n    E --> F\n```",
    "priority": "high|medium|low",
    "estimatedHours": 8,
    "status": "pending"
  }
]"###,
};

const DIAGRAM_RULES: &[&str] = &[
    "Put the flowchart in a markdown code block opened with ```mermaid",
    "Show the main workflow steps as nodes",
    "Use diamond shapes for decision points",
    "Show dependencies between steps",
    "Include start and end points",
    "Use simple node IDs (A, B, C, ...) and put descriptions in labels",
    "**IMPORTANT**: Wrap every node label in double quotes, e.g. A[\"Start Process\"] --> B{\"Check Condition\"}",
    "Keep it focused on this task's workflow",
];

fn level_prompt(level: NodeType) -> Option<&'static LevelPrompt> {
    match level {
        NodeType::Epic => Some(&EPIC_PROMPT),
        NodeType::Feature => Some(&FEATURE_PROMPT),
        NodeType::Story => Some(&STORY_PROMPT),
        NodeType::Task => Some(&TASK_PROMPT),
        NodeType::Project => None,
    }
}

/// Build the prompt that asks for the children of `parent`
///
/// Returns `None` for task parents, which have no level below them.
pub fn build_prompt(parent: &Node) -> Option<String> {
    let level = parent.node_type().child()?;
    let wording = level_prompt(level)?;

    let mut prompt = String::new();

    prompt.push_str(wording.role);
    prompt.push(' ');
    prompt.push_str(wording.request);
    prompt.push_str("\n\n");

    // Parent context
    prompt.push_str(&format!("{}: {}\n", wording.parent_label, parent.title));
    prompt.push_str(&format!("Description: {}\n", parent.description));
    if level == NodeType::Task {
        let criteria = parent.acceptance_criteria();
        let joined = if criteria.is_empty() {
            "N/A".to_string()
        } else {
            criteria.join(", ")
        };
        prompt.push_str(&format!("Acceptance Criteria: {}\n", joined));
    }
    prompt.push('\n');

    // Required fields
    prompt.push_str(&format!("For each {}, provide:\n", wording.item_label));
    for field in wording.fields {
        prompt.push_str(&format!("- {}\n", field));
    }
    prompt.push('\n');

    // Description formatting
    prompt.push_str(
        "**Important**: Write the description in markdown format with proper formatting:\n",
    );
    for rule in wording.formatting {
        prompt.push_str(&format!("- {}\n", rule));
    }
    prompt.push('\n');

    if level == NodeType::Task {
        prompt.push_str("**For the Mermaid flowchart**:\n");
        for rule in DIAGRAM_RULES {
            prompt.push_str(&format!("- {}\n", rule));
        }
        prompt.push('\n');
    }

    // Schema
    prompt.push_str("Format your response as a JSON array with this structure:\n");
    prompt.push_str(wording.schema);
    prompt.push_str("\n\nReturn only the JSON array, no additional text.");

    Some(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeSet;
    use wbs_core::{NodeDetails, Priority, StoryDetails, TaskDetails, TaskStatus};

    fn story(criteria: Vec<&str>) -> Node {
        Node {
            id: "story_1_0".to_string(),
            title: "As a shopper, I want to pay by card".to_string(),
            description: "## Context\n\nCard payments".to_string(),
            parent_id: Some("feature_1_0".to_string()),
            timestamp: Utc::now(),
            details: NodeDetails::Story(StoryDetails {
                priority: Priority::High,
                estimated_story_points: 5,
                acceptance_criteria: criteria.into_iter().map(String::from).collect(),
            }),
            children: Vec::new(),
        }
    }

    #[test]
    fn test_epic_prompt() {
        let project = Node::project("Bookshop", "Sell books online");
        let prompt = build_prompt(&project).unwrap();

        assert!(prompt.starts_with("You are a project management expert."));
        assert!(prompt.contains("Project: Bookshop\nDescription: Sell books online\n"));
        assert!(prompt.contains("\"estimatedDuration\""));
        assert!(!prompt.contains("Acceptance Criteria:"));
        assert!(prompt.ends_with("Return only the JSON array, no additional text."));
    }

    #[test]
    fn test_task_prompt_includes_criteria() {
        let prompt = build_prompt(&story(vec!["card accepted", "receipt sent"])).unwrap();

        assert!(prompt.starts_with("You are a technical lead."));
        assert!(prompt.contains("User Story: As a shopper, I want to pay by card"));
        assert!(prompt.contains("Acceptance Criteria: card accepted, receipt sent\n"));
        assert!(prompt.contains("```mermaid"));
        assert!(prompt.contains("\"estimatedHours\": 8"));
    }

    #[test]
    fn test_task_prompt_without_criteria() {
        let prompt = build_prompt(&story(vec![])).unwrap();
        assert!(prompt.contains("Acceptance Criteria: N/A\n"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let s = story(vec!["a"]);
        assert_eq!(build_prompt(&s), build_prompt(&s));
    }

    #[test]
    fn test_every_level_names_its_fields() {
        let expectations = [
            (NodeType::Epic, "estimatedDuration"),
            (NodeType::Feature, "estimatedEffort"),
            (NodeType::Story, "estimatedStoryPoints"),
            (NodeType::Task, "estimatedHours"),
        ];
        for (level, field) in expectations {
            let wording = level_prompt(level).unwrap();
            assert!(wording.schema.contains(field), "{} schema missing {}", level, field);
            assert!(wording.schema.contains("\"priority\""));
            assert!(wording.schema.contains("\"description\""));
        }
    }

    #[test]
    fn test_no_prompt_below_tasks() {
        let task = Node {
            id: "task_1_0".to_string(),
            title: "Wire up Stripe".to_string(),
            description: String::new(),
            parent_id: Some("story_1_0".to_string()),
            timestamp: Utc::now(),
            details: NodeDetails::Task(TaskDetails {
                priority: Priority::Low,
                estimated_hours: 3,
                status: TaskStatus::Pending,
                dependencies: BTreeSet::new(),
            }),
            children: Vec::new(),
        };
        assert!(build_prompt(&task).is_none());
    }
}
