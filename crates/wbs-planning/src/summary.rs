//! Tree summaries for the command line

use wbs_core::{Node, NodeType, TaskStatus};

/// Per-level counts of a breakdown tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakdownSummary {
    pub project_title: String,
    pub total_epics: usize,
    pub total_features: usize,
    pub total_stories: usize,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub estimated_hours: u64,
}

impl BreakdownSummary {
    pub fn from_tree(root: &Node) -> Self {
        let tasks: Vec<_> = root.iter().filter_map(|n| n.task_details()).collect();

        Self {
            project_title: root.title.clone(),
            total_epics: root.count(NodeType::Epic),
            total_features: root.count(NodeType::Feature),
            total_stories: root.count(NodeType::Story),
            total_tasks: tasks.len(),
            completed_tasks: tasks
                .iter()
                .filter(|t| t.status == TaskStatus::Completed)
                .count(),
            estimated_hours: tasks.iter().map(|t| u64::from(t.estimated_hours)).sum(),
        }
    }
}

impl std::fmt::Display for BreakdownSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Project: {}", self.project_title)?;
        writeln!(f, "  Epics: {}", self.total_epics)?;
        writeln!(f, "  Features: {}", self.total_features)?;
        writeln!(f, "  Stories: {}", self.total_stories)?;
        writeln!(
            f,
            "  Tasks: {} ({} completed)",
            self.total_tasks, self.completed_tasks
        )?;
        write!(f, "  Estimated hours: {}", self.estimated_hours)
    }
}

fn level_marker(node: &Node) -> &'static str {
    match node.node_type() {
        NodeType::Project => "",
        NodeType::Epic => "[E]",
        NodeType::Feature => "[F]",
        NodeType::Story => "[S]",
        NodeType::Task => match node.task_details().map(|t| t.status) {
            Some(TaskStatus::Completed) => "[x]",
            Some(TaskStatus::InProgress) => "[~]",
            _ => "[ ]",
        },
    }
}

/// Render a breakdown tree as ASCII art
///
/// ```text
/// Bookshop
/// ├── [E] Catalog (high)
/// │   └── [F] Search (medium)
/// └── [E] Checkout (medium)
/// ```
pub fn render_outline(root: &Node) -> String {
    let mut output = String::new();
    render_node(&mut output, root, "", true, true);
    output
}

fn render_node(output: &mut String, node: &Node, prefix: &str, is_last: bool, is_root: bool) {
    if is_root {
        output.push_str(&node.title);
    } else {
        let branch = if is_last { "└── " } else { "├── " };
        output.push_str(prefix);
        output.push_str(branch);
        output.push_str(level_marker(node));
        output.push(' ');
        output.push_str(&node.title);
        if let Some(priority) = node.priority() {
            output.push_str(&format!(" ({})", priority));
        }
    }
    output.push('\n');

    let child_prefix = if is_root {
        String::new()
    } else {
        let continuation = if is_last { "    " } else { "│   " };
        format!("{}{}", prefix, continuation)
    };

    for (i, child) in node.children.iter().enumerate() {
        let child_is_last = i == node.children.len() - 1;
        render_node(output, child, &child_prefix, child_is_last, false);
    }
}
