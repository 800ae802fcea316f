//! WBS CLI - work-breakdown generation from a project description
//!
//! Usage:
//!   wbs init [path]                     Write default .wbs/config.toml
//!   wbs check                           Test the model connection
//!   wbs generate <description>          Generate a full breakdown tree
//!   wbs expand <tree.json> <node-id>    Generate the next level under one node
//!   wbs show <tree.json>                Print the tree outline and counts
//!   wbs diagrams <tree.json> <task-id>  List the diagrams embedded in a task

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use wbs_agent::GeminiClient;
use wbs_core::{BatchPolicy, Node, NodeType, WbsConfig, WbsError};
use wbs_planning::{
    extract_diagrams, render_or_placeholder, render_outline, BreakdownGenerator, BreakdownSummary,
    HtmlEmbedRenderer,
};

#[derive(Parser)]
#[command(name = "wbs")]
#[command(author, version, about = "Generate work-breakdown trees with a language model")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration
    Init {
        /// Project path (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Check that the configured model answers
    Check,

    /// Generate a breakdown tree from a project description
    Generate {
        /// Free-text project description
        description: String,

        /// Project title (defaults to the first line of the description)
        #[arg(long)]
        title: Option<String>,

        /// Deepest level to generate (epics, features, stories, tasks)
        #[arg(long)]
        depth: Option<NodeType>,

        /// Drop invalid records instead of failing the batch
        #[arg(long)]
        skip_invalid: bool,

        /// Output file
        #[arg(short, long, default_value = "wbs.json")]
        output: PathBuf,
    },

    /// Generate the next level under one node of an existing tree
    Expand {
        /// Tree file written by `wbs generate`
        tree: PathBuf,

        /// Node to expand
        node_id: String,

        /// Drop invalid records instead of failing the batch
        #[arg(long)]
        skip_invalid: bool,

        /// Output file (defaults to overwriting the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a tree outline and per-level counts
    Show {
        /// Tree file
        tree: PathBuf,
    },

    /// List the mermaid diagrams embedded in a task
    Diagrams {
        /// Tree file
        tree: PathBuf,

        /// Task id
        task_id: String,

        /// Emit HTML for each diagram instead of the raw definition
        #[arg(long)]
        html: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let result = match cli.command {
        Commands::Init { path } => cmd_init(path),
        Commands::Check => cmd_check().await,
        Commands::Generate {
            description,
            title,
            depth,
            skip_invalid,
            output,
        } => cmd_generate(description, title, depth, skip_invalid, output).await,
        Commands::Expand {
            tree,
            node_id,
            skip_invalid,
            output,
        } => cmd_expand(tree, node_id, skip_invalid, output).await,
        Commands::Show { tree } => cmd_show(tree),
        Commands::Diagrams { tree, task_id, html } => cmd_diagrams(tree, task_id, html).await,
    };

    if let Err(ref e) = result {
        if let Some(wbs) = e.downcast_ref::<WbsError>() {
            eprintln!("{}", wbs.user_message());
        }
    }
    result
}

fn cmd_init(path: PathBuf) -> Result<()> {
    info!("Initializing WBS in {:?}", path);

    WbsConfig::write_default(&path).context("Failed to write config")?;

    println!("Initialized WBS in {:?}", path);
    println!("Created:");
    println!("  .wbs/config.toml");
    println!("\nNext steps:");
    println!("  1. Export your key: export GEMINI_API_KEY=<your key>");
    println!("  2. Run 'wbs check' to test the connection");
    println!("  3. Run 'wbs generate \"<project description>\"'");

    Ok(())
}

async fn cmd_check() -> Result<()> {
    let config = load_config()?;
    let generator = build_generator(&config, false)?;

    if generator.test_connection().await {
        println!("Connected to {}", generator.model_name());
        Ok(())
    } else {
        bail!("Model {} did not answer the connection test", generator.model_name())
    }
}

async fn cmd_generate(
    description: String,
    title: Option<String>,
    depth: Option<NodeType>,
    skip_invalid: bool,
    output: PathBuf,
) -> Result<()> {
    let config = load_config()?;
    let generator = build_generator(&config, skip_invalid)?;
    let depth = depth.unwrap_or(config.generation.max_depth);

    if depth == NodeType::Project {
        bail!("--depth must be one of epics, features, stories, tasks");
    }

    let title = title.unwrap_or_else(|| {
        description
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string()
    });
    let mut project = Node::project(title, description);

    info!("Generating breakdown for {:?} down to {}", project.title, depth.plural());
    let failures = expand_levels(&generator, &mut project, depth).await?;

    write_tree(&project, &output)?;

    println!("{}", BreakdownSummary::from_tree(&project));
    println!("\nWrote {:?}", output);
    if failures > 0 {
        println!("{} generation call(s) failed; run 'wbs expand' to retry them", failures);
    }

    Ok(())
}

/// Generate level by level down to `depth`, expanding siblings concurrently
///
/// A failed call leaves that parent childless and is counted, the rest of the
/// level still lands in the tree.
async fn expand_levels(
    generator: &BreakdownGenerator,
    root: &mut Node,
    depth: NodeType,
) -> Result<usize> {
    let mut frontier = vec![root.id.clone()];
    let mut level = root.node_type();
    let mut failures = 0;

    while let Some(next) = level.child() {
        if next > depth || frontier.is_empty() {
            break;
        }

        let parents: Vec<Node> = frontier
            .iter()
            .filter_map(|id| root.find(id).cloned())
            .collect();
        info!("Generating {} for {} parent(s)", next.plural(), parents.len());

        let batches = join_all(parents.iter().map(|p| generator.generate_children(p))).await;

        let mut next_frontier = Vec::new();
        for (parent, batch) in parents.iter().zip(batches) {
            match batch {
                Ok(children) => {
                    next_frontier.extend(children.iter().map(|c| c.id.clone()));
                    root.append_children(&parent.id, children)?;
                }
                Err(e) => {
                    warn!(
                        "Skipping {} {}: {} ({})",
                        parent.node_type(),
                        parent.id,
                        e,
                        e.user_message()
                    );
                    failures += 1;
                }
            }
        }

        frontier = next_frontier;
        level = next;
    }

    Ok(failures)
}

async fn cmd_expand(
    tree: PathBuf,
    node_id: String,
    skip_invalid: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config()?;
    let generator = build_generator(&config, skip_invalid)?;
    let mut root = read_tree(&tree)?;

    let parent = root
        .find(&node_id)
        .cloned()
        .ok_or_else(|| WbsError::NodeNotFound(node_id.clone()))?;

    let children = generator.generate_children(&parent).await?;
    let added = children.len();
    root.append_children(&parent.id, children)?;

    let output = output.unwrap_or(tree);
    write_tree(&root, &output)?;

    println!("Added {} child node(s) under {}", added, node_id);
    println!("Wrote {:?}", output);
    Ok(())
}

fn cmd_show(tree: PathBuf) -> Result<()> {
    let root = read_tree(&tree)?;

    print!("{}", render_outline(&root));
    println!();
    println!("{}", BreakdownSummary::from_tree(&root));
    Ok(())
}

async fn cmd_diagrams(tree: PathBuf, task_id: String, html: bool) -> Result<()> {
    let root = read_tree(&tree)?;
    let task = root
        .find(&task_id)
        .ok_or_else(|| WbsError::NodeNotFound(task_id.clone()))?;

    if task.node_type() != NodeType::Task {
        bail!("{} is a {}, not a task", task_id, task.node_type());
    }

    let diagrams = extract_diagrams(&task.description);
    if diagrams.is_empty() {
        println!("No diagrams in {}", task_id);
        return Ok(());
    }

    for (i, definition) in diagrams.iter().enumerate() {
        println!("--- Diagram {} ---", i + 1);
        if html {
            println!("{}", render_or_placeholder(&HtmlEmbedRenderer, definition).await);
        } else {
            println!("{}", definition);
        }
    }
    Ok(())
}

fn load_config() -> Result<WbsConfig> {
    WbsConfig::load_or_default(Path::new(".")).context("Failed to load .wbs/config.toml")
}

fn build_generator(config: &WbsConfig, skip_invalid: bool) -> Result<BreakdownGenerator> {
    let client = GeminiClient::from_config(&config.model)?;
    let policy = if skip_invalid {
        BatchPolicy::SkipInvalid
    } else {
        config.generation.batch_policy
    };
    Ok(BreakdownGenerator::new(Arc::new(client)).with_policy(policy))
}

fn read_tree(path: &Path) -> Result<Node> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read tree file {:?}", path))?;
    let root: Node = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse tree file {:?}", path))?;
    root.validate_tree()?;
    Ok(root)
}

fn write_tree(root: &Node, path: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(root)?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}
