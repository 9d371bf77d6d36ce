use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use weftcore::{
    ExecutionEvent, NodeData, NodeType, Position, Services, WorkflowDefinition, WorkflowEdge,
    WorkflowNode,
};
use weftnodes::register_builtin;
use weftruntime::{ExecutionManager, NodeRegistry};

#[derive(Parser)]
#[command(name = "weft")]
#[command(about = "Weft workflow engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Input data as JSON (a bare string also works)
        #[arg(short, long)]
        input: Option<String>,

        /// Show node-by-node progress
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a workflow file
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,
    },

    /// List node types with built-in handlers
    Nodes,

    /// Create a new example workflow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            input,
            verbose,
        } => {
            let level = if verbose { "debug" } else { "info" };
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
                )
                .init();

            run_workflow(file, input, verbose).await?;
        }

        Commands::Validate { file } => {
            validate_workflow(file)?;
        }

        Commands::Nodes => {
            list_nodes();
        }

        Commands::Init { output } => {
            create_example_workflow(output)?;
        }
    }

    Ok(())
}

fn builtin_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    register_builtin(&mut registry);
    registry
}

async fn run_workflow(file: PathBuf, input: Option<String>, verbose: bool) -> Result<()> {
    println!("🚀 Loading workflow from: {}", file.display());

    let raw = std::fs::read_to_string(&file)?;
    let definition: WorkflowDefinition = serde_json::from_str(&raw)?;

    println!("📋 Workflow: {}", definition.name);
    println!("   Nodes: {}", definition.nodes.len());
    println!("   Edges: {}", definition.edges.len());
    println!();

    let input = match input {
        // Accept any JSON; fall back to treating the argument as a string.
        Some(raw) => serde_json::from_str(&raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw)),
        None => serde_json::Value::Null,
    };

    // No external services are wired up in the CLI: workflows touching the
    // LLM, agent store, or document search fail with a service error.
    let manager = ExecutionManager::new(Arc::new(builtin_registry()), Services::new());

    let event_task = if verbose {
        let mut events = manager.subscribe_events();
        Some(tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                match event {
                    ExecutionEvent::RunStarted { .. } => {
                        println!("▶️  Run started");
                    }
                    ExecutionEvent::NodeStarted {
                        node_id, node_type, ..
                    } => {
                        println!("  ⚡ Starting node: {} ({})", node_id, node_type);
                    }
                    ExecutionEvent::NodeCompleted {
                        node_id,
                        duration_ms,
                        ..
                    } => {
                        println!("  ✅ Node {} completed in {}ms", node_id, duration_ms);
                    }
                    ExecutionEvent::NodeSkipped { node_id, .. } => {
                        println!("  ⏭️  Node {} skipped (branch not taken)", node_id);
                    }
                    ExecutionEvent::NodeFailed { node_id, error, .. } => {
                        println!("  ❌ Node {} failed: {}", node_id, error);
                    }
                    ExecutionEvent::RunFinished {
                        status,
                        duration_ms,
                        ..
                    } => {
                        println!("🏁 Run finished with status {} in {}ms", status, duration_ms);
                    }
                }
            }
        }))
    } else {
        None
    };

    let outcome = manager.execute_workflow(definition, input, None).await?;

    if let Some(task) = event_task {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        task.abort();
    }

    println!();
    println!("📊 Execution {} completed", outcome.execution_id);
    println!("📤 Result:");
    println!("{}", serde_json::to_string_pretty(&outcome.result)?);

    Ok(())
}

fn validate_workflow(file: PathBuf) -> Result<()> {
    println!("🔍 Validating workflow: {}", file.display());

    let raw = std::fs::read_to_string(&file)?;
    let definition: WorkflowDefinition = serde_json::from_str(&raw)?;
    definition.validate()?;

    let registry = builtin_registry();
    let unhandled: Vec<&WorkflowNode> = definition
        .nodes
        .iter()
        .filter(|n| !registry.contains(n.node_type))
        .collect();

    println!("✅ Workflow is valid:");
    println!("   Name: {}", definition.name);
    println!("   Nodes: {}", definition.nodes.len());
    println!("   Edges: {}", definition.edges.len());
    for node in unhandled {
        println!(
            "   ⚠️  Node {} has type '{}' with no built-in handler",
            node.id, node.node_type
        );
    }

    Ok(())
}

fn list_nodes() {
    println!("📦 Available Node Types:");
    println!();

    let registry = builtin_registry();
    for node_type in registry.list_node_types() {
        if let Some(metadata) = registry.get_metadata(node_type) {
            println!("  • {} ({})", node_type, metadata.category);
            println!("    {}", metadata.description);
        } else {
            println!("  • {}", node_type);
        }
    }
}

fn create_example_workflow(output: PathBuf) -> Result<()> {
    let definition = WorkflowDefinition {
        id: "example".to_string(),
        workflow_id: "example".to_string(),
        name: "Example question workflow".to_string(),
        description: Some("Wraps the input in a prompt and formats the answer".to_string()),
        version: 1,
        is_published: false,
        nodes: vec![
            example_node("input", NodeType::UserInput, serde_json::json!({}), 100.0),
            example_node(
                "prompt",
                NodeType::PromptTemplate,
                serde_json::json!({"template": "Q: {{q}}", "variables": ["q"]}),
                300.0,
            ),
            example_node(
                "output",
                NodeType::Response,
                serde_json::json!({"format": "text"}),
                500.0,
            ),
        ],
        edges: vec![
            example_edge("e1", "input", "prompt"),
            example_edge("e2", "prompt", "output"),
        ],
        variables: Vec::new(),
    };

    let json = serde_json::to_string_pretty(&definition)?;
    std::fs::write(&output, json)?;

    println!("✨ Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!(
        "  weft run --file {} --input '\"capital of France\"'",
        output.display()
    );

    Ok(())
}

fn example_node(id: &str, node_type: NodeType, config: serde_json::Value, x: f64) -> WorkflowNode {
    WorkflowNode {
        id: id.to_string(),
        node_type,
        position: Position { x, y: 100.0 },
        data: NodeData {
            label: id.to_string(),
            config,
            description: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
        },
    }
}

fn example_edge(id: &str, source: &str, target: &str) -> WorkflowEdge {
    WorkflowEdge {
        id: id.to_string(),
        source: source.to_string(),
        target: target.to_string(),
        source_handle: None,
        target_handle: None,
        edge_type: Default::default(),
        data: None,
    }
}
