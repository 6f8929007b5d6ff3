use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use treevm::{Builder, Graph, GraphConfig, LeafShape, SpecNode, Value};

#[derive(Parser)]
#[command(name = "treevm")]
#[command(about = "Run declarative dataflow tree specifications")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a specification, push inputs into it and print what comes out
    Run(RunArgs),
    /// Build a specification and print a summary of the graph
    Check {
        /// Path to the specification (JSON)
        file: PathBuf,
        #[command(flatten)]
        config: ConfigArgs,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the registered leaf kinds
    Kinds,
}

#[derive(Args)]
struct RunArgs {
    /// Path to the specification (JSON)
    file: PathBuf,
    /// JSON value pushed into the root, in order; repeatable
    #[arg(long = "input", value_name = "JSON")]
    inputs: Vec<String>,
    #[command(flatten)]
    config: ConfigArgs,
    /// Wait for timers in wall-clock time instead of jumping virtual time
    #[arg(long)]
    realtime: bool,
}

#[derive(Args)]
struct ConfigArgs {
    /// Graph configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Log every value hop on the `treevm::trace` target
    #[arg(long)]
    trace: bool,
    /// Maximum nesting of synchronous deliveries before a push fails
    #[arg(long)]
    max_depth: Option<usize>,
    /// Maximum ticks `settle` spends draining deferred work
    #[arg(long)]
    max_ticks: Option<usize>,
}

impl ConfigArgs {
    fn load(&self) -> Result<GraphConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = read(path)?;
                serde_json::from_str(&text)
                    .with_context(|| format!("invalid config in {}", path.display()))?
            }
            None => GraphConfig::default(),
        };
        if self.trace {
            config.trace = true;
        }
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
        if let Some(max_ticks) = self.max_ticks {
            config.max_ticks = max_ticks;
        }
        debug!(?config, "graph config");
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Check { file, config, json } => check(&file, &config, json),
        Commands::Kinds => {
            let registry = treevm_leaves::registry()?;
            for kind in registry.kinds() {
                let shape = match registry.shape(kind) {
                    Some(LeafShape::Condition) => "condition",
                    _ => "process",
                };
                println!("{kind}\t{shape}");
            }
            Ok(())
        }
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
}

fn load_spec(path: &Path) -> Result<SpecNode> {
    let text = read(path)?;
    SpecNode::from_json_str(&text)
        .with_context(|| format!("invalid specification in {}", path.display()))
}

fn build(path: &Path, config: GraphConfig) -> Result<Graph> {
    let spec = load_spec(path)?;
    let registry = treevm_leaves::registry()?;
    let graph = Builder::new(&registry)
        .with_config(config)
        .build(&spec)
        .with_context(|| format!("cannot build {}", path.display()))?;
    info!(graph = %graph.id(), nodes = graph.node_count(), "graph built");
    Ok(graph)
}

fn check(path: &Path, config: &ConfigArgs, as_json: bool) -> Result<()> {
    let graph = build(path, config.load()?)?;
    let summary = graph.summary();
    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
    }
    Ok(())
}

async fn run(args: RunArgs) -> Result<()> {
    let mut graph = build(&args.file, args.config.load()?)?;

    // Work started by constants during the build
    drive(&mut graph, args.realtime).await?;

    for input in &args.inputs {
        let value: Value = serde_json::from_str(input)
            .with_context(|| format!("input `{input}` is not a JSON literal"))?;
        graph.push(value)?;
        drive(&mut graph, args.realtime).await?;
    }

    info!(
        graph = %graph.id(),
        virtual_ms = graph.now().as_millis() as u64,
        "run finished"
    );
    graph.teardown();
    Ok(())
}

/// Run the graph until nothing is pending, printing as it goes.
async fn drive(graph: &mut Graph, realtime: bool) -> Result<()> {
    print_logs(graph);
    if !realtime {
        graph.settle()?;
        print_logs(graph);
        return Ok(());
    }
    loop {
        graph.run_until_idle()?;
        print_logs(graph);
        let Some(wait) = graph.time_to_next_timer() else {
            return Ok(());
        };
        tokio::time::sleep(wait).await;
        graph.advance_by(wait)?;
    }
}

/// One JSON line per root output and per rendered value.
fn print_logs(graph: &mut Graph) {
    for value in graph.take_outputs() {
        println!("{}", json!({ "output": value.to_json() }));
    }
    for value in graph.take_rendered() {
        println!("{}", json!({ "render": value.to_json() }));
    }
}
