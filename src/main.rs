use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;

use rpcflow::core::{create_event_channel, EngineConfig};
use rpcflow::dsl::parse_document;
use rpcflow::nodes::{MethodSpec, StaticMethodRegistry};
use rpcflow::WorkflowSession;

/// Run a workflow document against a JSON-RPC endpoint and print progress
/// events as JSON lines.
#[derive(Parser)]
#[command(name = "rpcflow", version, about = "Run an rpcflow workflow document")]
struct Args {
    /// Workflow document (JSON)
    workflow: PathBuf,
    /// Engine configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Method registry (JSON); every method is plain JSON-RPC without one
    #[arg(long)]
    registry: Option<PathBuf>,
}

fn read(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))
}

async fn run(args: Args) -> Result<bool, String> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json(&read(path)?).map_err(|e| e.to_string())?,
        None => EngineConfig::default(),
    };
    if let Ok(endpoint) = std::env::var("RPCFLOW_ENDPOINT") {
        config = config.with_rpc_endpoint(endpoint);
    }

    let document = read(&args.workflow)?;
    let (workflow, _) = parse_document(&document).map_err(|e| match e {
        rpcflow::WorkflowError::ValidationFailed(report) => report
            .diagnostics
            .iter()
            .map(|d| {
                format!(
                    "[{}] {}: {}",
                    d.code,
                    d.field_path.as_deref().unwrap_or("-"),
                    d.message
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    })?;

    // Without a registry file every method is treated as a plain JSON-RPC call.
    let registry = match &args.registry {
        Some(path) => StaticMethodRegistry::from_json(&read(path)?).map_err(|e| e.to_string())?,
        None => workflow.iter().fold(StaticMethodRegistry::new(), |reg, node| {
            reg.with(MethodSpec::jsonrpc(node.method.clone(), vec![]))
        }),
    };

    tracing::info!(nodes = workflow.len(), endpoint = %config.rpc_endpoint, "workflow loaded");

    let (tx, mut rx) = create_event_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Ok(line) = serde_json::to_string(&event) {
                println!("{}", line);
            }
        }
    });

    let session = WorkflowSession::builder(Arc::new(registry))
        .config(config)
        .workflow(workflow)
        .event_sender(tx)
        .build()
        .map_err(|e| e.to_string())?;

    let stopper = session.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stopper.stop();
        }
    });

    let result = session.run_all().await;
    ctrl_c.abort();
    let _ = ctrl_c.await;
    drop(session);
    let _ = printer.await;
    let outcome = result.map_err(|e| e.to_string())?;

    eprintln!("{}", outcome.message());
    Ok(outcome.success)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(msg) => {
            eprintln!("error: {}", msg);
            std::process::exit(2);
        }
    }
}
