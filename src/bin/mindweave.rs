//! Mindweave CLI: inspect and edit persisted concept graphs.
//!
//! Usage:
//!   mindweave validate <diff.json>
//!   mindweave apply --workspace <key> <diff.json> [--db path]
//!   mindweave show --workspace <key> [--db path]
//!   mindweave list [--db path]
//!   mindweave replay <transcript.txt> --response <diff.json> [--workspace key] [--config path]

use clap::{Parser, Subcommand};
use mindweave::snapshot::SnapshotStore;
use mindweave::transport::MockExtractor;
use mindweave::{
    engine_channel, hydrate, parse_diff, serialize, validate, DiffOp, EngineConfig, EngineDriver,
    ExtractorTransport, GraphState, GraphStore, MemorySnapshotStore, Role, SaveOutcome,
    SnapshotBridge, SqliteSnapshotStore, TranscriptTurn,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "mindweave",
    version,
    about = "Incremental concept-graph synchronization engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Log engine decisions to stderr (repeat for more detail)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a diff file's structure without applying it
    Validate {
        /// Diff JSON file
        path: PathBuf,
    },
    /// Apply a diff to a workspace's saved graph
    Apply {
        #[arg(long)]
        workspace: String,
        /// Diff JSON file
        path: PathBuf,
    },
    /// Print a workspace's saved graph
    Show {
        #[arg(long)]
        workspace: String,
    },
    /// List workspaces with a saved graph
    List,
    /// Run a transcript through the engine with a scripted extractor
    Replay {
        /// Transcript file, one `role: text` turn per line
        transcript: PathBuf,
        /// Diff JSON the extractor answers with
        #[arg(long)]
        response: PathBuf,
        /// Persist the result under this workspace
        #[arg(long)]
        workspace: Option<String>,
        /// Engine configuration (YAML)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Get the default database path (~/.local/share/mindweave/mindweave.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("mindweave").join("mindweave.db")
}

fn open_store(db: Option<PathBuf>) -> Result<SqliteSnapshotStore, String> {
    let db_path = db.unwrap_or_else(default_db_path);
    SqliteSnapshotStore::open(&db_path).map_err(|e| format!("Failed to open database: {}", e))
}

fn with_store(db: Option<PathBuf>, f: impl FnOnce(&SqliteSnapshotStore) -> i32) -> i32 {
    match open_store(db) {
        Ok(store) => f(&store),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn read_json(path: &Path) -> Result<serde_json::Value, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("'{}' is not JSON: {}", path.display(), e))
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn print_graph(state: &GraphState) {
    println!("{} nodes, {} edges", state.node_count(), state.edge_count());
    for node in state.nodes() {
        let display = state.display_salience(&node.label).unwrap_or_default();
        match &node.summary {
            Some(summary) => println!("  [{:>2}] {} - {}", display, node.label, summary),
            None => println!("  [{:>2}] {}", display, node.label),
        }
    }
    for edge in state.edges() {
        println!("  {}", edge.key());
    }
}

fn cmd_validate(path: &Path) -> i32 {
    let value = match read_json(path) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if !validate(&value) {
        eprintln!("Invalid diff: {}", path.display());
        return 1;
    }
    match parse_diff(&value) {
        Ok(diff) => {
            let skippable = diff
                .ops
                .iter()
                .filter(|op| matches!(op, DiffOp::Unrecognized { .. } | DiffOp::Malformed { .. }))
                .count();
            println!("Valid diff: {} ops ({} will be skipped)", diff.len(), skippable);
            0
        }
        Err(e) => {
            eprintln!("Invalid diff: {}", e);
            1
        }
    }
}

fn cmd_apply(store: &SqliteSnapshotStore, workspace: &str, path: &Path) -> i32 {
    let diff = match read_json(path).and_then(|v| parse_diff(&v).map_err(|e| e.to_string())) {
        Ok(diff) => diff,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let state = match store.load(workspace) {
        Ok(snapshot) => snapshot.as_ref().map(hydrate).unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let mut graph = GraphStore::with_state(state);
    let report = graph.apply_diff(&diff);
    for skipped in &report.skipped {
        eprintln!("Warning: skipped op {}: {}", skipped.index, skipped.reason);
    }

    match store.save(workspace, &serialize(graph.state(), workspace)) {
        Ok(receipt) => {
            println!(
                "Applied {} of {} ops to '{}' (etag {}, {} bytes)",
                report.applied(),
                diff.len(),
                workspace,
                receipt.etag,
                receipt.size
            );
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_show(store: &SqliteSnapshotStore, workspace: &str) -> i32 {
    match store.load(workspace) {
        Ok(Some(snapshot)) => {
            println!("Workspace '{}' (updated {})", workspace, snapshot.updated_at);
            print_graph(&hydrate(&snapshot));
            0
        }
        Ok(None) => {
            eprintln!("Error: no graph saved for workspace '{}'", workspace);
            1
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_list(store: &SqliteSnapshotStore) -> i32 {
    match store.list() {
        Ok(keys) if keys.is_empty() => {
            println!("No saved workspaces");
            0
        }
        Ok(keys) => {
            for key in keys {
                println!("{}", key);
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn parse_turn(index: usize, line: &str) -> Option<TranscriptTurn> {
    let (role, text) = line.split_once(':')?;
    let role = match role.trim().to_ascii_lowercase().as_str() {
        "user" => Role::User,
        "assistant" => Role::Assistant,
        _ => return None,
    };
    Some(TranscriptTurn::message(
        format!("line-{}", index + 1),
        role,
        text.trim(),
    ))
}

async fn cmd_replay(
    db: Option<PathBuf>,
    transcript: &Path,
    response: &Path,
    workspace: Option<String>,
    config: Option<PathBuf>,
) -> i32 {
    let config = match config.map(EngineConfig::load).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let (lines, answer) = match (
        std::fs::read_to_string(transcript),
        std::fs::read_to_string(response),
    ) {
        (Ok(lines), Ok(answer)) => (lines, answer),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let store: Arc<dyn SnapshotStore> = match &workspace {
        Some(_) => match open_store(db) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        },
        None => Arc::new(MemorySnapshotStore::new()),
    };

    let settle = config.debounce() + Duration::from_millis(200);
    let (handle, inbox) = engine_channel();
    let transport = ExtractorTransport::new(Arc::new(MockExtractor::new().respond(answer)), handle.clone());
    let driver = EngineDriver::new(
        config,
        Arc::new(transport),
        Arc::new(SnapshotBridge::new(store)),
        inbox,
    );
    let task = tokio::spawn(driver.run());

    handle.connected(true);
    handle.activate(workspace.clone());
    for (index, line) in lines.lines().enumerate() {
        match parse_turn(index, line) {
            Some(turn) => handle.turn_finalized(turn),
            None if line.trim().is_empty() => {}
            None => eprintln!("Warning: skipping line {}: expected `role: text`", index + 1),
        }
    }
    tokio::time::sleep(settle).await;

    let code = match handle.inspect().await {
        Some(state) => {
            print_graph(&state);
            0
        }
        None => {
            eprintln!("Error: engine stopped unexpectedly");
            1
        }
    };
    if workspace.is_some() {
        match handle.save_and_wait().await {
            Some(SaveOutcome::Saved(receipt)) => println!("Saved (etag {})", receipt.etag),
            Some(other) => eprintln!("Warning: not saved: {:?}", other),
            None => eprintln!("Warning: not saved"),
        }
    }

    handle.shutdown();
    let _ = task.await;
    code
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match cli.command {
        Commands::Validate { path } => cmd_validate(&path),
        Commands::Replay {
            transcript,
            response,
            workspace,
            config,
        } => cmd_replay(cli.db, &transcript, &response, workspace, config).await,
        Commands::Apply { workspace, path } => {
            with_store(cli.db, |store| cmd_apply(store, &workspace, &path))
        }
        Commands::Show { workspace } => with_store(cli.db, |store| cmd_show(store, &workspace)),
        Commands::List => with_store(cli.db, cmd_list),
    };
    std::process::exit(code);
}
