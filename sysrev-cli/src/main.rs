//! sysrev CLI — runs the staged literature-review pipeline against a local
//! document corpus and prints the final report as markdown.

mod local;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use sysrev_core::persistence::{RunStore, SavedRun};
use sysrev_core::providers::{HeuristicAnalyzer, HeuristicFormulator, HeuristicScreener};
use sysrev_core::workflow::StepPayload;
use sysrev_core::{Advance, ReviewReport, ReviewWorkflow};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Staged literature review: question, keywords, search, screening.
#[derive(Parser, Debug)]
#[command(name = "sysrev", version, about, long_about = None)]
struct Cli {
    /// Research idea to review (omit when using a subcommand)
    idea: Option<String>,

    /// JSON file holding the document corpus to search
    #[arg(short, long)]
    corpus: Option<PathBuf>,

    /// Workspace directory (where .sysrev/config.toml is looked up)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Explicit configuration file, layered over workspace and user config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// List saved review runs, newest first
    Runs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));
    tracing_subscriber::registry().with(stderr_layer).init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| PathBuf::from("."));
    let config = sysrev_core::load_config(Some(&workspace), cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("configuration error: {e}"))?;

    let state_dir = config
        .workflow
        .state_dir
        .clone()
        .or_else(|| {
            directories::ProjectDirs::from("dev", "sysrev", "sysrev")
                .map(|dirs| dirs.data_dir().join("runs"))
        })
        .unwrap_or_else(|| workspace.join(".sysrev").join("runs"));

    if let Some(Commands::Runs) = cli.command {
        return list_runs(&state_dir);
    }

    let Some(idea) = cli.idea else {
        anyhow::bail!("provide a research idea, or use the `runs` subcommand");
    };
    let Some(corpus_path) = cli.corpus else {
        anyhow::bail!("--corpus <FILE> is required to run a review");
    };

    let provider = Arc::new(local::CorpusProvider::load(&corpus_path)?);
    let screener = Arc::new(HeuristicScreener::new(config.screening.batch_size));
    let mut workflow = ReviewWorkflow::new(
        config,
        Arc::new(HeuristicFormulator),
        Arc::new(HeuristicAnalyzer),
        provider,
        screener,
    );
    match local::JsonlSink::open(state_dir.join("audit.jsonl")) {
        Ok(sink) => {
            info!(path = %sink.path().display(), "Audit trail enabled");
            workflow = workflow.with_audit(Arc::new(sink));
        }
        Err(e) => warn!(error = %e, "Audit trail disabled"),
    }

    workflow.start(&idea).await?;
    loop {
        match workflow.advance().await? {
            Advance::Checkpoint(checkpoint) => {
                info!(step = %checkpoint.step(), "Stage complete");
            }
            Advance::Complete => break,
        }
    }

    let results = workflow.final_results()?;
    let question = workflow
        .history()
        .iter()
        .find_map(|cp| match &cp.payload {
            StepPayload::Question(q) => Some(q.main_question.clone()),
            _ => None,
        })
        .unwrap_or_else(|| idea.clone());
    let report = ReviewReport::new(question, &results);
    println!("{}", report.to_markdown());

    let run = SavedRun::new(&idea, workflow.phase(), workflow.history().to_vec());
    match RunStore::new(&state_dir).save(&run) {
        Ok(path) => info!(path = %path.display(), "Saved review run"),
        Err(e) => warn!(error = %e, "Could not save review run"),
    }
    Ok(())
}

fn list_runs(state_dir: &std::path::Path) -> anyhow::Result<()> {
    let summaries = RunStore::new(state_dir).list()?;
    if summaries.is_empty() {
        println!("No saved runs in {}", state_dir.display());
        return Ok(());
    }
    for summary in summaries {
        println!(
            "{}  {:<20}  {:>2} checkpoints  {}  ({})",
            summary.saved_at.format("%Y-%m-%d %H:%M"),
            summary.phase,
            summary.checkpoints,
            summary.research_idea,
            summary.id
        );
    }
    Ok(())
}
