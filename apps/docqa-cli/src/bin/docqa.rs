use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use docqa_answer::{AnswerOptions, Answerer};
use docqa_core::config::{resolve_with_base, Config};
use docqa_core::{Error, ErrorKind};
use docqa_embed::{get_default_embedder, get_default_generator};

/// Answer a question from a local collection of .txt and .md documents.
#[derive(Parser, Debug)]
#[command(name = "docqa", version)]
struct Cli {
    /// Question to answer.
    #[arg(short, long)]
    question: String,

    /// Directory of documents (default: data.docs_dir).
    #[arg(short, long)]
    docs: Option<PathBuf>,

    /// Directory holding the persisted index (default: data.index_dir).
    #[arg(short, long)]
    index: Option<PathBuf>,

    /// Number of chunks to retrieve.
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Config file; relative data paths in it resolve against its directory.
    #[arg(short, long, env = "DOCQA_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence).
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    finish(run(cli).await)
}

/// Print the answer to stdout, or the error report to stderr.
fn finish(result: anyhow::Result<String>) -> ExitCode {
    match result {
        Ok(answer) => {
            println!("{answer}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", report(&err));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(cli: Cli) -> anyhow::Result<String> {
    let (config, base) = match &cli.config {
        Some(path) => {
            if !path.is_file() {
                return Err(Error::InvalidConfig(format!("config file '{}' not found", path.display())).into());
            }
            let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
            (Config::load_from(path)?, Some(base))
        }
        None => (Config::load()?, None),
    };
    let mut settings = config.settings()?;
    if let Some(k) = cli.top_k {
        settings.retrieval.top_k = k;
    }

    let resolve = |configured: &str| match &base {
        Some(base) => resolve_with_base(base, configured),
        None => docqa_core::config::expand_path(configured),
    };
    let docs = cli.docs.clone().unwrap_or_else(|| resolve(&settings.data.docs_dir));
    let index = cli.index.clone().unwrap_or_else(|| resolve(&settings.data.index_dir));
    debug!(docs = %docs.display(), index = %index.display(), top_k = settings.retrieval.top_k, "resolved paths");

    let embed = get_default_embedder(&settings).context("creating embedder")?;
    let generate = get_default_generator(&settings).context("creating generator")?;
    let mut options = AnswerOptions::from_settings(&settings)?;
    options.index_path = index;
    options.build.show_progress = true;

    let answer = Answerer::new(embed, generate, options).ask(&cli.question, &docs).await?;
    for (rank, hit) in answer.sources.iter().enumerate() {
        debug!(rank = rank + 1, score = hit.score, source = %hit.chunk.source, offset = hit.chunk.offset, "source");
    }
    Ok(answer.text)
}

/// Kind of the first typed error in the chain; untyped errors come from config loading.
fn error_kind(err: &anyhow::Error) -> ErrorKind {
    err.chain().find_map(|e| e.downcast_ref::<Error>()).map_or(ErrorKind::InvalidConfig, Error::kind)
}

fn report(err: &anyhow::Error) -> String {
    let kind = error_kind(err);
    format!("error [{kind}]: {err:#}\nhint: {}", hint(kind))
}

fn hint(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::NoDocumentsFound | ErrorKind::NoContent => "check --docs: it must contain readable .txt or .md files",
        ErrorKind::CorruptIndex | ErrorKind::DimensionMismatch => "delete the index directory (--index) and run again to rebuild it",
        ErrorKind::Auth => "check provider.api_key or OPENAI_API_KEY",
        ErrorKind::Quota => "the provider account has no remaining quota",
        ErrorKind::Transient => "the provider is unavailable or rate limited; try again later",
        ErrorKind::InvalidConfig => "check config.toml and APP_* environment variables",
        _ => "please check your documents, API key, and configuration",
    }
}
