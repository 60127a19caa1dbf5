//! docqa-answer
//!
//! The question-answering pipeline. [`Answerer::ask`] walks a fixed sequence
//! of stages:
//!
//! `LoadingDocs -> Chunking -> IndexReady -> Retrieving -> Prompting -> Complete`
//!
//! Any error moves the run to `Failed` and is returned to the caller exactly as
//! the failing stage produced it.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

use docqa_core::chunker::{split_with, ChunkingConfig};
use docqa_core::config::Settings;
use docqa_core::loader::load_documents;
use docqa_core::{EmbeddingCapability, Error, GenerationCapability, QueryResult, Result, ScoredChunk, DEFAULT_TOP_K};
use docqa_index::{get_or_build, query, BuildOptions};

const PROMPT_PREAMBLE: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    LoadingDocs,
    Chunking,
    IndexReady,
    Retrieving,
    Prompting,
    Complete,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::LoadingDocs => "LOADING_DOCS",
            Stage::Chunking => "CHUNKING",
            Stage::IndexReady => "INDEX_READY",
            Stage::Retrieving => "RETRIEVING",
            Stage::Prompting => "PROMPTING",
            Stage::Complete => "COMPLETE",
            Stage::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct AnswerOptions {
    pub index_path: PathBuf,
    pub chunking: ChunkingConfig,
    pub top_k: usize,
    pub build: BuildOptions,
}

impl AnswerOptions {
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            chunking: ChunkingConfig::default(),
            top_k: DEFAULT_TOP_K,
            build: BuildOptions::default(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            index_path: settings.index_dir(),
            chunking: ChunkingConfig::new(settings.chunking.chunk_size, settings.chunking.chunk_overlap)?,
            top_k: settings.retrieval.top_k,
            build: BuildOptions {
                batch_size: settings.embedding.batch_size,
                concurrency: settings.embedding.concurrency,
                show_progress: false,
            },
        })
    }
}

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// Generator output, unmodified.
    pub text: String,
    pub prompt: String,
    pub sources: QueryResult,
    pub trace: Vec<Stage>,
}

pub struct Answerer {
    embed: Arc<dyn EmbeddingCapability>,
    generate: Arc<dyn GenerationCapability>,
    options: AnswerOptions,
}

impl Answerer {
    pub fn new(embed: Arc<dyn EmbeddingCapability>, generate: Arc<dyn GenerationCapability>, options: AnswerOptions) -> Self {
        Self { embed, generate, options }
    }

    pub fn options(&self) -> &AnswerOptions { &self.options }

    pub async fn answer(&self, question: &str, docs_path: &Path) -> Result<String> {
        Ok(self.ask(question, docs_path).await?.text)
    }

    pub async fn ask(&self, question: &str, docs_path: &Path) -> Result<Answer> {
        self.ask_traced(question, docs_path).await.0
    }

    /// Like [`ask`](Self::ask), but also returns the stages visited. On
    /// failure the trace ends with the failing stage followed by `Failed`.
    pub async fn ask_traced(&self, question: &str, docs_path: &Path) -> (Result<Answer>, Vec<Stage>) {
        let mut run = Run::default();
        match self.run(question, docs_path, &mut run).await {
            Ok(answer) => (Ok(answer), run.trace),
            Err(e) => {
                let failed_at = run.current();
                run.enter(Stage::Failed);
                error!(stage = %failed_at, kind = %e.kind(), "answer failed: {e}");
                (Err(e), run.trace)
            }
        }
    }

    async fn run(&self, question: &str, docs_path: &Path, run: &mut Run) -> Result<Answer> {
        run.enter(Stage::LoadingDocs);
        let documents = load_documents(docs_path)?;

        run.enter(Stage::Chunking);
        let chunks = split_with(&documents, &self.options.chunking);
        if chunks.is_empty() {
            return Err(Error::NoContent(format!(
                "{} document(s) under {} contain no text",
                documents.len(),
                docs_path.display()
            )));
        }

        run.enter(Stage::IndexReady);
        let index = get_or_build(&self.options.index_path, &chunks, self.embed.as_ref(), &self.options.build).await?;

        run.enter(Stage::Retrieving);
        let question_vec = self.embed.embed(question).await?;
        let sources = query(&index, &question_vec, self.options.top_k)?;

        run.enter(Stage::Prompting);
        let prompt = build_prompt(question, &sources);
        debug!(prompt_chars = prompt.chars().count(), "sending prompt to {}", self.generate.model_id());
        let text = self.generate.generate(&prompt).await?;

        run.enter(Stage::Complete);
        Ok(Answer { text, prompt, sources, trace: run.trace.clone() })
    }
}

/// One-shot form of [`Answerer::answer`].
pub async fn answer(
    question: &str,
    docs_path: &Path,
    embed: Arc<dyn EmbeddingCapability>,
    generate: Arc<dyn GenerationCapability>,
    options: AnswerOptions,
) -> Result<String> {
    Answerer::new(embed, generate, options).answer(question, docs_path).await
}

/// "Stuff" prompt: every retrieved chunk, best first, then the question.
pub fn build_prompt(question: &str, hits: &[ScoredChunk]) -> String {
    let context = hits.iter().map(|h| h.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n");
    format!("{PROMPT_PREAMBLE}\n\n{context}\n\nQuestion: {question}\nHelpful Answer:")
}

#[derive(Default)]
struct Run {
    trace: Vec<Stage>,
}

impl Run {
    fn enter(&mut self, stage: Stage) {
        info!(stage = %stage, "answer stage");
        self.trace.push(stage);
    }

    fn current(&self) -> Stage {
        self.trace.last().copied().unwrap_or(Stage::LoadingDocs)
    }
}
