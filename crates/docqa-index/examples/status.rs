use std::path::PathBuf;

use docqa_core::config::Config;
use docqa_embed::get_default_embedder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Config::load()?.settings()?;
    let dir = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| settings.index_dir());
    let embed = get_default_embedder(&settings)?;
    let index = docqa_index::load(&dir, embed.as_ref())?;
    println!("index: {}", dir.display());
    println!("entries={} dimension={} embedder={} created_at={}", index.len(), index.dimension(), index.embedder_id(), index.created_at());
    let mut sources: Vec<&str> = index.entries().iter().map(|e| e.chunk.source.as_str()).collect();
    sources.dedup();
    println!("sources={}", sources.len());
    Ok(())
}
