use tracing::debug;

use docqa_core::{Error, QueryResult, Result, ScoredChunk};

use crate::Index;

/// Rank every entry of `index` by cosine similarity to `question` and return
/// the best `k`, highest first. Equal scores keep insertion order.
pub fn query(index: &Index, question: &[f32], k: usize) -> Result<QueryResult> {
    if index.is_empty() {
        return Err(Error::EmptyIndex);
    }
    if question.len() != index.dimension() {
        return Err(Error::DimensionMismatch { expected: index.dimension(), actual: question.len() });
    }
    if k == 0 {
        return Ok(Vec::new());
    }

    let mut scored: Vec<(usize, f32)> = index
        .entries()
        .iter()
        .enumerate()
        .map(|(pos, entry)| (pos, cosine_similarity(question, &entry.embedding)))
        .collect();
    // sort_by is stable
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(k);

    debug!(k, hits = scored.len(), top = scored.first().map(|s| s.1), "retrieved");
    Ok(scored
        .into_iter()
        .map(|(pos, score)| ScoredChunk { chunk: index.entries()[pos].chunk.clone(), score })
        .collect())
}

/// Cosine similarity in `[-1, 1]`; zero when either vector has no magnitude
/// or contains non-finite values.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut na, mut nb) = (0f64, 0f64, 0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    let sim = (dot / (na.sqrt() * nb.sqrt())) as f32;
    // NaN and -0.0 score as 0.0
    if sim.is_nan() || sim == 0.0 {
        return 0.0;
    }
    sim.clamp(-1.0, 1.0)
}
