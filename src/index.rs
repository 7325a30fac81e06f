use eyre::{Result, bail};
use log::debug;

use crate::chunk::{self, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::embed::Embedder;

pub const DEFAULT_TOP_K: usize = 3;

/// Knobs for building a [`Retriever`]
#[derive(Debug, Clone, Copy)]
pub struct IndexOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    text: String,
    embedding: Vec<f32>,
}

/// In-memory semantic index over one transcript
pub struct Retriever {
    entries: Vec<Entry>,
    embedder: Box<dyn Embedder>,
    top_k: usize,
}

impl Retriever {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Return up to `k` chunks, most similar to the query first.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<&str>> {
        let query_embedding = self
            .embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| eyre::eyre!("embedder returned no vector for the query"))?;

        let mut scored: Vec<(f32, &Entry)> = self
            .entries
            .iter()
            .map(|e| (cosine_similarity(&query_embedding, &e.embedding), e))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored.into_iter().map(|(_, e)| e.text.as_str()).collect())
    }
}

/// Chunk the transcript text, embed every chunk and keep the vectors in memory.
pub async fn build_index(text: &str, embedder: Box<dyn Embedder>, options: IndexOptions) -> Result<Retriever> {
    let chunks = chunk::split_text(text, options.chunk_size, options.chunk_overlap);
    if chunks.is_empty() {
        bail!("transcript is empty; nothing to index");
    }
    debug!("Indexing {} chunks", chunks.len());

    let embeddings = embedder.embed(&chunks).await?;
    if embeddings.len() != chunks.len() {
        bail!("got {} embeddings for {} chunks", embeddings.len(), chunks.len());
    }

    let entries = chunks
        .into_iter()
        .zip(embeddings)
        .map(|(text, embedding)| Entry { text, embedding })
        .collect();

    Ok(Retriever {
        entries,
        embedder,
        top_k: options.top_k.max(1),
    })
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
