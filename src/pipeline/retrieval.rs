//! In-memory retrieval over research material.

use crate::embedding::{cosine_similarity, Embedder};
use crate::error::Result;
use crate::script::ContextDocument;
use std::sync::Arc;
use tracing::{debug, info};

/// Target chunk length in characters.
pub const CHUNK_SIZE: usize = 1000;
/// Characters shared between consecutive chunks.
pub const CHUNK_OVERLAP: usize = 200;
/// Chunks returned per query.
pub const TOP_K: usize = 4;

/// Split `text` into overlapping chunks of at most `chunk_size` characters.
///
/// Chunks end on whitespace when possible, and each chunk after the first
/// starts roughly `overlap` characters before the previous one ended.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let chunk_size = chunk_size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let mut end = (start + chunk_size).min(chars.len());

        if end < chars.len() {
            if let Some(ws) = chars[start..end].iter().rposition(|c| c.is_whitespace()) {
                if ws > 0 {
                    end = start + ws;
                }
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        if end >= chars.len() {
            break;
        }

        // Step back for the overlap, then forward to a word boundary
        let mut next = end.saturating_sub(overlap).max(start + 1);
        while next < end && !chars[next - 1].is_whitespace() {
            next += 1;
        }
        start = next;
    }

    chunks
}

/// Embedded chunks of a set of documents.
pub struct RetrievalIndex {
    embedder: Arc<dyn Embedder>,
    chunks: Vec<(String, Vec<f32>)>,
}

impl RetrievalIndex {
    /// Chunk and embed every document.
    pub async fn build(embedder: Arc<dyn Embedder>, documents: &[ContextDocument]) -> Result<Self> {
        let texts: Vec<String> = documents
            .iter()
            .flat_map(|doc| split_text(&doc.text, CHUNK_SIZE, CHUNK_OVERLAP))
            .collect();

        info!("Creating retrieval index over {} chunks", texts.len());
        let embeddings = embedder.embed_batch(&texts).await?;

        Ok(Self {
            embedder,
            chunks: texts.into_iter().zip(embeddings).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The `limit` chunks most similar to `query`, best first.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<&str>> {
        if self.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;

        let mut scored: Vec<(f32, &str)> = self
            .chunks
            .iter()
            .map(|(text, embedding)| (cosine_similarity(&query_embedding, embedding), text.as_str()))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        debug!("Retrieved {} chunks for query", scored.len());
        Ok(scored.into_iter().map(|(_, text)| text).collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Embeds text by counting a few marker words.
    pub(crate) struct KeywordEmbedder;

    const KEYWORDS: &[&str] = &["moon", "sun", "ocean", "wind"];

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let lower = text.to_lowercase();
            Ok(KEYWORDS
                .iter()
                .map(|k| lower.matches(k).count() as f32)
                .collect())
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }
    }

    #[test]
    fn test_split_short_text_is_single_chunk() {
        assert_eq!(split_text("  a short note  ", 1000, 200), vec!["a short note"]);
        assert!(split_text("", 1000, 200).is_empty());
    }

    #[test]
    fn test_split_respects_size_and_overlaps() {
        let text = (0..600).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let chunks = split_text(&text, 1000, 200);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 1000);
        }
        for pair in chunks.windows(2) {
            let first_word = pair[1].split_whitespace().next().unwrap();
            assert!(pair[0].split_whitespace().any(|w| w == first_word));
        }
        assert!(chunks.last().unwrap().ends_with("w599"));
    }

    #[test]
    fn test_split_without_whitespace_still_progresses() {
        let text = "x".repeat(2500);
        let chunks = split_text(&text, 1000, 200);
        assert_eq!(chunks[0].len(), 1000);
        assert!(chunks.iter().all(|c| c.len() <= 1000));
        assert!(chunks.len() >= 3);
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let docs = vec![
            ContextDocument::new("a", "The moon pulls the ocean twice a day.", "a"),
            ContextDocument::new("b", "Wind farms turn wind into power.", "b"),
            ContextDocument::new("c", "The sun rises in the east.", "c"),
        ];
        let index = RetrievalIndex::build(Arc::new(KeywordEmbedder), &docs).await.unwrap();
        assert_eq!(index.len(), 3);

        let hits = index.search("what does the wind do", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0], "Wind farms turn wind into power.");
    }
}
