//! Source material extraction.
//!
//! Turns user-supplied inputs (web pages, PDF and Word documents, local text
//! files) into [`ContextDocument`]s for the context generation mode.

mod local;
mod pdf;
mod web;
mod word;

pub use local::TextFileSource;
pub use pdf::PdfSource;
pub use web::{html_to_text, html_title, WebPageSource};
pub use word::WordSource;

use crate::error::Result;
use crate::script::ContextDocument;
use async_trait::async_trait;
use std::path::Path;
use tracing::{info, warn};

/// Type of document source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    Web,
    Pdf,
    Word,
    TextFile,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Web => write!(f, "web"),
            SourceType::Pdf => write!(f, "pdf"),
            SourceType::Word => write!(f, "word"),
            SourceType::TextFile => write!(f, "file"),
        }
    }
}

/// Trait for document extractors.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Get the source type.
    fn source_type(&self) -> SourceType;

    /// Check if this source can handle the given input.
    fn can_handle(&self, input: &str) -> bool;

    /// Extract the text of `input`.
    async fn extract(&self, input: &str) -> Result<ContextDocument>;
}

/// Whether `input` ends in one of `extensions`, ignoring case.
pub(crate) fn has_extension(input: &str, extensions: &[&str]) -> bool {
    Path::new(input)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Document title for a local file: its stem, or the raw input.
pub(crate) fn file_title(path: &Path, input: &str) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(input)
        .to_string()
}

/// Detect the appropriate extractor for the given input.
///
/// URLs win over file extensions, so `https://host/paper.pdf` is fetched as a
/// web page.
pub fn detect_source(input: &str, http: &reqwest::Client) -> Option<Box<dyn DocumentSource>> {
    let candidates: [Box<dyn DocumentSource>; 4] = [
        Box::new(WebPageSource::new(http.clone())),
        Box::new(PdfSource::new()),
        Box::new(WordSource::new()),
        Box::new(TextFileSource::new()),
    ];

    candidates.into_iter().find(|source| source.can_handle(input))
}

/// Extract every source, skipping the ones that fail.
///
/// Unsupported or unreadable sources are logged and left out; the caller
/// decides whether an empty result is acceptable.
pub async fn extract_content_from_sources(
    sources: &[String],
    http: &reqwest::Client,
) -> Vec<ContextDocument> {
    let mut documents = Vec::with_capacity(sources.len());

    for source in sources {
        let Some(extractor) = detect_source(source, http) else {
            warn!("No extractor for source {}, skipping", source);
            continue;
        };

        info!("Extracting {} source {}", extractor.source_type(), source);
        match extractor.extract(source).await {
            Ok(doc) => documents.push(doc),
            Err(e) => warn!("Failed to extract {}: {}", source, e),
        }
    }

    documents
}
