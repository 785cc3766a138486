//! PDF documents.

use super::{file_title, has_extension, DocumentSource, SourceType};
use crate::error::{PodgenError, Result};
use crate::script::ContextDocument;
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, instrument};

/// Text layer of a local PDF file.
pub struct PdfSource;

impl PdfSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentSource for PdfSource {
    fn source_type(&self) -> SourceType {
        SourceType::Pdf
    }

    fn can_handle(&self, input: &str) -> bool {
        has_extension(input, &["pdf"])
    }

    #[instrument(skip(self))]
    async fn extract(&self, input: &str) -> Result<ContextDocument> {
        let path = Path::new(input);
        if !path.exists() {
            return Err(PodgenError::Extraction(format!("File not found: {}", input)));
        }

        let bytes = tokio::fs::read(path).await?;
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| PodgenError::Extraction(format!("PDF parser failed on {}: {}", input, e)))?
            .map_err(|e| PodgenError::Extraction(format!("Unreadable PDF {}: {}", input, e)))?;

        let text = text.trim();
        if text.is_empty() {
            return Err(PodgenError::Extraction(format!("No text layer in {}", input)));
        }
        debug!("Extracted {} chars from {}", text.len(), input);

        Ok(ContextDocument::new(file_title(path, input), text, input))
    }
}
