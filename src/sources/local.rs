//! Local text and markdown files.

use super::{file_title, has_extension, DocumentSource, SourceType};
use crate::error::{PodgenError, Result};
use crate::script::ContextDocument;
use async_trait::async_trait;
use std::path::Path;

/// Supported text file extensions.
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown", "rst", "text"];

/// Plain-text file source.
pub struct TextFileSource;

impl TextFileSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextFileSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentSource for TextFileSource {
    fn source_type(&self) -> SourceType {
        SourceType::TextFile
    }

    fn can_handle(&self, input: &str) -> bool {
        has_extension(input, TEXT_EXTENSIONS)
    }

    async fn extract(&self, input: &str) -> Result<ContextDocument> {
        let path = Path::new(input);

        if !path.exists() {
            return Err(PodgenError::Extraction(format!("File not found: {}", input)));
        }

        let text = tokio::fs::read_to_string(path).await?;
        Ok(ContextDocument::new(file_title(path, input), text.trim(), input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_handle_by_extension() {
        let source = TextFileSource::new();
        assert!(source.can_handle("a.txt"));
        assert!(source.can_handle("README.MD"));
        assert!(!source.can_handle("a.pdf"));
        assert!(!source.can_handle("no_extension"));
    }

    #[tokio::test]
    async fn test_missing_file_is_extraction_error() {
        let result = TextFileSource::new().extract("/definitely/not/here.txt").await;
        assert!(matches!(result, Err(PodgenError::Extraction(_))));
    }
}
