//! Word (.docx) documents.

use super::{file_title, has_extension, DocumentSource, SourceType};
use crate::error::{PodgenError, Result};
use crate::script::ContextDocument;
use async_trait::async_trait;
use docx_rs::{
    DocumentChild, Docx, Paragraph, ParagraphChild, RunChild, TableCellContent, TableChild,
    TableRowChild,
};
use std::path::Path;
use tracing::{debug, instrument};

/// Text of a local .docx file.
pub struct WordSource;

impl WordSource {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WordSource {
    fn default() -> Self {
        Self::new()
    }
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &run.children {
                if let RunChild::Text(t) = run_child {
                    text.push_str(&t.text);
                }
            }
        }
    }
    text.trim().to_string()
}

/// Body paragraphs first, then one line per table row, space separated.
#[allow(irrefutable_let_patterns)]
fn docx_text(docx: &Docx) -> String {
    let mut paragraphs = Vec::new();
    let mut rows = Vec::new();

    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => {
                let text = paragraph_text(p);
                if !text.is_empty() {
                    paragraphs.push(text);
                }
            }
            DocumentChild::Table(table) => {
                for row in &table.rows {
                    let mut cells = Vec::new();
                    if let TableChild::TableRow(row) = row {
                        for cell in &row.cells {
                            if let TableRowChild::TableCell(cell) = cell {
                                for content in &cell.children {
                                    if let TableCellContent::Paragraph(p) = content {
                                        let text = paragraph_text(p);
                                        if !text.is_empty() {
                                            cells.push(text);
                                        }
                                    }
                                }
                            }
                        }
                    }
                    if !cells.is_empty() {
                        rows.push(cells.join(" "));
                    }
                }
            }
            _ => {}
        }
    }

    paragraphs.extend(rows);
    paragraphs.join(" ")
}

#[async_trait]
impl DocumentSource for WordSource {
    fn source_type(&self) -> SourceType {
        SourceType::Word
    }

    fn can_handle(&self, input: &str) -> bool {
        has_extension(input, &["docx"])
    }

    #[instrument(skip(self))]
    async fn extract(&self, input: &str) -> Result<ContextDocument> {
        let path = Path::new(input);
        if !path.exists() {
            return Err(PodgenError::Extraction(format!("File not found: {}", input)));
        }

        let bytes = tokio::fs::read(path).await?;
        let docx = docx_rs::read_docx(&bytes)
            .map_err(|e| PodgenError::Extraction(format!("Unreadable Word document {}: {}", input, e)))?;

        let text = docx_text(&docx);
        if text.is_empty() {
            return Err(PodgenError::Extraction(format!("No text in {}", input)));
        }
        debug!("Extracted {} chars from {}", text.len(), input);

        Ok(ContextDocument::new(file_title(path, input), text, input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Run, Table, TableCell, TableRow};

    fn para(text: &str) -> Paragraph {
        Paragraph::new().add_run(Run::new().add_text(text))
    }

    #[test]
    fn test_paragraphs_then_table_rows() {
        let docx = Docx::new()
            .add_paragraph(para("Tides rise twice a day."))
            .add_paragraph(para("   "))
            .add_table(Table::new(vec![TableRow::new(vec![
                TableCell::new().add_paragraph(para("Spring")),
                TableCell::new().add_paragraph(para("Strong")),
            ])]))
            .add_paragraph(para("The moon drives them."));

        assert_eq!(
            docx_text(&docx),
            "Tides rise twice a day. The moon drives them. Spring Strong"
        );
    }

    #[test]
    fn test_runs_are_concatenated() {
        let paragraph = Paragraph::new()
            .add_run(Run::new().add_text("High "))
            .add_run(Run::new().add_text("water"));
        assert_eq!(paragraph_text(&paragraph), "High water");
    }

    #[tokio::test]
    async fn test_invalid_docx_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.docx");
        std::fs::write(&path, "plain text, not a zip").unwrap();

        let result = WordSource::new().extract(&path.to_string_lossy()).await;
        assert!(matches!(result, Err(PodgenError::Extraction(_))));
    }
}
