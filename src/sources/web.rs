//! Web page extraction.

use super::{DocumentSource, SourceType};
use crate::error::{PodgenError, Result};
use crate::script::ContextDocument;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;
use tracing::{debug, instrument};
use url::Url;

/// Elements whose content never reaches the extracted text.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "template", "noscript", "svg", "nav", "head", "footer", "iframe", "form",
];

/// Elements that start a new paragraph in the extracted text.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "header", "aside", "ul", "ol", "li", "dl", "dt", "dd",
    "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "table", "tr", "figure", "figcaption",
    "br", "hr",
];

static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").expect("Invalid selector"));
static ARTICLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("article").expect("Invalid selector"));
static MAIN: LazyLock<Selector> = LazyLock::new(|| Selector::parse("main").expect("Invalid selector"));
static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").expect("Invalid selector"));

/// Contents of the `<title>` element, if any.
pub fn html_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&TITLE)
        .next()
        .map(|title| collapse_whitespace(&title.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

/// Reduce an HTML page to readable text, one paragraph per block element.
///
/// The walk starts at the first `<article>`, else `<main>`, else `<body>`.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = document
        .select(&ARTICLE)
        .next()
        .or_else(|| document.select(&MAIN).next())
        .or_else(|| document.select(&BODY).next())
        .unwrap_or_else(|| document.root_element());

    let mut collector = TextCollector::default();
    collector.walk(root);
    collector.finish()
}

#[derive(Default)]
struct TextCollector {
    paragraphs: Vec<String>,
    current: String,
}

impl TextCollector {
    fn walk(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.current.push_str(text),
                Node::Element(el) => {
                    let name = el.name();
                    if SKIPPED_TAGS.contains(&name) {
                        continue;
                    }
                    let Some(child) = ElementRef::wrap(child) else {
                        continue;
                    };

                    let block = BLOCK_TAGS.contains(&name);
                    if block {
                        self.flush();
                    }
                    self.walk(child);
                    if block {
                        self.flush();
                    }
                }
                _ => {}
            }
        }
    }

    fn flush(&mut self) {
        let text = collapse_whitespace(&self.current);
        if !text.is_empty() {
            self.paragraphs.push(text);
        }
        self.current.clear();
    }

    fn finish(mut self) -> String {
        self.flush();
        self.paragraphs.join("\n\n")
    }
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Web page source.
pub struct WebPageSource {
    http: reqwest::Client,
}

impl WebPageSource {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl DocumentSource for WebPageSource {
    fn source_type(&self) -> SourceType {
        SourceType::Web
    }

    fn can_handle(&self, input: &str) -> bool {
        Url::parse(input)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false)
    }

    #[instrument(skip(self))]
    async fn extract(&self, input: &str) -> Result<ContextDocument> {
        let response = self.http.get(input).send().await?;

        if !response.status().is_success() {
            return Err(PodgenError::Extraction(format!(
                "{} returned {}",
                input,
                response.status()
            )));
        }

        let html = response.text().await?;
        let text = html_to_text(&html);
        if text.is_empty() {
            return Err(PodgenError::Extraction(format!("No text found at {}", input)));
        }

        let title = html_title(&html).unwrap_or_else(|| input.to_string());
        debug!("Extracted {} chars from {}", text.len(), input);

        Ok(ContextDocument::new(title, text, input))
    }
}
