//! Topic research: encyclopedia background and targeted web search.

use crate::error::{PodgenError, Result};
use crate::openai::require_api_key;
use crate::script::ContextDocument;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, instrument};
use url::Url;

/// Encyclopedia lookup: article title in, article text out.
#[async_trait]
pub trait Encyclopedia: Send + Sync {
    async fn article(&self, title: &str) -> Result<ContextDocument>;
}

/// Web search: query in, result URLs out.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<String>>;
}

/// Wikipedia via the MediaWiki action API, plain-text extracts.
pub struct Wikipedia {
    http: reqwest::Client,
    language: String,
}

impl Wikipedia {
    pub fn new(http: reqwest::Client, language: &str) -> Self {
        Self {
            http,
            language: language.to_string(),
        }
    }

    fn api_url(&self, title: &str) -> Result<Url> {
        Url::parse_with_params(
            &format!("https://{}.wikipedia.org/w/api.php", self.language),
            &[
                ("action", "query"),
                ("prop", "extracts"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("format", "json"),
                ("titles", title),
            ],
        )
        .map_err(|e| PodgenError::Research(format!("Invalid Wikipedia URL: {}", e)))
    }

    fn page_url(&self, title: &str) -> String {
        format!(
            "https://{}.wikipedia.org/wiki/{}",
            self.language,
            title.replace(' ', "_")
        )
    }
}

/// Pull the first page out of a MediaWiki `query` response.
fn parse_extract(body: &serde_json::Value, requested: &str) -> Result<(String, String)> {
    let page = body["query"]["pages"]
        .as_object()
        .and_then(|pages| pages.values().next())
        .ok_or_else(|| PodgenError::Research(format!("No page returned for {}", requested)))?;

    if page.get("missing").is_some() {
        return Err(PodgenError::Research(format!("Article not found: {}", requested)));
    }

    let title = page["title"].as_str().unwrap_or(requested).to_string();
    let text = page["extract"].as_str().unwrap_or_default().trim().to_string();

    if text.is_empty() {
        return Err(PodgenError::Research(format!("Article is empty: {}", requested)));
    }

    Ok((title, text))
}

#[async_trait]
impl Encyclopedia for Wikipedia {
    #[instrument(skip(self))]
    async fn article(&self, title: &str) -> Result<ContextDocument> {
        let response = self.http.get(self.api_url(title)?).send().await?;

        if !response.status().is_success() {
            return Err(PodgenError::Research(format!(
                "Wikipedia returned {} for {}",
                response.status(),
                title
            )));
        }

        let body: serde_json::Value = response.json().await?;
        let (title, text) = parse_extract(&body, title)?;
        let source = self.page_url(&title);

        debug!("Fetched {} chars for article {}", text.len(), title);
        Ok(ContextDocument::new(title, text, source))
    }
}

const TAVILY_URL: &str = "https://api.tavily.com/search";

#[derive(Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: u32,
    exclude_domains: &'a [String],
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    url: String,
}

/// Tavily search API. The key is read from `TAVILY_API_KEY` on first use.
pub struct TavilySearch {
    http: reqwest::Client,
    max_results: u32,
    exclude_domains: Vec<String>,
}

impl TavilySearch {
    pub fn new(http: reqwest::Client, max_results: u32, exclude_domains: Vec<String>) -> Self {
        Self {
            http,
            max_results,
            exclude_domains,
        }
    }
}

#[async_trait]
impl WebSearch for TavilySearch {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<String>> {
        let api_key = require_api_key("TAVILY_API_KEY")?;

        let response = self
            .http
            .post(TAVILY_URL)
            .bearer_auth(api_key)
            .json(&TavilyRequest {
                query,
                max_results: self.max_results,
                exclude_domains: &self.exclude_domains,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PodgenError::Research(format!(
                "Tavily returned {}: {}",
                status, body
            )));
        }

        let parsed: TavilyResponse = response.json().await?;
        Ok(parsed.results.into_iter().map(|r| r.url).collect())
    }
}

/// Merge search results into a de-duplicated URL list, dropping PDFs.
///
/// First-seen order is kept.
pub fn collect_urls(results: impl IntoIterator<Item = Vec<String>>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for url in results.into_iter().flatten() {
        if url.to_lowercase().ends_with(".pdf") {
            continue;
        }
        if seen.insert(url.clone()) {
            urls.push(url);
        }
    }

    info!("Collected {} unique URLs", urls.len());
    urls
}
