//! LLM integration
//!
//! Single-turn generate calls against the provider, with response-shape
//! expectations layered on top of an unstructured text API. The provider
//! routinely wraps JSON in chatter; `parse_analysis` recovers the embedded
//! object and, failing that, synthesizes a generic fallback so the user
//! never sees a raw parse error.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::models::RepositoryRecord;

/// Errors from the LLM provider.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("AI features are not configured on this server")]
    NotConfigured,

    #[error("AI provider request failed: {0}")]
    Upstream(String),

    #[error("AI provider returned an unusable response: {0}")]
    Decode(String),

    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Structured code analysis delivered to the user. Every field is
/// defaulted so partially-valid provider output still produces a result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeAnalysis {
    pub summary: String,
    pub strengths: Vec<String>,
    pub suggestions: Vec<String>,
}

impl CodeAnalysis {
    /// Synthesized result when the provider output is beyond repair.
    fn fallback() -> Self {
        Self {
            summary: "Automatic analysis could not be generated for this repository. \
                      The structure was crawled successfully; try the AI analysis again later."
                .to_string(),
            strengths: Vec::new(),
            suggestions: Vec::new(),
        }
    }
}

/// Client for the provider's generate-content endpoint.
#[derive(Debug, Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_url: &str, api_key: &str, timeout: Duration) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Client(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// One generate call: prompt in, free text out.
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(format!("{}?key={}", self.api_url, self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Upstream(format!("provider returned {status}")));
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;

        value
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .ok_or_else(|| LlmError::Decode("no text candidate in response".to_string()))
    }

    /// JSON-structured code analysis for a saved record. Malformed output
    /// is repaired locally; this never fails on provider chatter.
    pub async fn analyze_record(&self, record: &RepositoryRecord) -> Result<CodeAnalysis, LlmError> {
        let prompt = analysis_prompt(record);
        let raw = self.generate(&prompt).await?;
        Ok(parse_analysis(&raw))
    }

    /// Free-text chat about a repository, optional tree context folded in.
    pub async fn chat(&self, message: &str, context: Option<&str>) -> Result<String, LlmError> {
        let prompt = match context {
            Some(ctx) => format!(
                "You are helping a user explore a GitHub repository.\n\
                 Repository context:\n{ctx}\n\nUser question: {message}"
            ),
            None => message.to_string(),
        };
        self.generate(&prompt).await
    }
}

/// Compose the analysis prompt from the record's tree and statistics.
fn analysis_prompt(record: &RepositoryRecord) -> String {
    let stats = &record.stats;
    let top_level = record
        .tree
        .children
        .iter()
        .flatten()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Analyze the repository {owner}/{repo}.\n\
         Primary language: {language}. {files} files and {folders} folders analyzed.\n\
         Top-level entries: {top_level}.\n\
         Respond with ONLY a JSON object of the form \
         {{\"summary\": string, \"strengths\": [string], \"suggestions\": [string]}}.",
        owner = record.owner,
        repo = record.repo,
        language = stats.language.as_deref().unwrap_or("unknown"),
        files = stats.analyzed_files,
        folders = stats.analyzed_folders,
    )
}

/// Parse provider output into a `CodeAnalysis`.
///
/// Tries the text as-is, then the first balanced JSON object embedded in
/// it, then falls back to a synthesized generic result.
pub fn parse_analysis(raw: &str) -> CodeAnalysis {
    if let Ok(parsed) = serde_json::from_str::<CodeAnalysis>(raw.trim()) {
        return parsed;
    }

    if let Some(candidate) = extract_json_object(raw) {
        if let Ok(parsed) = serde_json::from_str::<CodeAnalysis>(candidate) {
            return parsed;
        }
    }

    warn!("provider returned unparseable analysis; using fallback");
    CodeAnalysis::fallback()
}

/// Locate the first balanced `{ ... }` substring, respecting strings and
/// escapes, so JSON survives surrounding chatter.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
