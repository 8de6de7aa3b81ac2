//! Structured extractor capability and its LLM-backed implementation
//!
//! The extractor turns raw product blocks into flat field/value mappings.
//! The production implementation sends the blocks to an OpenAI-compatible
//! chat completions endpoint and keeps a running tally of token usage.

use crate::config::ExtractorConfig;
use crate::output::print_usage;
use crate::record::{RawRecord, RecordSchema};
use crate::{HarvestError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Mutex;
use std::time::Duration;

/// Accumulated usage of an extractor over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub requests: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    fn add(&mut self, other: &ApiUsage) {
        self.requests += 1;
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Turns raw page content into field mappings
#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    /// Extracts zero or more mappings from `raw_blocks`
    ///
    /// Completeness is not checked here; callers filter against `schema`.
    async fn extract(&self, raw_blocks: &str, schema: &RecordSchema) -> Result<Vec<RawRecord>>;

    /// Usage accumulated so far
    fn usage(&self) -> Usage;

    /// Prints the accumulated usage
    fn report_usage(&self) {
        print_usage(&self.usage());
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

/// Extractor backed by an OpenAI-compatible chat completions API
pub struct LlmExtractor {
    client: Client,
    config: ExtractorConfig,
    api_key: String,
    usage: Mutex<Usage>,
}

impl LlmExtractor {
    /// Builds an extractor, reading the API key from `config.api_key_env`
    pub fn from_config(config: &ExtractorConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| HarvestError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config.clone(), api_key)
    }

    pub fn new(config: ExtractorConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            client,
            config,
            api_key: api_key.into(),
            usage: Mutex::new(Usage::default()),
        })
    }

    fn system_prompt(&self, schema: &RecordSchema) -> String {
        format!(
            "{}\n\nEach object must have exactly these keys: {}.",
            self.config.instruction,
            schema.fields().join(", ")
        )
    }

    /// Sends one chunk and returns the assistant's reply
    async fn complete(&self, system: &str, chunk: &str) -> Result<String> {
        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": chunk },
            ],
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(HarvestError::Extraction(format!(
                "{} returned HTTP {}: {}",
                self.config.endpoint,
                status.as_u16(),
                detail.trim()
            )));
        }

        let reply: ChatResponse = response.json().await?;

        if let Ok(mut usage) = self.usage.lock() {
            usage.add(&reply.usage.unwrap_or_default());
        }

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| HarvestError::Extraction("response contained no message".to_string()))
    }
}

#[async_trait]
impl StructuredExtractor for LlmExtractor {
    async fn extract(&self, raw_blocks: &str, schema: &RecordSchema) -> Result<Vec<RawRecord>> {
        let system = self.system_prompt(schema);
        let mut records = Vec::new();

        for (index, chunk) in chunk_content(raw_blocks, self.config.chunk_size)
            .into_iter()
            .enumerate()
        {
            let reply = self.complete(&system, chunk).await?;
            let parsed = parse_records(&reply)?;
            tracing::debug!("Chunk {} yielded {} raw records", index, parsed.len());
            records.extend(parsed);
        }

        Ok(records)
    }

    fn usage(&self) -> Usage {
        self.usage.lock().map(|u| *u).unwrap_or_default()
    }
}

/// Splits `content` into pieces of at most `max_len` bytes
///
/// Cuts fall on the last whitespace before the limit when there is one, so
/// tags and words are rarely split. Whitespace at the cut is dropped.
pub fn chunk_content(content: &str, max_len: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut remaining = content.trim();
    let max_len = max_len.max(1);

    while remaining.len() > max_len {
        let mut end = max_len;
        while !remaining.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            end = remaining
                .char_indices()
                .nth(1)
                .map_or(remaining.len(), |(i, _)| i);
        }

        let cut = if remaining[end..].starts_with(char::is_whitespace) {
            end
        } else {
            match remaining[..end].rfind(char::is_whitespace) {
                Some(i) if i > 0 => i,
                _ => end,
            }
        };

        chunks.push(remaining[..cut].trim_end());
        remaining = remaining[cut..].trim_start();
    }

    if !remaining.is_empty() {
        chunks.push(remaining);
    }

    chunks
}

/// Parses a model reply into raw records
///
/// Accepts a JSON array of objects, an object wrapping such an array, or a
/// single object. Markdown code fences around the JSON are ignored.
pub fn parse_records(reply: &str) -> Result<Vec<RawRecord>> {
    let value: Value = serde_json::from_str(strip_code_fence(reply))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => {
            let nested = map.values().find(|v| v.is_array()).cloned();
            match nested {
                Some(Value::Array(items)) => items,
                _ => vec![Value::Object(map)],
            }
        }
        other => {
            return Err(HarvestError::Extraction(format!(
                "expected a JSON array or object, got {}",
                other
            )))
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(to_raw_record(map)),
            other => {
                tracing::debug!("Skipping non-object extraction item: {}", other);
                None
            }
        })
        .collect())
}

fn to_raw_record(map: Map<String, Value>) -> RawRecord {
    map.into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key, text)
        })
        .collect()
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
