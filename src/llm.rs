use async_trait::async_trait;
use eyre::{Result, bail};
use log::debug;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

const TEMPERATURE: f64 = 0.3;

/// Produces text from a rendered prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Provider {
    Anthropic,
    Gemini,
    OpenAi,
}

fn provider_for(model: &str) -> Provider {
    if model.starts_with("claude") {
        Provider::Anthropic
    } else if model.starts_with("gemini") {
        Provider::Gemini
    } else {
        Provider::OpenAi
    }
}

/// Environment variable holding the API key for a chat model.
pub fn api_key_var(model: &str) -> &'static str {
    match provider_for(model) {
        Provider::Anthropic => "ANTHROPIC_API_KEY",
        Provider::Gemini => "GOOGLE_API_KEY",
        Provider::OpenAi => "OPENAI_API_KEY",
    }
}

/// Chat model client; the provider is picked from the model name.
#[derive(Debug, Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    model: String,
}

impl LlmClient {
    pub fn new(client: reqwest::Client, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Generator for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        match provider_for(&self.model) {
            Provider::Anthropic => generate_anthropic(&self.client, prompt, &self.model).await,
            Provider::Gemini => generate_gemini(&self.client, prompt, &self.model).await,
            Provider::OpenAi => generate_openai(&self.client, prompt, &self.model).await,
        }
    }
}

async fn generate_anthropic(client: &reqwest::Client, prompt: &str, model: &str) -> Result<String> {
    let var = api_key_var(model);
    let api_key =
        std::env::var(var).map_err(|_| eyre::eyre!("{var} environment variable not set (required for Claude models)"))?;

    debug!("Generating via Anthropic API with model {model}");

    let body = serde_json::json!({
        "model": model,
        "max_tokens": 4096,
        "temperature": TEMPERATURE,
        "messages": [
            {
                "role": "user",
                "content": prompt
            }
        ]
    });

    let resp = client
        .post("https://api.anthropic.com/v1/messages")
        .header("x-api-key", &api_key)
        .header("anthropic-version", "2023-06-01")
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("Anthropic API returned {status}: {body}");
    }

    let json: serde_json::Value = resp.json().await?;
    extract_anthropic_text(&json)
}

fn extract_anthropic_text(json: &serde_json::Value) -> Result<String> {
    if let Some(content) = json.get("content").and_then(|c| c.as_array()) {
        let text: String = content
            .iter()
            .filter_map(|block| {
                if block.get("type")?.as_str()? == "text" {
                    block.get("text")?.as_str().map(|s| s.to_string())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");
        if !text.is_empty() {
            return Ok(text);
        }
    }
    bail!("unexpected Anthropic API response format");
}

async fn generate_gemini(client: &reqwest::Client, prompt: &str, model: &str) -> Result<String> {
    let var = api_key_var(model);
    let api_key =
        std::env::var(var).map_err(|_| eyre::eyre!("{var} environment variable not set (required for Gemini models)"))?;

    debug!("Generating via Gemini API with model {model}");

    let url = format!("https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent");

    let body = serde_json::json!({
        "contents": [
            {
                "role": "user",
                "parts": [{"text": prompt}]
            }
        ],
        "generationConfig": {
            "temperature": TEMPERATURE
        }
    });

    let resp = client
        .post(&url)
        .header("x-goog-api-key", &api_key)
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("Gemini API returned {status}: {body}");
    }

    let json: serde_json::Value = resp.json().await?;
    extract_gemini_text(&json)
}

fn extract_gemini_text(json: &serde_json::Value) -> Result<String> {
    if let Some(parts) = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
    {
        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text")?.as_str())
            .collect::<Vec<_>>()
            .join("");
        if !text.is_empty() {
            return Ok(text);
        }
    }
    bail!("unexpected Gemini API response format");
}

async fn generate_openai(client: &reqwest::Client, prompt: &str, model: &str) -> Result<String> {
    let var = api_key_var(model);
    let api_key =
        std::env::var(var).map_err(|_| eyre::eyre!("{var} environment variable not set (required for OpenAI models)"))?;

    debug!("Generating via OpenAI API with model {model}");

    let body = serde_json::json!({
        "model": model,
        "temperature": TEMPERATURE,
        "messages": [
            {
                "role": "user",
                "content": prompt
            }
        ]
    });

    let resp = client
        .post("https://api.openai.com/v1/chat/completions")
        .bearer_auth(&api_key)
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        bail!("OpenAI API returned {status}: {body}");
    }

    let json: serde_json::Value = resp.json().await?;
    extract_openai_text(&json)
}

fn extract_openai_text(json: &serde_json::Value) -> Result<String> {
    if let Some(text) = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
    {
        return Ok(text.to_string());
    }
    bail!("unexpected OpenAI API response format");
}
