use async_trait::async_trait;
use eyre::{Result, bail};
use log::debug;

/// Served by the same provider as the default chat model, so one key covers a default run
pub const DEFAULT_EMBEDDING_MODEL: &str = "gemini-embedding-001";

/// Maximum inputs per embedding request
const BATCH_SIZE: usize = 100;

/// Turns text into vectors for similarity search.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embedding backend selected from the model name
pub fn embedder_for(client: &reqwest::Client, model: &str) -> Box<dyn Embedder> {
    if is_gemini_model(model) {
        Box::new(GeminiEmbedder::new(client.clone(), model))
    } else {
        Box::new(OpenAiEmbedder::new(client.clone(), model))
    }
}

fn is_gemini_model(model: &str) -> bool {
    model.starts_with("text-embedding-00") || model.starts_with("gemini") || model.starts_with("embedding-")
}

/// Environment variable holding the API key for an embedding model.
pub fn api_key_var(model: &str) -> &'static str {
    if is_gemini_model(model) { "GOOGLE_API_KEY" } else { "OPENAI_API_KEY" }
}

pub struct OpenAiEmbedder {
    client: reqwest::Client,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(client: reqwest::Client, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let var = api_key_var(&self.model);
        let api_key = std::env::var(var)
            .map_err(|_| eyre::eyre!("{var} environment variable not set (required for OpenAI embeddings)"))?;

        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            debug!("Embedding {} texts via OpenAI model {}", batch.len(), self.model);

            let body = serde_json::json!({
                "model": self.model,
                "input": batch,
            });

            let resp = self
                .client
                .post("https://api.openai.com/v1/embeddings")
                .bearer_auth(&api_key)
                .json(&body)
                .send()
                .await?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                bail!("OpenAI embeddings API returned {status}: {body}");
            }

            let json: serde_json::Value = resp.json().await?;
            all.extend(extract_openai_embeddings(&json, batch.len())?);
        }

        Ok(all)
    }
}

fn extract_openai_embeddings(json: &serde_json::Value, expected: usize) -> Result<Vec<Vec<f32>>> {
    let Some(data) = json.get("data").and_then(|d| d.as_array()) else {
        bail!("unexpected OpenAI embeddings response format");
    };

    let mut indexed: Vec<(u64, Vec<f32>)> = data
        .iter()
        .filter_map(|item| {
            let index = item.get("index")?.as_u64()?;
            Some((index, to_vector(item.get("embedding")?)?))
        })
        .collect();
    indexed.sort_by_key(|(i, _)| *i);

    if indexed.len() != expected {
        bail!("OpenAI returned {} embeddings for {expected} inputs", indexed.len());
    }
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

pub struct GeminiEmbedder {
    client: reqwest::Client,
    model: String,
}

impl GeminiEmbedder {
    pub fn new(client: reqwest::Client, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let var = api_key_var(&self.model);
        let api_key = std::env::var(var)
            .map_err(|_| eyre::eyre!("{var} environment variable not set (required for Gemini embeddings)"))?;

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:batchEmbedContents",
            self.model
        );

        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            debug!("Embedding {} texts via Gemini model {}", batch.len(), self.model);

            let requests: Vec<serde_json::Value> = batch
                .iter()
                .map(|text| {
                    serde_json::json!({
                        "model": format!("models/{}", self.model),
                        "content": {"parts": [{"text": text}]}
                    })
                })
                .collect();

            let resp = self
                .client
                .post(&url)
                .header("x-goog-api-key", &api_key)
                .json(&serde_json::json!({ "requests": requests }))
                .send()
                .await?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                bail!("Gemini embeddings API returned {status}: {body}");
            }

            let json: serde_json::Value = resp.json().await?;
            all.extend(extract_gemini_embeddings(&json, batch.len())?);
        }

        Ok(all)
    }
}

fn extract_gemini_embeddings(json: &serde_json::Value, expected: usize) -> Result<Vec<Vec<f32>>> {
    let Some(items) = json.get("embeddings").and_then(|e| e.as_array()) else {
        bail!("unexpected Gemini embeddings response format");
    };

    let vectors: Vec<Vec<f32>> = items
        .iter()
        .filter_map(|item| to_vector(item.get("values")?))
        .collect();

    if vectors.len() != expected {
        bail!("Gemini returned {} embeddings for {expected} inputs", vectors.len());
    }
    Ok(vectors)
}

fn to_vector(value: &serde_json::Value) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}
