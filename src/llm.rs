//! Ollama text-generation client.
//!
//! Sends one `POST /api/generate` request per pipeline run and returns the
//! raw reply text. Transient failures are retried with exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use std::time::Duration;

use crate::config::GenerationConfig;

/// Client for a local Ollama instance.
///
/// Construction fails when no model is configured, so every flow that could
/// reach the model reports the misconfiguration up front instead of half way
/// through a pipeline run.
#[derive(Debug)]
pub struct OllamaClient {
    model: String,
    url: String,
    timeout_secs: u64,
    max_retries: u32,
}

impl OllamaClient {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let model = match &config.model {
            Some(m) if !m.trim().is_empty() => m.clone(),
            _ => bail!(
                "generation.model is not configured; set it in the [generation] section before generating FAQs"
            ),
        };

        Ok(Self {
            model,
            url: config.url.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Run one generation request and return the reply text.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = client
                .post(format!("{}/api/generate", self.url))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_generate_response(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "Ollama API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("Ollama API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(anyhow::anyhow!(
                        "Ollama connection error (is Ollama running at {}?): {}",
                        self.url,
                        e
                    ));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Ollama generation failed after retries")))
    }
}

/// Render the instruction prompt for one pipeline run.
///
/// The `Qn:`/`Rn:` line format requested here is advisory; the parser in
/// [`crate::parse`] recovers whatever the model actually produced.
pub fn build_prompt(context: &str, num_faqs: usize) -> String {
    format!(
        "Analyze the following document and generate {num_faqs} relevant \
         question/answer pairs (a FAQ).\n\
         \n\
         Document context:\n\
         {context}\n\
         \n\
         Instructions:\n\
         - Create exactly {num_faqs} question/answer pairs\n\
         - Questions must be clear and practical\n\
         - Answers must be based only on the content provided\n\
         - Number each pair from 1 to {num_faqs}\n\
         - Reply in exactly this format, with no other commentary:\n\
           Q1: [question]\n\
           R1: [answer]\n\
           Q2: [question]\n\
           R2: [answer]\n\
           ... etc\n\
         \n\
         FAQ:"
    )
}

/// Pull the reply text out of an `/api/generate` response body.
fn parse_generate_response(json: &serde_json::Value) -> Result<String> {
    json.get("response")
        .and_then(|r| r.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing response field"))
}
