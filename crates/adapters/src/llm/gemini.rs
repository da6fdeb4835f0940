//! Google Gemini API adapter

use async_trait::async_trait;
use quizcast_domain::{ContentGenerator, GenerateError, GenerateRequest, GeneratedContent};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use super::{LlmConfig, PromptSet, parse_quiz_response, parse_text_response};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini content generator
pub struct GeminiGenerator {
    client: Client,
    api_key: SecretString,
    base_url: String,
    config: LlmConfig,
    prompts: PromptSet,
}

impl GeminiGenerator {
    pub fn new(
        api_key: SecretString,
        config: LlmConfig,
        prompts: PromptSet,
    ) -> Result<Self, GenerateError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerateError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            config,
            prompts,
        })
    }

    /// Point the adapter at another endpoint (proxies, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn call_api(&self, prompt: &str, structured: bool) -> Result<String, GenerateError> {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                temperature: Some(self.config.temperature),
                max_output_tokens: Some(self.config.max_output_tokens),
                response_mime_type: structured.then(|| "application/json".to_string()),
                response_schema: structured.then(quiz_schema),
            }),
            system_instruction: Some(SystemInstruction {
                parts: vec![Part {
                    text: self.config.system_instruction.clone(),
                }],
            }),
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url,
            self.config.model,
            self.api_key.expose_secret()
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerateError::Timeout
                } else {
                    // reqwest errors embed the URL, which carries the key
                    GenerateError::Api(e.without_url().to_string())
                }
            })?;

        if response.status() == 429 {
            return Err(GenerateError::RateLimited);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Api(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let api_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| GenerateError::InvalidFormat(e.without_url().to_string()))?;

        let text = api_response
            .candidates
            .into_iter()
            .flat_map(|c| c.content.parts)
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(GenerateError::InvalidFormat("Empty response".to_string()));
        }

        Ok(text)
    }
}

fn quiz_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "question": { "type": "STRING" },
            "options": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "minItems": 4,
                "maxItems": 4
            },
            "correct_index": { "type": "INTEGER" },
            "explanation": { "type": "STRING" }
        },
        "required": ["question", "options", "correct_index", "explanation"]
    })
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "generationConfig")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "systemInstruction")]
    system_instruction: Option<SystemInstruction>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "maxOutputTokens")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "responseMimeType")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "responseSchema")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[async_trait]
impl ContentGenerator for GeminiGenerator {
    async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<GeneratedContent, GenerateError> {
        let prompt = self.prompts.build_prompt(request)?;
        let structured = request.category.is_quiz();

        tracing::debug!(
            category = %request.category,
            model = %self.config.model,
            structured = structured,
            "Calling Gemini"
        );

        let response_text = self.call_api(&prompt, structured).await?;

        if structured {
            let quiz = parse_quiz_response(&response_text).inspect_err(|e| {
                tracing::warn!(error = %e, "Failed to parse quiz response");
            })?;
            Ok(GeneratedContent::Quiz(quiz))
        } else {
            Ok(GeneratedContent::Text {
                text: parse_text_response(&response_text)?,
            })
        }
    }
}
