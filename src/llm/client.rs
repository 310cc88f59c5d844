use crate::error::{ForecastError, Result};
use crate::llm::assistant::CompletionService;
use crate::llm::types::*;
use log::debug;
use reqwest::{Client, StatusCode};
use std::time::Duration;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-pro";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ForecastError::ServiceUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: GEMINI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Reads the key from `GEMINI_API_KEY`; `None` when unset, blank or
    /// the HTTP client cannot be built.
    pub fn from_env() -> Option<Self> {
        let key = std::env::var(API_KEY_ENV).ok()?;
        if key.trim().is_empty() {
            return None;
        }
        Self::new(key.trim()).ok()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn generate_content(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let payload = GenerateContentRequest {
            contents: vec![Content::user(prompt)],
            generation_config: None,
        };

        debug!("Calling {} with a {} byte prompt", self.model, prompt.len());

        let res = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await.unwrap_or_default();
            return Err(classify_status(status, &err_text));
        }

        let body: GenerateContentResponse = res.json().await.map_err(transport_error)?;
        extract_text(body)
    }
}

impl CompletionService for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.generate_content(prompt).await
    }
}

fn transport_error(e: reqwest::Error) -> ForecastError {
    if e.is_timeout() {
        ForecastError::Timeout(format!(
            "no response within {}s",
            REQUEST_TIMEOUT.as_secs()
        ))
    } else {
        ForecastError::ServiceUnavailable(e.to_string())
    }
}

pub(crate) fn classify_status(status: StatusCode, body: &str) -> ForecastError {
    let detail = format!("status {}: {}", status, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ForecastError::AuthError(detail),
        StatusCode::BAD_REQUEST if body.contains("API_KEY_INVALID") => {
            ForecastError::AuthError(detail)
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => ForecastError::Timeout(detail),
        _ => ForecastError::ServiceUnavailable(detail),
    }
}

pub(crate) fn extract_text(body: GenerateContentResponse) -> Result<String> {
    let text: String = body
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| ForecastError::ServiceUnavailable("No candidates returned".to_string()))?
        .content
        .parts
        .into_iter()
        .map(|part| part.text)
        .collect();

    if text.trim().is_empty() {
        return Err(ForecastError::ServiceUnavailable(
            "Model returned no text".to_string(),
        ));
    }
    Ok(text)
}
