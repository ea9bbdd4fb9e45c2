//! Gemini (Google) image backend: Imagen for text-to-image, Gemini image
//! models for single-image edits.

use crate::error::{parse_retry_after, sanitize_error_message, Result, StudioError};
use crate::image::backend::ImageBackend;
use crate::image::types::{BatchRequest, EditRequest, ResultImage};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variables consulted for the API key, in order.
const API_KEY_VARS: [&str; 2] = ["GOOGLE_API_KEY", "API_KEY"];

/// Imagen text-to-image model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImagenModel {
    /// Imagen 4 (balanced).
    #[default]
    Imagen4,
    /// Imagen 4 Fast.
    Imagen4Fast,
    /// Imagen 4 Ultra (highest quality).
    Imagen4Ultra,
}

impl ImagenModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Imagen4 => "imagen-4.0-generate-001",
            Self::Imagen4Fast => "imagen-4.0-fast-generate-001",
            Self::Imagen4Ultra => "imagen-4.0-ultra-generate-001",
        }
    }
}

/// Gemini image model variants, used for edits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeminiModel {
    /// Nano Banana - Gemini 2.5 Flash Image (fast, economical).
    #[default]
    NanoBanana,
    /// Nano Banana Pro - Gemini 3 Pro Image (highest quality).
    NanoBananaPro,
}

impl GeminiModel {
    /// Returns the API model identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NanoBanana => "gemini-2.5-flash-image",
            Self::NanoBananaPro => "nano-banana-pro-preview",
        }
    }
}

/// Builder for GeminiBackend.
#[derive(Debug, Clone, Default)]
pub struct GeminiBackendBuilder {
    api_key: Option<String>,
    imagen_model: ImagenModel,
    gemini_model: GeminiModel,
    base_url: Option<String>,
}

impl GeminiBackendBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `GOOGLE_API_KEY`, then `API_KEY`.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the model used for text-to-image generation.
    pub fn imagen_model(mut self, model: ImagenModel) -> Self {
        self.imagen_model = model;
        self
    }

    /// Sets the model used for image edits.
    pub fn gemini_model(mut self, model: GeminiModel) -> Self {
        self.gemini_model = model;
        self
    }

    /// Overrides the API base URL (e.g. for a proxy).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Builds the backend, resolving the API key.
    pub fn build(self) -> Result<GeminiBackend> {
        let api_key = self
            .api_key
            .filter(|k| !k.is_empty())
            .or_else(|| {
                API_KEY_VARS
                    .iter()
                    .find_map(|var| std::env::var(var).ok().filter(|k| !k.is_empty()))
            })
            .ok_or_else(|| {
                StudioError::Auth("GOOGLE_API_KEY not set and no API key provided".into())
            })?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(GeminiBackend {
            client: reqwest::Client::new(),
            api_key,
            imagen_model: self.imagen_model,
            gemini_model: self.gemini_model,
            base_url,
        })
    }
}

/// Gemini image backend.
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
    imagen_model: ImagenModel,
    gemini_model: GeminiModel,
    base_url: String,
}

impl GeminiBackend {
    /// Creates a new `GeminiBackendBuilder`.
    pub fn builder() -> GeminiBackendBuilder {
        GeminiBackendBuilder::new()
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    async fn post_json<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let headers = response.headers().clone();
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), &text, &headers));
        }
        Ok(response)
    }
}

#[async_trait]
impl ImageBackend for GeminiBackend {
    async fn generate_batch(&self, request: &BatchRequest) -> Result<Vec<String>> {
        let start = Instant::now();
        let url = self.model_url(self.imagen_model.as_str(), "predict");
        let body = ImagenRequest::from_batch_request(request);

        tracing::debug!(model = self.imagen_model.as_str(), count = request.count, "submitting batch generation");
        let response: ImagenResponse = self.post_json(&url, &body).await?.json().await?;
        let payloads = response.into_payloads()?;

        tracing::debug!(
            images = payloads.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "batch generation complete"
        );
        Ok(payloads)
    }

    async fn edit_single(&self, request: &EditRequest) -> Result<ResultImage> {
        let start = Instant::now();
        let url = self.model_url(self.gemini_model.as_str(), "generateContent");
        let body = GeminiRequest::from_edit_request(request);

        tracing::debug!(model = self.gemini_model.as_str(), "submitting image edit");
        let response: GeminiResponse = self.post_json(&url, &body).await?.json().await?;
        let image = response.into_image()?;

        tracing::debug!(
            duration_ms = start.elapsed().as_millis() as u64,
            "image edit complete"
        );
        Ok(image)
    }

    fn name(&self) -> &str {
        "Gemini (Google)"
    }

    async fn health_check(&self) -> Result<()> {
        let url = format!("{}/models/{}", self.base_url, self.gemini_model.as_str());

        let response = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await?;

        match response.status().as_u16() {
            401 | 403 => Err(StudioError::Auth("Invalid API key".into())),
            404 => Err(StudioError::InvalidRequest(
                "Model not found. Verify the model name is correct.".into(),
            )),
            s if !(200..300).contains(&s) => Err(StudioError::Api {
                status: s,
                message: "Health check failed".into(),
            }),
            _ => Ok(()),
        }
    }
}

fn parse_error(status: u16, text: &str, headers: &reqwest::header::HeaderMap) -> StudioError {
    let text = sanitize_error_message(text);
    if status == 404 {
        return StudioError::InvalidRequest(
            "Model not found. Verify the model name is correct.".into(),
        );
    }
    if status == 429 {
        let retry_after = parse_retry_after(headers).map(std::time::Duration::from_secs);
        return StudioError::RateLimited { retry_after };
    }
    if status == 401 || status == 403 {
        return StudioError::Auth(text);
    }
    let lower = text.to_lowercase();
    if lower.contains("safety")
        || lower.contains("blocked")
        || lower.contains("content_policy")
        || lower.contains("prohibited")
    {
        return StudioError::ContentBlocked(text);
    }
    StudioError::Api {
        status,
        message: text,
    }
}

// Imagen request/response types
#[derive(Debug, Serialize)]
struct ImagenRequest {
    instances: Vec<ImagenInstance>,
    parameters: ImagenParameters,
}

#[derive(Debug, Serialize)]
struct ImagenInstance {
    prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImagenParameters {
    sample_count: usize,
    aspect_ratio: &'static str,
    output_options: ImagenOutputOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImagenOutputOptions {
    mime_type: &'static str,
}

impl ImagenRequest {
    fn from_batch_request(req: &BatchRequest) -> Self {
        Self {
            instances: vec![ImagenInstance {
                prompt: req.prompt.clone(),
            }],
            parameters: ImagenParameters {
                sample_count: req.count,
                aspect_ratio: req.aspect_ratio.as_str(),
                output_options: ImagenOutputOptions {
                    mime_type: req.format.mime_type(),
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ImagenResponse {
    #[serde(default)]
    predictions: Vec<ImagenPrediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImagenPrediction {
    #[serde(default)]
    bytes_base64_encoded: Option<String>,
    #[serde(default)]
    rai_filtered_reason: Option<String>,
}

impl ImagenResponse {
    fn into_payloads(self) -> Result<Vec<String>> {
        let mut payloads = Vec::with_capacity(self.predictions.len());
        let mut filtered = None;
        for prediction in self.predictions {
            match (prediction.bytes_base64_encoded, prediction.rai_filtered_reason) {
                (Some(data), _) => payloads.push(data),
                (None, Some(reason)) => filtered = Some(reason),
                (None, None) => {}
            }
        }

        if payloads.is_empty() {
            return Err(match filtered {
                Some(reason) => StudioError::ContentBlocked(reason),
                None => StudioError::UnexpectedResponse("No images in Imagen response".into()),
            });
        }
        Ok(payloads)
    }
}

// Gemini request/response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

/// A part in a Gemini request - can be text or inline image data.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
}

impl GeminiRequest {
    fn from_edit_request(req: &EditRequest) -> Self {
        // Source image first, then the instruction.
        let parts = vec![
            GeminiRequestPart::InlineData {
                inline_data: InlineData {
                    mime_type: req.image.mime_type.clone(),
                    data: req.image.data.clone(),
                },
            },
            GeminiRequestPart::Text {
                text: req.instruction.clone(),
            },
        ];

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                response_modalities: vec!["IMAGE".to_string()],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

impl GeminiResponse {
    fn into_image(self) -> Result<ResultImage> {
        // Blocked prompts come back as HTTP 200 with prompt feedback.
        if let Some(feedback) = self.prompt_feedback {
            if let Some(reason) = feedback.block_reason {
                let msg = feedback
                    .block_reason_message
                    .unwrap_or_else(|| format!("Prompt blocked: {}", reason));
                return Err(StudioError::ContentBlocked(msg));
            }
        }

        let candidate = self.candidates.into_iter().next().ok_or_else(|| {
            StudioError::UnexpectedResponse("No candidates in Gemini response".into())
        })?;

        if let Some(ref finish_reason) = candidate.finish_reason {
            match finish_reason.as_str() {
                "SAFETY"
                | "IMAGE_SAFETY"
                | "IMAGE_PROHIBITED_CONTENT"
                | "IMAGE_RECITATION"
                | "RECITATION"
                | "PROHIBITED_CONTENT"
                | "BLOCKLIST" => {
                    return Err(StudioError::ContentBlocked(format!(
                        "Content blocked by Gemini safety filter: {}",
                        finish_reason
                    )));
                }
                _ => {} // STOP, MAX_TOKENS, NO_IMAGE etc. fall through to the part scan
            }
        }

        candidate
            .content
            .into_iter()
            .flat_map(|c| c.parts)
            .find_map(|p| p.inline_data)
            .map(|inline| ResultImage::embedded(inline.mime_type, inline.data))
            .ok_or(StudioError::NoImageInResponse)
    }
}
