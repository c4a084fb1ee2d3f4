// Gemini generateContent client

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{EditError, RecognitionError};
use crate::models::{AppConfig, EncodedImage};

const TAGGING_PROMPT: &str = "Identify the primary object in this product photo and its category. \
Then add 5 to 7 concise attribute tags describing it (for example color, material, style or use). \
Respond only with a JSON array of short strings, starting with the object and its category.";

/// Remote image model: one call per user action, no retained state.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageModel: Send + Sync {
    /// Apply a free-text instruction to an image, returning the new image as base64.
    async fn edit_image(
        &self,
        image: EncodedImage,
        instruction: String,
    ) -> std::result::Result<String, EditError>;

    /// Describe an image as an ordered list of short tags.
    async fn recognize_objects(
        &self,
        image: EncodedImage,
    ) -> std::result::Result<Vec<String>, RecognitionError>;
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    edit_model: String,
    tag_model: String,
    client: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

impl GenerateContentRequest {
    fn new(image: EncodedImage, text: String, generation_config: GenerationConfig) -> Self {
        let parts = vec![
            RequestPart::InlineData {
                inline_data: InlineData {
                    mime_type: image.media_type.mime_type().to_string(),
                    data: image.data,
                },
            },
            RequestPart::Text { text },
        ];

        Self {
            contents: vec![RequestContent { parts }],
            generation_config,
        }
    }

    fn edit(image: EncodedImage, instruction: String) -> Self {
        Self::new(
            image,
            instruction,
            GenerationConfig {
                response_modalities: Some(vec!["IMAGE".to_string()]),
                ..GenerationConfig::default()
            },
        )
    }

    fn tagging(image: EncodedImage) -> Self {
        Self::new(
            image,
            TAGGING_PROMPT.to_string(),
            GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(serde_json::json!({
                    "type": "ARRAY",
                    "items": { "type": "STRING" }
                })),
                ..GenerationConfig::default()
            },
        )
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}

impl GenerateContentResponse {
    fn into_parts(self) -> Vec<ResponsePart> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts)
            .unwrap_or_default()
    }

    /// Base64 payload of the first part carrying inline data.
    fn into_inline_image(self) -> Option<String> {
        self.into_parts()
            .into_iter()
            .find_map(|part| part.inline_data)
            .map(|inline| inline.data)
    }

    fn into_text(self) -> Option<String> {
        let text: String = self
            .into_parts()
            .into_iter()
            .filter_map(|part| part.text)
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Map a non-success HTTP status from the edit endpoint to its error category.
fn classify_edit_failure(status: u16, body: String) -> EditError {
    match status {
        400 => EditError::Rejected { detail: body },
        500..=599 => EditError::Unavailable { status },
        _ => EditError::Failed(format!("API request failed with status {status}: {body}")),
    }
}

/// Parse the model's tag answer. Anything but a JSON array of strings is rejected.
pub fn parse_tags(text: &str) -> std::result::Result<Vec<String>, RecognitionError> {
    let value: serde_json::Value = serde_json::from_str(text.trim())
        .map_err(|e| RecognitionError::Failed(format!("Tag response is not JSON: {e}")))?;

    let serde_json::Value::Array(items) = value else {
        return Err(RecognitionError::InvalidTagFormat);
    };

    items
        .into_iter()
        .map(|item| match item {
            serde_json::Value::String(tag) => Ok(tag),
            _ => Err(RecognitionError::InvalidTagFormat),
        })
        .collect()
}

impl GeminiClient {
    pub fn new(config: &AppConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key,
            edit_model: config.edit_model.clone(),
            tag_model: config.tag_model.clone(),
            client,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }

    async fn send(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> reqwest::Result<reqwest::Response> {
        tracing::debug!(model, "sending generateContent request");
        self.client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
    }
}

#[async_trait]
impl ImageModel for GeminiClient {
    async fn edit_image(
        &self,
        image: EncodedImage,
        instruction: String,
    ) -> std::result::Result<String, EditError> {
        let request = GenerateContentRequest::edit(image, instruction);

        let response = self
            .send(&self.edit_model, &request)
            .await
            .map_err(|e| EditError::Failed(format!("Failed to send edit request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %text, "edit request failed");
            return Err(classify_edit_failure(status.as_u16(), text));
        }

        let body = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| EditError::Failed(format!("Failed to parse edit response: {e}")))?;

        body.into_inline_image().ok_or_else(|| {
            tracing::warn!("edit response carried no inline image data");
            EditError::NoImage
        })
    }

    async fn recognize_objects(
        &self,
        image: EncodedImage,
    ) -> std::result::Result<Vec<String>, RecognitionError> {
        let request = GenerateContentRequest::tagging(image);

        let response = self
            .send(&self.tag_model, &request)
            .await
            .map_err(|e| RecognitionError::Failed(format!("Failed to send tag request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %text, "tag request failed");
            return Err(RecognitionError::Failed(format!(
                "API request failed with status {status}"
            )));
        }

        let body = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| RecognitionError::Failed(format!("Failed to parse tag response: {e}")))?;

        let text = body
            .into_text()
            .ok_or_else(|| RecognitionError::Failed("Tag response had no text".to_string()))?;

        parse_tags(&text)
    }
}
