//! The generative-model seam.
//!
//! The pipeline consumes its backend through [`GenerativeModel`], which
//! names the three capabilities the stages need: search-grounded text,
//! schema-constrained JSON, and image generation. [`GeminiModel`] is the
//! production implementation; tests script the trait instead.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::story::EncodedImage;

/// Default model for the text stages.
const TEXT_MODEL: &str = "gemini-2.5-flash";

/// Default model for the image stages.
const IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// Errors surfaced by a generative backend.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("API error: {0}")]
    Api(#[from] gemini::Error),

    #[error("model returned no usable text")]
    EmptyResponse,

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// The capabilities the pipeline needs from a generative backend.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Free-text generation grounded with web search.
    ///
    /// May return an empty string when the search finds nothing; callers
    /// substitute their own fallback text.
    async fn search_text(&self, prompt: &str) -> Result<String, ModelError>;

    /// Generation constrained to `schema`, returning the raw JSON text.
    async fn structured_json(&self, prompt: &str, schema: &Value) -> Result<String, ModelError>;

    /// Image generation. `None` when the response carries no image part.
    async fn generate_image(&self, prompt: &str) -> Result<Option<EncodedImage>, ModelError>;
}

/// Production [`GenerativeModel`] backed by the Gemini API.
#[derive(Clone)]
pub struct GeminiModel {
    client: gemini::Gemini,
    text_model: String,
    image_model: String,
}

impl GeminiModel {
    /// Wrap a configured client with the default model choices.
    pub fn new(client: gemini::Gemini) -> Self {
        Self {
            client,
            text_model: TEXT_MODEL.to_string(),
            image_model: IMAGE_MODEL.to_string(),
        }
    }

    /// Create from the GEMINI_API_KEY environment variable.
    pub fn from_env() -> Result<Self, gemini::Error> {
        Ok(Self::new(gemini::Gemini::from_env()?))
    }

    /// Set the model used for the text stages.
    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    /// Set the model used for the image stages.
    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = model.into();
        self
    }
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    async fn search_text(&self, prompt: &str) -> Result<String, ModelError> {
        let request = gemini::GenerateRequest::new(prompt)
            .with_model(&self.text_model)
            .with_google_search();

        let response = self.client.generate(request).await?;
        Ok(response.text().unwrap_or_default())
    }

    async fn structured_json(&self, prompt: &str, schema: &Value) -> Result<String, ModelError> {
        let request = gemini::GenerateRequest::new(prompt)
            .with_model(&self.text_model)
            .with_json_schema(schema.clone());

        let response = self.client.generate(request).await?;
        response
            .text()
            .filter(|text| !text.trim().is_empty())
            .ok_or(ModelError::EmptyResponse)
    }

    async fn generate_image(&self, prompt: &str) -> Result<Option<EncodedImage>, ModelError> {
        let request = gemini::GenerateRequest::new(prompt).with_model(&self.image_model);

        let response = self.client.generate(request).await?;
        Ok(response
            .inline_data()
            .map(|inline| EncodedImage::new(&inline.mime_type, &inline.data)))
    }
}
