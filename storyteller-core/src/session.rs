//! StorySession - the primary public API for story generation.
//!
//! This module wraps the pipeline with the state a front end needs: the
//! chosen locale, the latest completed result, the progress signal, and
//! result persistence. It also enforces the ordering rule between the main
//! run and the dietary follow-up.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::fs;
use tokio::sync::watch;

use crate::locale::Locale;
use crate::model::{GeminiModel, GenerativeModel};
use crate::pipeline::{Progress, Storyteller, StorytellerConfig, StorytellerError, DEFAULT_REGION};
use crate::story::StoryResult;

/// Errors from StorySession operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("pipeline error: {0}")]
    Pipeline(#[from] StorytellerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No API key configured - set GEMINI_API_KEY environment variable")]
    NoApiKey,

    #[error("no story result to save yet")]
    NoResult,
}

/// Configuration for creating a story session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Language the model answers in.
    pub locale: Locale,

    /// Region anchor woven into every prompt.
    pub region: String,

    /// Override for the text-stage model.
    pub text_model: Option<String>,

    /// Override for the image-stage model.
    pub image_model: Option<String>,

    /// Per-request timeout; None leaves the transport default in place.
    pub timeout: Option<Duration>,
}

impl SessionConfig {
    /// Create a session config with defaults.
    pub fn new() -> Self {
        Self {
            locale: Locale::default(),
            region: DEFAULT_REGION.to_string(),
            text_model: None,
            image_model: None,
            timeout: None,
        }
    }

    /// Set the response language.
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Set the region anchor.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set the model for the text stages.
    pub fn with_text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = Some(model.into());
        self
    }

    /// Set the model for the image stages.
    pub fn with_image_model(mut self, model: impl Into<String>) -> Self {
        self.image_model = Some(model.into());
        self
    }

    /// Bound each model request to a timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of the dietary follow-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DietaryOutcome {
    /// Options were attached to the result. The lists may all be empty;
    /// an empty lookup is still a completed lookup.
    Loaded,
    /// No completed story exists yet, so nothing was done.
    NotReady,
    /// The lookup failed. The existing result is untouched.
    Failed,
}

/// A story-generation session.
///
/// Owns the latest result and the locale, and runs the pipeline on demand.
pub struct StorySession {
    storyteller: Storyteller,
    locale: Locale,
    result: Option<StoryResult>,
}

impl StorySession {
    /// Create a session backed by the Gemini API.
    ///
    /// Reads GEMINI_API_KEY from the environment.
    pub fn from_env(config: SessionConfig) -> Result<Self, SessionError> {
        let mut client = gemini::Gemini::from_env().map_err(|_| SessionError::NoApiKey)?;
        if let Some(timeout) = config.timeout {
            client = client.with_timeout(timeout);
        }

        let mut model = GeminiModel::new(client);
        if let Some(text_model) = &config.text_model {
            model = model.with_text_model(text_model);
        }
        if let Some(image_model) = &config.image_model {
            model = model.with_image_model(image_model);
        }

        Ok(Self::with_model(Arc::new(model), config))
    }

    /// Create a session over any backend.
    pub fn with_model(model: Arc<dyn GenerativeModel>, config: SessionConfig) -> Self {
        let storyteller = Storyteller::new(model)
            .with_config(StorytellerConfig::new().with_region(config.region));
        Self {
            storyteller,
            locale: config.locale,
            result: None,
        }
    }

    /// Run the main pipeline and keep the result.
    ///
    /// Any previous result is cleared first, so a failed run leaves the
    /// session without a result rather than with a stale one.
    pub async fn generate(
        &mut self,
        location: &str,
        emotion: &str,
    ) -> Result<&StoryResult, SessionError> {
        self.result = None;
        let result = self.storyteller.run(location, emotion, self.locale).await?;
        Ok(self.result.insert(result))
    }

    /// Fetch dietary options for the completed story.
    ///
    /// Uses the location echoed back by the planning stage. Without a
    /// completed result this is a no-op reporting
    /// [`DietaryOutcome::NotReady`].
    pub async fn load_dietary(&mut self) -> DietaryOutcome {
        let Some(result) = self.result.as_mut() else {
            return DietaryOutcome::NotReady;
        };

        match self
            .storyteller
            .find_dietary(&result.content.location, self.locale)
            .await
        {
            Ok(dietary) => {
                result.dietary = Some(dietary);
                DietaryOutcome::Loaded
            }
            Err(_) => DietaryOutcome::Failed,
        }
    }

    /// The latest completed result, if any.
    pub fn result(&self) -> Option<&StoryResult> {
        self.result.as_ref()
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Change the response language for subsequent operations.
    pub fn set_locale(&mut self, locale: Locale) {
        self.locale = locale;
    }

    /// The current pipeline progress.
    pub fn progress(&self) -> Progress {
        self.storyteller.progress()
    }

    /// Observe pipeline progress transitions.
    pub fn subscribe_progress(&self) -> watch::Receiver<Progress> {
        self.storyteller.subscribe_progress()
    }

    /// Access the underlying pipeline.
    pub fn storyteller(&self) -> &Storyteller {
        &self.storyteller
    }

    /// Drop the result and return to the idle state.
    pub fn reset(&mut self) {
        self.result = None;
        self.storyteller.reset_progress();
    }

    /// Save the current result as pretty-printed JSON.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let result = self.result.as_ref().ok_or(SessionError::NoResult)?;
        let content = serde_json::to_string_pretty(result)?;
        fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::new();
        assert_eq!(config.locale, Locale::En);
        assert_eq!(config.region, DEFAULT_REGION);
        assert!(config.text_model.is_none());
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfig::new()
            .with_locale(Locale::Fr)
            .with_region("Lyon, France")
            .with_text_model("gemini-2.5-pro")
            .with_timeout(Duration::from_secs(90));

        assert_eq!(config.locale, Locale::Fr);
        assert_eq!(config.region, "Lyon, France");
        assert_eq!(config.text_model.as_deref(), Some("gemini-2.5-pro"));
        assert_eq!(config.timeout, Some(Duration::from_secs(90)));
    }
}
