//! The story-generation pipeline.
//!
//! [`Storyteller`] runs the staged sequence against a [`GenerativeModel`]:
//! search-grounded history research, a structured content plan, then a
//! concurrent fan-out producing two images and a nearby-places listing.
//! A separate, caller-triggered follow-up finds dietary options.
//!
//! Failure policy is fixed per stage: research and planning failures abort
//! the run, fan-out failures degrade their own slot to `None`, and the
//! dietary follow-up never disturbs an already completed result.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::locale::Locale;
use crate::model::{GenerativeModel, ModelError};
use crate::prompts::{
    build_dietary_format_prompt, build_dietary_search_prompt, build_history_prompt,
    build_landscape_prompt, build_nearby_format_prompt, build_nearby_search_prompt,
    build_plan_prompt, build_watercolor_prompt,
};
use crate::schema::{dietary_schema, nearby_schema, story_schema};
use crate::story::{DietaryPlaces, EncodedImage, NearbyInfo, StoryContent, StoryResult};

/// Region anchor used when none is configured.
pub const DEFAULT_REGION: &str = "Busan, South Korea";

/// Substitute history when the search stage finds nothing.
const HISTORY_FALLBACK: &str = "Could not find specific historical records for this location.";

/// Substitute search text when the nearby lookup finds nothing.
const NEARBY_SEARCH_FALLBACK: &str = "No specific places found.";

/// Substitute search text when the dietary lookup finds nothing.
const DIETARY_SEARCH_FALLBACK: &str = "No specific dietary places found.";

/// Coarse progress of a pipeline run.
///
/// The main sequence is Idle, Researching, Planning, Scouting, Complete.
/// Error is the terminal state of an aborted run. DietaryLoading brackets
/// the follow-up lookup and always returns to Complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Progress {
    #[default]
    Idle,
    Researching,
    Planning,
    Scouting,
    DietaryLoading,
    Complete,
    Error,
}

impl Progress {
    /// Stable lowercase name, as surfaced to front ends.
    pub fn name(&self) -> &'static str {
        match self {
            Progress::Idle => "idle",
            Progress::Researching => "researching",
            Progress::Planning => "planning",
            Progress::Scouting => "scouting",
            Progress::DietaryLoading => "dietary-loading",
            Progress::Complete => "complete",
            Progress::Error => "error",
        }
    }
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Configuration for the storyteller pipeline.
#[derive(Debug, Clone)]
pub struct StorytellerConfig {
    /// Region anchor woven into every location prompt.
    pub region: String,
}

impl StorytellerConfig {
    pub fn new() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
        }
    }

    /// Set the region anchor.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }
}

impl Default for StorytellerConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Failure of one search-and-extract lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("response did not match the expected shape: {0}")]
    Shape(#[from] serde_json::Error),
}

/// Errors that abort a pipeline operation.
#[derive(Debug, Error)]
pub enum StorytellerError {
    /// Location and emotion must be non-empty before any call is made.
    #[error("location and emotion must not be empty")]
    EmptyInput,

    #[error("history research failed: {0}")]
    Research(#[source] ModelError),

    #[error("content planning failed: {0}")]
    Planning(#[source] LookupError),

    #[error("dietary lookup failed: {0}")]
    Dietary(#[source] LookupError),
}

impl StorytellerError {
    /// The localized, user-facing message for this failure.
    ///
    /// Users always see the same generic line; the specific cause stays in
    /// the error chain and the logs.
    pub fn user_message(&self, locale: Locale) -> &'static str {
        locale.error_message()
    }
}

/// The staged story-generation pipeline.
pub struct Storyteller {
    model: Arc<dyn GenerativeModel>,
    config: StorytellerConfig,
    progress: watch::Sender<Progress>,
}

impl Storyteller {
    /// Create a pipeline over the given backend.
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        let (progress, _) = watch::channel(Progress::Idle);
        Self {
            model,
            config: StorytellerConfig::default(),
            progress,
        }
    }

    /// Replace the pipeline configuration.
    pub fn with_config(mut self, config: StorytellerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &StorytellerConfig {
        &self.config
    }

    /// Observe progress transitions.
    ///
    /// The receiver always yields the latest state; intermediate states can
    /// coalesce when stages finish faster than the observer polls.
    pub fn subscribe_progress(&self) -> watch::Receiver<Progress> {
        self.progress.subscribe()
    }

    /// The current progress state.
    pub fn progress(&self) -> Progress {
        *self.progress.borrow()
    }

    /// Return the progress signal to Idle, ready for a fresh run.
    pub fn reset_progress(&self) {
        self.set_progress(Progress::Idle);
    }

    fn set_progress(&self, state: Progress) {
        debug!(state = state.name(), "pipeline progress");
        self.progress.send_replace(state);
    }

    /// Run the main pipeline: history, plan, then images and nearby places.
    ///
    /// Research and planning failures abort the run and surface here. The
    /// fan-out never aborts; a failed image or places lookup leaves its
    /// result slot empty. Empty inputs are rejected before any stage runs.
    pub async fn run(
        &self,
        location: &str,
        emotion: &str,
        locale: Locale,
    ) -> Result<StoryResult, StorytellerError> {
        let location = location.trim();
        let emotion = emotion.trim();
        if location.is_empty() || emotion.is_empty() {
            return Err(StorytellerError::EmptyInput);
        }

        match self.run_stages(location, emotion, locale).await {
            Ok(result) => {
                self.set_progress(Progress::Complete);
                Ok(result)
            }
            Err(e) => {
                error!(error = %e, "pipeline aborted");
                self.set_progress(Progress::Error);
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        location: &str,
        emotion: &str,
        locale: Locale,
    ) -> Result<StoryResult, StorytellerError> {
        self.set_progress(Progress::Researching);
        let history = self.research_history(location, locale).await?;

        self.set_progress(Progress::Planning);
        let content = self.plan_content(location, emotion, &history, locale).await?;

        self.set_progress(Progress::Scouting);
        let (watercolor, landscape, nearby) = tokio::join!(
            self.paint_watercolor(&content.visual_prompt),
            self.shoot_landscape(location),
            self.scout_nearby(location, locale),
        );

        Ok(StoryResult {
            content,
            watercolor,
            landscape,
            nearby,
            dietary: None,
        })
    }

    /// Search-grounded history lookup. An empty answer is replaced with a
    /// fallback sentence so the planning stage always has input.
    async fn research_history(
        &self,
        location: &str,
        locale: Locale,
    ) -> Result<String, StorytellerError> {
        let prompt = build_history_prompt(location, &self.config.region, locale);
        let text = self
            .model
            .search_text(&prompt)
            .await
            .map_err(StorytellerError::Research)?;

        if text.trim().is_empty() {
            debug!("history search returned no text, using fallback");
            return Ok(HISTORY_FALLBACK.to_string());
        }
        Ok(text)
    }

    /// Schema-constrained content plan. A malformed answer is fatal.
    async fn plan_content(
        &self,
        location: &str,
        emotion: &str,
        history: &str,
        locale: Locale,
    ) -> Result<StoryContent, StorytellerError> {
        let prompt = build_plan_prompt(location, emotion, history, &self.config.region, locale);
        let json = self
            .model
            .structured_json(&prompt, &story_schema())
            .await
            .map_err(|e| StorytellerError::Planning(e.into()))?;

        let content: StoryContent = serde_json::from_str(extract_json(&json))
            .map_err(|e| StorytellerError::Planning(e.into()))?;
        Ok(content)
    }

    async fn paint_watercolor(&self, visual_prompt: &str) -> Option<EncodedImage> {
        let prompt = build_watercolor_prompt(visual_prompt);
        match self.model.generate_image(&prompt).await {
            Ok(Some(image)) => Some(image),
            Ok(None) => {
                warn!("watercolor generation returned no image part");
                None
            }
            Err(e) => {
                warn!(error = %e, "watercolor generation failed");
                None
            }
        }
    }

    async fn shoot_landscape(&self, location: &str) -> Option<EncodedImage> {
        let prompt = build_landscape_prompt(location, &self.config.region);
        match self.model.generate_image(&prompt).await {
            Ok(Some(image)) => Some(image),
            Ok(None) => {
                warn!("landscape generation returned no image part");
                None
            }
            Err(e) => {
                warn!(error = %e, "landscape generation failed");
                None
            }
        }
    }

    async fn scout_nearby(&self, location: &str, locale: Locale) -> Option<NearbyInfo> {
        match self.nearby_places(location, locale).await {
            Ok(info) => Some(info),
            Err(e) => {
                warn!(error = %e, "nearby lookup failed");
                None
            }
        }
    }

    async fn nearby_places(
        &self,
        location: &str,
        locale: Locale,
    ) -> Result<NearbyInfo, LookupError> {
        let search_prompt = build_nearby_search_prompt(location, &self.config.region, locale);
        let mut found = self.model.search_text(&search_prompt).await?;
        if found.trim().is_empty() {
            found = NEARBY_SEARCH_FALLBACK.to_string();
        }

        let format_prompt = build_nearby_format_prompt(&found, locale);
        let json = self
            .model
            .structured_json(&format_prompt, &nearby_schema())
            .await?;

        let mut info: NearbyInfo = serde_json::from_str(extract_json(&json))?;
        info.enforce_cap();
        Ok(info)
    }

    /// The dietary follow-up: search, then structured extraction.
    ///
    /// Runs outside [`run`](Self::run) and only makes sense once a result
    /// exists. Whatever happens here, progress ends back at Complete; a
    /// failure is reported without touching any prior result.
    pub async fn find_dietary(
        &self,
        location: &str,
        locale: Locale,
    ) -> Result<DietaryPlaces, StorytellerError> {
        self.set_progress(Progress::DietaryLoading);
        let outcome = self.dietary_places(location, locale).await;
        self.set_progress(Progress::Complete);

        outcome.map_err(|e| {
            warn!(error = %e, "dietary lookup failed");
            StorytellerError::Dietary(e)
        })
    }

    async fn dietary_places(
        &self,
        location: &str,
        locale: Locale,
    ) -> Result<DietaryPlaces, LookupError> {
        let search_prompt = build_dietary_search_prompt(location, &self.config.region, locale);
        let mut found = self.model.search_text(&search_prompt).await?;
        if found.trim().is_empty() {
            found = DIETARY_SEARCH_FALLBACK.to_string();
        }

        let format_prompt = build_dietary_format_prompt(&found, locale);
        let json = self
            .model
            .structured_json(&format_prompt, &dietary_schema())
            .await?;

        let mut dietary: DietaryPlaces = serde_json::from_str(extract_json(&json))?;
        dietary.enforce_cap();
        Ok(dietary)
    }
}

/// Extract JSON from a response that might be wrapped in markdown fences.
///
/// Structured output mode should return bare JSON, but models occasionally
/// wrap it anyway.
fn extract_json(text: &str) -> &str {
    let text = text.trim();

    if let Some(start) = text.find("```json") {
        let content_start = start + 7;
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    if let Some(start) = text.find("```") {
        let content_start = start + 3;
        if let Some(end) = text[content_start..].find("```") {
            return text[content_start..content_start + end].trim();
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_plain() {
        let text = r#"{"restaurants": []}"#;
        assert_eq!(extract_json(text), text);
    }

    #[test]
    fn test_extract_json_markdown() {
        let text = "```json\n{\"vegan\": []}\n```";
        assert_eq!(extract_json(text), r#"{"vegan": []}"#);
    }

    #[test]
    fn test_extract_json_markdown_no_specifier() {
        let text = "```\n{\"halal\": []}\n```";
        assert_eq!(extract_json(text), r#"{"halal": []}"#);
    }

    #[test]
    fn test_progress_names() {
        assert_eq!(Progress::DietaryLoading.name(), "dietary-loading");
        assert_eq!(Progress::default(), Progress::Idle);
        assert_eq!(Progress::Complete.to_string(), "complete");
    }

    #[test]
    fn test_config_region_override() {
        let config = StorytellerConfig::new().with_region("Jeju, South Korea");
        assert_eq!(config.region, "Jeju, South Korea");
        assert_eq!(StorytellerConfig::default().region, DEFAULT_REGION);
    }

    #[test]
    fn test_user_message_is_localized() {
        let err = StorytellerError::EmptyInput;
        assert_eq!(err.user_message(Locale::En), Locale::En.error_message());
        assert_eq!(err.user_message(Locale::Ko), Locale::Ko.error_message());
    }
}
