//! Story domain types.
//!
//! Everything a pipeline run produces: the planned story content, place
//! recommendations, inline image payloads, and the aggregate result.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Maximum entries kept per place category.
pub const PLACES_PER_CATEGORY: usize = 3;

/// The structured story plan produced by the planning stage.
///
/// Field names serialize in camelCase to match the planning schema, so a
/// result file round-trips against the model's own output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryContent {
    /// The place the story is about, echoed back by the model.
    pub location: String,
    /// The emotion the story is anchored to, echoed back by the model.
    pub emotion: String,
    /// Summarized historical facts the plan is built on.
    pub history: String,
    /// Proposed format, e.g. "Documentary" or "Immersive Exhibition".
    pub content_type: String,
    pub content_title: String,
    pub target_audience: String,
    /// Synopsis linking the history and the emotion.
    pub plot: String,
    /// Expected emotional or cultural effect.
    pub effect: String,
    /// A message validating the user's emotion, tied to the history.
    pub consolation_message: String,
    /// Short display slogan, targeted at under 20 characters.
    pub poster_slogan: String,
    /// English-only scene description fed to the image model.
    pub visual_prompt: String,
}

/// A recommended place near the story location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    /// e.g. "Cafe", "Hotel", "Park".
    pub category: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// Website or map link; only the dietary lookup asks for one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Nearby recommendations, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NearbyInfo {
    pub restaurants: Vec<Place>,
    pub accommodations: Vec<Place>,
    pub attractions: Vec<Place>,
}

impl NearbyInfo {
    /// Truncate each category to [`PLACES_PER_CATEGORY`] entries.
    ///
    /// The extraction prompt asks for three per category, but the cap is
    /// not left to the model.
    pub fn enforce_cap(&mut self) {
        self.restaurants.truncate(PLACES_PER_CATEGORY);
        self.accommodations.truncate(PLACES_PER_CATEGORY);
        self.attractions.truncate(PLACES_PER_CATEGORY);
    }
}

/// Dietary-restricted options, grouped by diet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DietaryPlaces {
    pub vegan: Vec<Place>,
    pub halal: Vec<Place>,
    pub kosher: Vec<Place>,
}

impl DietaryPlaces {
    /// Truncate each diet to [`PLACES_PER_CATEGORY`] entries.
    pub fn enforce_cap(&mut self) {
        self.vegan.truncate(PLACES_PER_CATEGORY);
        self.halal.truncate(PLACES_PER_CATEGORY);
        self.kosher.truncate(PLACES_PER_CATEGORY);
    }

    /// True when no diet produced any entry.
    ///
    /// An all-empty lookup is still a completed lookup, distinct from one
    /// that was never requested or that failed.
    pub fn is_empty(&self) -> bool {
        self.vegan.is_empty() && self.halal.is_empty() && self.kosher.is_empty()
    }
}

/// An inline image returned by the image model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedImage {
    /// MIME type reported by the model, e.g. "image/png".
    pub mime_type: String,
    /// Base64-encoded image bytes.
    pub data: String,
}

impl EncodedImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Render as a `data:` URL for direct embedding.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Decode the base64 payload into raw image bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.data)
    }

    /// File extension matching the MIME type.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/jpeg" => "jpg",
            "image/webp" => "webp",
            _ => "bin",
        }
    }
}

/// Aggregate output of a pipeline run.
///
/// The story content is always present; the remaining slots degrade to
/// `None` independently when their stage fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryResult {
    pub content: StoryContent,
    /// Stylized watercolor painting of the planned scene.
    pub watercolor: Option<EncodedImage>,
    /// Photorealistic landscape shot of the location.
    pub landscape: Option<EncodedImage>,
    /// Nearby recommendations.
    pub nearby: Option<NearbyInfo>,
    /// Dietary options; attached only by the explicit follow-up.
    #[serde(default)]
    pub dietary: Option<DietaryPlaces>,
}
