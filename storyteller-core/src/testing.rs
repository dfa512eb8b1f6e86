//! Testing utilities for the story pipeline.
//!
//! This module provides tools for integration testing:
//! - `ScriptedModel`, a deterministic backend that replays queued outcomes
//!   without network access
//! - Sample payload builders matching the structured-output schemas
//! - `script_successful_run` to queue one complete happy-path run

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::watch;

use crate::model::{GenerativeModel, ModelError};
use crate::pipeline::Progress;
use crate::story::EncodedImage;

type Scripted<T> = Result<T, String>;

/// A deterministic model that replays queued outcomes.
///
/// Each capability has its own queue, consumed in call order. An exhausted
/// queue fails the call with [`ModelError::Unavailable`], so a scenario
/// that makes more calls than it scripted fails loudly. Prompts are
/// recorded for assertions.
///
/// During the fan-out the pipeline requests the watercolor before the
/// landscape, so image outcomes are queued in that order.
#[derive(Default)]
pub struct ScriptedModel {
    searches: Mutex<VecDeque<Scripted<String>>>,
    structured: Mutex<VecDeque<Scripted<String>>>,
    images: Mutex<VecDeque<Scripted<Option<EncodedImage>>>>,
    search_prompts: Mutex<Vec<String>>,
    structured_prompts: Mutex<Vec<String>>,
    image_prompts: Mutex<Vec<String>>,
    progress_probe: Mutex<Option<watch::Receiver<Progress>>>,
    observed_progress: Mutex<Vec<Progress>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful search-text response.
    pub fn queue_search(&self, text: impl Into<String>) -> &Self {
        self.searches
            .lock()
            .expect("lock poisoned")
            .push_back(Ok(text.into()));
        self
    }

    /// Queue a failing search-text call.
    pub fn fail_search(&self, reason: impl Into<String>) -> &Self {
        self.searches
            .lock()
            .expect("lock poisoned")
            .push_back(Err(reason.into()));
        self
    }

    /// Queue a successful structured-output response.
    pub fn queue_structured(&self, json: impl Into<String>) -> &Self {
        self.structured
            .lock()
            .expect("lock poisoned")
            .push_back(Ok(json.into()));
        self
    }

    /// Queue a failing structured-output call.
    pub fn fail_structured(&self, reason: impl Into<String>) -> &Self {
        self.structured
            .lock()
            .expect("lock poisoned")
            .push_back(Err(reason.into()));
        self
    }

    /// Queue a successful image response.
    pub fn queue_image(&self, mime_type: &str, data: &str) -> &Self {
        self.images
            .lock()
            .expect("lock poisoned")
            .push_back(Ok(Some(EncodedImage::new(mime_type, data))));
        self
    }

    /// Queue an image call that succeeds but returns no image part.
    pub fn queue_no_image(&self) -> &Self {
        self.images.lock().expect("lock poisoned").push_back(Ok(None));
        self
    }

    /// Queue a failing image call.
    pub fn fail_image(&self, reason: impl Into<String>) -> &Self {
        self.images
            .lock()
            .expect("lock poisoned")
            .push_back(Err(reason.into()));
        self
    }

    /// Record the pipeline's progress state at every subsequent call.
    pub fn observe_progress(&self, receiver: watch::Receiver<Progress>) {
        *self.progress_probe.lock().expect("lock poisoned") = Some(receiver);
    }

    /// Progress states observed at each call, in call order.
    pub fn observed_progress(&self) -> Vec<Progress> {
        self.observed_progress.lock().expect("lock poisoned").clone()
    }

    /// Prompts passed to `search_text`, in call order.
    pub fn search_prompts(&self) -> Vec<String> {
        self.search_prompts.lock().expect("lock poisoned").clone()
    }

    /// Prompts passed to `structured_json`, in call order.
    pub fn structured_prompts(&self) -> Vec<String> {
        self.structured_prompts.lock().expect("lock poisoned").clone()
    }

    /// Prompts passed to `generate_image`, in call order.
    pub fn image_prompts(&self) -> Vec<String> {
        self.image_prompts.lock().expect("lock poisoned").clone()
    }

    fn record(&self, prompts: &Mutex<Vec<String>>, prompt: &str) {
        prompts
            .lock()
            .expect("lock poisoned")
            .push(prompt.to_string());
        let probe = self.progress_probe.lock().expect("lock poisoned");
        if let Some(receiver) = probe.as_ref() {
            self.observed_progress
                .lock()
                .expect("lock poisoned")
                .push(*receiver.borrow());
        }
    }

    fn next<T>(&self, queue: &Mutex<VecDeque<Scripted<T>>>, kind: &str) -> Result<T, ModelError> {
        match queue.lock().expect("lock poisoned").pop_front() {
            Some(Ok(value)) => Ok(value),
            Some(Err(reason)) => Err(ModelError::Unavailable(reason)),
            None => Err(ModelError::Unavailable(format!(
                "no scripted {kind} response left"
            ))),
        }
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn search_text(&self, prompt: &str) -> Result<String, ModelError> {
        self.record(&self.search_prompts, prompt);
        self.next(&self.searches, "search")
    }

    async fn structured_json(&self, prompt: &str, _schema: &Value) -> Result<String, ModelError> {
        self.record(&self.structured_prompts, prompt);
        self.next(&self.structured, "structured")
    }

    async fn generate_image(&self, prompt: &str) -> Result<Option<EncodedImage>, ModelError> {
        self.record(&self.image_prompts, prompt);
        self.next(&self.images, "image")
    }
}

/// A planning payload matching the story schema.
pub fn sample_story_json(location: &str, emotion: &str) -> String {
    json!({
        "location": location,
        "emotion": emotion,
        "history": "A hillside village rebuilt by refugees after the war.",
        "contentType": "Immersive Exhibition",
        "contentTitle": "Lanterns over the Hill",
        "targetAudience": "Families and travelers",
        "plot": "Visitors walk the alleys while projected memories light up each mural.",
        "effect": "Reconnects visitors with the village's resilience.",
        "consolationMessage": "The alleys remember, and so do you.",
        "posterSlogan": "Hills hold hope",
        "visualPrompt": "Pastel hillside houses at dusk with glowing paper lanterns"
    })
    .to_string()
}

/// A nearby-places payload with three entries per category.
pub fn sample_nearby_json() -> String {
    let entry = |name: &str, category: &str, price: Option<&str>| {
        json!({
            "name": name,
            "category": category,
            "description": format!("{name} is a short walk away."),
            "price": price,
        })
    };
    json!({
        "restaurants": [
            entry("Sujeong Dwaeji Gukbap", "Korean Restaurant", Some("~9,000 KRW")),
            entry("Alley Cat Cafe", "Cafe", None),
            entry("Harbor Grill", "Seafood Restaurant", Some("~25,000 KRW")),
        ],
        "accommodations": [
            entry("Hillside Guesthouse", "Guesthouse", Some("approx. $40 per night")),
            entry("Harbor View Hotel", "Hotel", Some("approx. $95 per night")),
            entry("Alley Stay", "Motel", Some("approx. $55 per night")),
        ],
        "attractions": [
            entry("Sky Garden Observatory", "Viewpoint", None),
            entry("Mural Alley", "Street Art", None),
            entry("Little Museum", "Museum", Some("2,000 KRW")),
        ],
    })
    .to_string()
}

/// A dietary payload with entries in every diet.
pub fn sample_dietary_json() -> String {
    json!({
        "vegan": [
            {
                "name": "Green Table",
                "category": "Vegan Restaurant",
                "description": "Seasonal vegetable plates.",
                "url": "https://maps.example.com/green-table"
            }
        ],
        "halal": [
            {
                "name": "Istanbul Kitchen",
                "category": "Halal Restaurant",
                "description": "Certified halal grill.",
                "price": "~12,000 KRW"
            },
            {
                "name": "Crescent Mart",
                "category": "Halal Mart",
                "description": "Groceries and spices.",
                "url": "https://crescent-mart.example.com"
            }
        ],
        "kosher": [],
    })
    .to_string()
}

/// A dietary payload where every diet came back empty.
pub fn empty_dietary_json() -> String {
    json!({ "vegan": [], "halal": [], "kosher": [] }).to_string()
}

/// Queue one complete, successful main run on `model`.
///
/// Scripts, in order: the history search, the story plan, the watercolor
/// and landscape images, and the nearby search plus extraction.
pub fn script_successful_run(model: &ScriptedModel, location: &str, emotion: &str) {
    model
        .queue_search(format!("{location} has a long and moving history."))
        .queue_structured(sample_story_json(location, emotion))
        .queue_image("image/png", "d2F0ZXJjb2xvcg==")
        .queue_image("image/jpeg", "bGFuZHNjYXBl")
        .queue_search("Restaurants, hotels, and sights near the village.")
        .queue_structured(sample_nearby_json());
}
