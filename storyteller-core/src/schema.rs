//! Response schemas for the structured-output stages.
//!
//! Gemini's structured output takes an OpenAPI-flavored schema with
//! uppercase type tags. These builders declare the three shapes the
//! pipeline parses back; field descriptions double as extraction hints
//! for the model.

use serde_json::{json, Value};

fn string_field(description: &str) -> Value {
    json!({ "type": "STRING", "description": description })
}

fn place_list(price_hint: &str) -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "name": { "type": "STRING" },
                "category": { "type": "STRING" },
                "description": { "type": "STRING" },
                "price": string_field(price_hint),
            },
            "required": ["name", "category", "description"],
        },
    })
}

/// Schema for the planning response, matching [`StoryContent`].
///
/// [`StoryContent`]: crate::story::StoryContent
pub fn story_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "location": { "type": "STRING" },
            "emotion": { "type": "STRING" },
            "history": string_field("Summarized historical facts used for the content."),
            "contentType": string_field("e.g., Documentary, Immersive Exhibition, Webtoon, Play"),
            "contentTitle": { "type": "STRING" },
            "targetAudience": { "type": "STRING" },
            "plot": string_field("Detailed content structure or plot summary."),
            "effect": string_field("Expected emotional or cultural effect."),
            "consolationMessage": string_field("A message validating the user's emotion, connected to the history."),
            "posterSlogan": string_field("Short, punchy, witty slogan in 'Nano Banana' style (under 20 chars)."),
            "visualPrompt": string_field("A detailed visual description to generate a watercolor painting. MUST BE IN ENGLISH."),
        },
        "required": [
            "location", "emotion", "history", "contentType", "contentTitle",
            "targetAudience", "plot", "effect", "consolationMessage",
            "posterSlogan", "visualPrompt",
        ],
    })
}

/// Schema for the nearby-places extraction, matching [`NearbyInfo`].
///
/// [`NearbyInfo`]: crate::story::NearbyInfo
pub fn nearby_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "restaurants": place_list("Price range or average price if available"),
            "accommodations": place_list("Price per night (approximate)"),
            "attractions": place_list("Ticket price if applicable"),
        },
        "required": ["restaurants", "accommodations", "attractions"],
    })
}

/// Schema for the dietary-places extraction, matching [`DietaryPlaces`].
///
/// [`DietaryPlaces`]: crate::story::DietaryPlaces
pub fn dietary_schema() -> Value {
    let diet_list = json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "name": { "type": "STRING" },
                "category": string_field("e.g., Vegan Restaurant, Halal Mart, Kosher Grocery"),
                "description": { "type": "STRING" },
                "price": { "type": "STRING" },
                "url": string_field("Website or map link if available"),
            },
            "required": ["name", "category", "description"],
        },
    });

    json!({
        "type": "OBJECT",
        "properties": {
            "vegan": diet_list,
            "halal": diet_list,
            "kosher": diet_list,
        },
        "required": ["vegan", "halal", "kosher"],
    })
}
