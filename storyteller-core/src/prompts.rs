//! Prompt builders for every model call the pipeline makes.
//!
//! Each builder threads the region anchor and the response language in, so
//! the same pipeline serves any place and any supported locale. Only the
//! watercolor prompt is language-free: image models work best in English,
//! and the planning stage already produced an English scene description.

use crate::locale::Locale;

/// Search-grounded history lookup.
pub fn build_history_prompt(location: &str, region: &str, locale: Locale) -> String {
    let language = locale.language_name();
    format!(
        "Find verified historical facts about \"{location}\" in {region}. \
         Summarize the key historical events, origins, and cultural significance in {language}. \
         Focus on facts that can evoke emotions."
    )
}

/// Structured content plan from the gathered history.
pub fn build_plan_prompt(
    location: &str,
    emotion: &str,
    history: &str,
    region: &str,
    locale: Locale,
) -> String {
    let language = locale.language_name();
    format!(
        r#"You are a historical storytelling content planner for {region}.

[INPUTS]
Location: {location}
User's Emotion: {emotion}
Historical Context: {history}
Target Language: {language}

[TASK]
Create a cultural content plan that connects the history of this location with the user's current emotion.

[NANO BANANA STYLE GUIDE]
- Tone: Witty, Concise, Punchy, Trendy.
- Visuals: High contrast and bold colors in spirit, but rendered here as a watercolor scene description.
- Slogan: Must be short, impactful, and either touch the heart or make the user chuckle.

[REQUIREMENTS]
1. Propose a content title and content type (documentary, exhibition, webtoon, play, etc.) in {language}.
2. Write a plot synopsis linking the history and the emotion in {language}.
3. Write a consolation message that validates the user's emotion in {language}.
4. Write the posterSlogan in Nano Banana style in {language}.
5. Write the visualPrompt for an image generator. IMPORTANT: the visualPrompt MUST be written in ENGLISH regardless of the target language, and it should describe a beautiful watercolor painting scene.

Output strictly as JSON."#
    )
}

/// Watercolor rendering of the planned scene.
pub fn build_watercolor_prompt(visual_prompt: &str) -> String {
    format!(
        r#"Create a soft, artistic watercolor painting.
Style definition: Wet-on-wet technique, pastel tones, dreamy, emotional, hand-painted texture on paper.

Subject: {visual_prompt}

The image should evoke the feeling of memory and history."#
    )
}

/// Photorealistic landscape shot of the location itself.
pub fn build_landscape_prompt(location: &str, region: &str) -> String {
    format!(
        r#"Take a photorealistic, high-resolution travel photography shot of "{location}" in {region}.
It should look like a real photo taken by a professional photographer.
Daytime, clear weather, wide angle, capturing the essence of the location.
No text, no filters, just the pure scenery."#
    )
}

/// Search for places around the location.
pub fn build_nearby_search_prompt(location: &str, region: &str, locale: Locale) -> String {
    let language = locale.language_name();
    format!(
        r#"Find recommended places near "{location}" in {region}.
I need 3 of each:
1. Popular restaurants or cafes.
2. Accommodations (hotels, motels, guesthouses). Crucial: find the approximate price per night for these.
3. Other tourist attractions or things to do.

Return detailed information in {language}."#
    )
}

/// Turn nearby search results into the structured listing.
pub fn build_nearby_format_prompt(search_text: &str, locale: Locale) -> String {
    let language = locale.language_name();
    format!(
        r#"Extract nearby place information from the text below and format it as JSON.
Language: {language}.

[SOURCE TEXT]
{search_text}

[REQUIREMENTS]
- restaurants: 3 items
- accommodations: 3 items. Fill the price field whenever a price is mentioned (e.g., "approx. $50 per night"). If unknown, say so in {language}.
- attractions: 3 items"#
    )
}

/// Search for vegan, halal, and kosher options around the location.
pub fn build_dietary_search_prompt(location: &str, region: &str, locale: Locale) -> String {
    let language = locale.language_name();
    format!(
        r#"Find Vegan, Halal, and Kosher dining options near "{location}" in {region}.
Include both restaurants and grocery stores or marts.
If nothing matches the immediate area, find the closest options elsewhere in {region}.

Return detailed information in {language}."#
    )
}

/// Turn dietary search results into the structured listing.
pub fn build_dietary_format_prompt(search_text: &str, locale: Locale) -> String {
    let language = locale.language_name();
    format!(
        r#"Extract dietary place information from the text below and format it as JSON.
Language: {language}.

[SOURCE TEXT]
{search_text}

[REQUIREMENTS]
- vegan: Vegan restaurants or groceries found (max 3)
- halal: Halal restaurants or groceries found (max 3)
- kosher: Kosher restaurants or groceries found (max 3)
- Fill the url field with a website or map link when one is available.

If nothing was found for a category, return an empty array for it."#
    )
}
