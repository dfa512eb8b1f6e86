//! Scenario tests for the story pipeline over a scripted backend.
//!
//! These tests verify the staged flow end to end without network access:
//! - Stage ordering and progress reporting
//! - Fatal versus degraded versus isolated failure handling
//! - Prompt routing (what feeds each model call)
//! - The dietary follow-up contract
//!
//! Run with: `cargo test -p storyteller-core --test pipeline_flow`

use std::sync::Arc;

use storyteller_core::pipeline::LookupError;
use storyteller_core::testing::{
    empty_dietary_json, sample_dietary_json, sample_nearby_json, sample_story_json,
    script_successful_run, ScriptedModel,
};
use storyteller_core::{
    DietaryOutcome, Locale, Progress, SessionConfig, StorySession, Storyteller, StorytellerError,
};

fn session_over(model: &Arc<ScriptedModel>, locale: Locale) -> StorySession {
    StorySession::with_model(model.clone(), SessionConfig::new().with_locale(locale))
}

// =============================================================================
// MAIN PIPELINE
// =============================================================================

#[tokio::test]
async fn test_full_run_populates_every_slot() {
    let model = Arc::new(ScriptedModel::new());
    script_successful_run(&model, "Gamcheon Culture Village", "nostalgia");

    let storyteller = Storyteller::new(model.clone());
    let result = storyteller
        .run("Gamcheon Culture Village", "nostalgia", Locale::En)
        .await
        .expect("scripted run should succeed");

    assert_eq!(result.content.location, "Gamcheon Culture Village");
    assert_eq!(result.content.emotion, "nostalgia");
    assert_eq!(result.content.content_title, "Lanterns over the Hill");

    let watercolor = result.watercolor.expect("watercolor slot");
    assert_eq!(watercolor.mime_type, "image/png");
    let landscape = result.landscape.expect("landscape slot");
    assert_eq!(landscape.mime_type, "image/jpeg");

    let nearby = result.nearby.expect("nearby slot");
    assert_eq!(nearby.restaurants.len(), 3);
    assert_eq!(nearby.accommodations.len(), 3);
    assert_eq!(nearby.attractions.len(), 3);

    // Dietary is never part of the main run.
    assert!(result.dietary.is_none());
    assert_eq!(storyteller.progress(), Progress::Complete);
}

#[tokio::test]
async fn test_progress_observed_at_each_stage() {
    let model = Arc::new(ScriptedModel::new());
    script_successful_run(&model, "Haeundae Beach", "joy");

    let storyteller = Storyteller::new(model.clone());
    assert_eq!(storyteller.progress(), Progress::Idle);
    model.observe_progress(storyteller.subscribe_progress());

    storyteller
        .run("Haeundae Beach", "joy", Locale::En)
        .await
        .expect("scripted run should succeed");

    // One history search, one plan, then four fan-out calls.
    let observed = model.observed_progress();
    assert_eq!(observed.len(), 6);
    assert_eq!(observed[0], Progress::Researching);
    assert_eq!(observed[1], Progress::Planning);
    assert!(observed[2..].iter().all(|s| *s == Progress::Scouting));
}

#[tokio::test]
async fn test_empty_inputs_are_rejected_before_any_call() {
    let model = Arc::new(ScriptedModel::new());
    let storyteller = Storyteller::new(model.clone());

    let err = storyteller.run("  ", "joy", Locale::En).await.unwrap_err();
    assert!(matches!(err, StorytellerError::EmptyInput));

    let err = storyteller.run("Haeundae", "", Locale::En).await.unwrap_err();
    assert!(matches!(err, StorytellerError::EmptyInput));

    assert!(model.search_prompts().is_empty());
    assert_eq!(storyteller.progress(), Progress::Idle);
}

#[tokio::test]
async fn test_research_failure_aborts_run() {
    let model = Arc::new(ScriptedModel::new());
    model.fail_search("search backend down");

    let storyteller = Storyteller::new(model.clone());
    let err = storyteller
        .run("Yongdusan Park", "wonder", Locale::En)
        .await
        .unwrap_err();

    assert!(matches!(err, StorytellerError::Research(_)));
    assert_eq!(storyteller.progress(), Progress::Error);

    // Nothing past the research stage ran.
    assert!(model.structured_prompts().is_empty());
    assert!(model.image_prompts().is_empty());
}

#[tokio::test]
async fn test_failed_run_can_be_retried() {
    let model = Arc::new(ScriptedModel::new());
    model.fail_search("transient outage");
    script_successful_run(&model, "Gamcheon", "nostalgia");

    let storyteller = Storyteller::new(model.clone());
    let err = storyteller
        .run("Gamcheon", "nostalgia", Locale::En)
        .await
        .unwrap_err();
    assert!(matches!(err, StorytellerError::Research(_)));
    assert_eq!(storyteller.progress(), Progress::Error);

    // The error state does not wedge the pipeline; the next run starts over.
    let result = storyteller
        .run("Gamcheon", "nostalgia", Locale::En)
        .await
        .expect("second run should succeed");
    assert_eq!(result.content.location, "Gamcheon");
    assert_eq!(storyteller.progress(), Progress::Complete);
}

#[tokio::test]
async fn test_empty_research_uses_fallback_sentence() {
    let model = Arc::new(ScriptedModel::new());
    model
        .queue_search("   ")
        .queue_structured(sample_story_json("Obscure Alley", "calm"))
        .queue_image("image/png", "YQ==")
        .queue_image("image/png", "Yg==")
        .queue_search("nothing of note nearby")
        .queue_structured(sample_nearby_json());

    let storyteller = Storyteller::new(model.clone());
    storyteller
        .run("Obscure Alley", "calm", Locale::En)
        .await
        .expect("run should still succeed");

    let plan_prompt = &model.structured_prompts()[0];
    assert!(plan_prompt.contains("Could not find specific historical records"));
}

#[tokio::test]
async fn test_malformed_plan_aborts_run() {
    let model = Arc::new(ScriptedModel::new());
    model
        .queue_search("plenty of history")
        .queue_structured("this is not json");

    let storyteller = Storyteller::new(model.clone());
    let err = storyteller
        .run("Taejongdae", "awe", Locale::En)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StorytellerError::Planning(LookupError::Shape(_))
    ));
    assert_eq!(storyteller.progress(), Progress::Error);
    assert!(model.image_prompts().is_empty());
}

#[tokio::test]
async fn test_plan_wrapped_in_markdown_fences_still_parses() {
    let model = Arc::new(ScriptedModel::new());
    model
        .queue_search("history text")
        .queue_structured(format!(
            "```json\n{}\n```",
            sample_story_json("Jagalchi Market", "hunger")
        ))
        .queue_image("image/png", "YQ==")
        .queue_image("image/png", "Yg==")
        .queue_search("markets and stalls")
        .queue_structured(sample_nearby_json());

    let storyteller = Storyteller::new(model.clone());
    let result = storyteller
        .run("Jagalchi Market", "hunger", Locale::En)
        .await
        .expect("fenced JSON should parse");

    assert_eq!(result.content.location, "Jagalchi Market");
}

// =============================================================================
// FAN-OUT DEGRADATION
// =============================================================================

#[tokio::test]
async fn test_watercolor_failure_degrades_only_its_slot() {
    let model = Arc::new(ScriptedModel::new());
    model
        .queue_search("history")
        .queue_structured(sample_story_json("Gamcheon", "nostalgia"))
        .fail_image("image model overloaded")
        .queue_image("image/jpeg", "bGFuZHNjYXBl")
        .queue_search("places nearby")
        .queue_structured(sample_nearby_json());

    let storyteller = Storyteller::new(model.clone());
    let result = storyteller
        .run("Gamcheon", "nostalgia", Locale::En)
        .await
        .expect("run should succeed despite image failure");

    assert!(result.watercolor.is_none());
    assert!(result.landscape.is_some());
    assert!(result.nearby.is_some());
    assert_eq!(storyteller.progress(), Progress::Complete);
}

#[tokio::test]
async fn test_missing_image_part_degrades_like_a_failure() {
    let model = Arc::new(ScriptedModel::new());
    model
        .queue_search("history")
        .queue_structured(sample_story_json("Gamcheon", "nostalgia"))
        .queue_image("image/png", "d2M=")
        .queue_no_image()
        .queue_search("places nearby")
        .queue_structured(sample_nearby_json());

    let storyteller = Storyteller::new(model.clone());
    let result = storyteller
        .run("Gamcheon", "nostalgia", Locale::En)
        .await
        .expect("run should succeed");

    assert!(result.watercolor.is_some());
    assert!(result.landscape.is_none());
}

#[tokio::test]
async fn test_nearby_failure_leaves_images_intact() {
    let model = Arc::new(ScriptedModel::new());
    model
        .queue_search("history")
        .queue_structured(sample_story_json("Gamcheon", "nostalgia"))
        .queue_image("image/png", "d2M=")
        .queue_image("image/jpeg", "bHM=")
        .fail_search("search quota exhausted");

    let storyteller = Storyteller::new(model.clone());
    let result = storyteller
        .run("Gamcheon", "nostalgia", Locale::En)
        .await
        .expect("run should succeed despite nearby failure");

    assert!(result.nearby.is_none());
    assert!(result.watercolor.is_some());
    assert!(result.landscape.is_some());
}

#[tokio::test]
async fn test_malformed_nearby_extraction_degrades_slot() {
    let model = Arc::new(ScriptedModel::new());
    model
        .queue_search("history")
        .queue_structured(sample_story_json("Gamcheon", "nostalgia"))
        .queue_image("image/png", "d2M=")
        .queue_image("image/jpeg", "bHM=")
        .queue_search("found some places")
        .queue_structured("{\"restaurants\": \"oops\"}");

    let storyteller = Storyteller::new(model.clone());
    let result = storyteller
        .run("Gamcheon", "nostalgia", Locale::En)
        .await
        .expect("run should succeed");

    assert!(result.nearby.is_none());
}

#[tokio::test]
async fn test_all_fan_out_slots_can_degrade_together() {
    let model = Arc::new(ScriptedModel::new());
    model
        .queue_search("history")
        .queue_structured(sample_story_json("Gamcheon", "nostalgia"))
        .fail_image("down")
        .fail_image("down")
        .fail_search("down");

    let storyteller = Storyteller::new(model.clone());
    let result = storyteller
        .run("Gamcheon", "nostalgia", Locale::En)
        .await
        .expect("content alone is still a success");

    assert!(result.watercolor.is_none());
    assert!(result.landscape.is_none());
    assert!(result.nearby.is_none());
    assert_eq!(result.content.emotion, "nostalgia");
    assert_eq!(storyteller.progress(), Progress::Complete);
}

// =============================================================================
// PROMPT ROUTING
// =============================================================================

#[tokio::test]
async fn test_visual_prompt_feeds_watercolor_and_location_feeds_landscape() {
    let model = Arc::new(ScriptedModel::new());
    script_successful_run(&model, "Gamcheon Culture Village", "nostalgia");

    let storyteller = Storyteller::new(model.clone());
    storyteller
        .run("Gamcheon Culture Village", "nostalgia", Locale::En)
        .await
        .expect("scripted run should succeed");

    let image_prompts = model.image_prompts();
    assert_eq!(image_prompts.len(), 2);
    // The watercolor renders the planned scene, not the raw location.
    assert!(image_prompts[0].contains("Pastel hillside houses at dusk"));
    assert!(image_prompts[0].contains("watercolor"));
    // The landscape shoots the location itself.
    assert!(image_prompts[1].contains("\"Gamcheon Culture Village\""));
    assert!(image_prompts[1].contains("photorealistic"));
}

#[tokio::test]
async fn test_locale_threads_into_every_text_prompt() {
    let model = Arc::new(ScriptedModel::new());
    script_successful_run(&model, "Beomeosa Temple", "serenity");

    let storyteller = Storyteller::new(model.clone());
    storyteller
        .run("Beomeosa Temple", "serenity", Locale::Ko)
        .await
        .expect("scripted run should succeed");

    for prompt in model.search_prompts() {
        assert!(prompt.contains("Korean"), "missing language in: {prompt}");
    }
    for prompt in model.structured_prompts() {
        assert!(prompt.contains("Korean"), "missing language in: {prompt}");
    }
}

#[tokio::test]
async fn test_nearby_extraction_receives_search_findings() {
    let model = Arc::new(ScriptedModel::new());
    model
        .queue_search("history")
        .queue_structured(sample_story_json("Gamcheon", "nostalgia"))
        .queue_image("image/png", "d2M=")
        .queue_image("image/jpeg", "bHM=")
        .queue_search("THE-SEARCH-FINDINGS-MARKER")
        .queue_structured(sample_nearby_json());

    let storyteller = Storyteller::new(model.clone());
    storyteller
        .run("Gamcheon", "nostalgia", Locale::En)
        .await
        .expect("scripted run should succeed");

    let format_prompt = &model.structured_prompts()[1];
    assert!(format_prompt.contains("THE-SEARCH-FINDINGS-MARKER"));
}

#[tokio::test]
async fn test_place_cap_is_enforced_on_oversized_extraction() {
    let overfull = serde_json::json!({
        "restaurants": (0..5).map(|i| serde_json::json!({
            "name": format!("r{i}"), "category": "Cafe", "description": "d"
        })).collect::<Vec<_>>(),
        "accommodations": [],
        "attractions": [],
    })
    .to_string();

    let model = Arc::new(ScriptedModel::new());
    model
        .queue_search("history")
        .queue_structured(sample_story_json("Gamcheon", "nostalgia"))
        .queue_image("image/png", "d2M=")
        .queue_image("image/jpeg", "bHM=")
        .queue_search("many places")
        .queue_structured(overfull);

    let storyteller = Storyteller::new(model.clone());
    let result = storyteller
        .run("Gamcheon", "nostalgia", Locale::En)
        .await
        .expect("scripted run should succeed");

    let nearby = result.nearby.expect("nearby slot");
    assert_eq!(nearby.restaurants.len(), 3);
    assert_eq!(nearby.restaurants[0].name, "r0");
    assert_eq!(nearby.restaurants[2].name, "r2");
}

// =============================================================================
// SESSION AND THE DIETARY FOLLOW-UP
// =============================================================================

#[tokio::test]
async fn test_dietary_before_any_run_is_a_noop() {
    let model = Arc::new(ScriptedModel::new());
    let mut session = session_over(&model, Locale::En);

    let outcome = session.load_dietary().await;
    assert_eq!(outcome, DietaryOutcome::NotReady);
    assert!(session.result().is_none());
    assert!(model.search_prompts().is_empty());
}

#[tokio::test]
async fn test_dietary_success_attaches_places() {
    let model = Arc::new(ScriptedModel::new());
    script_successful_run(&model, "Seomyeon", "curiosity");
    model
        .queue_search("several vegan and halal spots")
        .queue_structured(sample_dietary_json());

    let mut session = session_over(&model, Locale::En);
    session
        .generate("Seomyeon", "curiosity")
        .await
        .expect("scripted run should succeed");

    let outcome = session.load_dietary().await;
    assert_eq!(outcome, DietaryOutcome::Loaded);

    let dietary = session.result().unwrap().dietary.as_ref().unwrap();
    assert_eq!(dietary.vegan.len(), 1);
    assert_eq!(dietary.halal.len(), 2);
    assert!(dietary.kosher.is_empty());
    assert_eq!(
        dietary.vegan[0].url.as_deref(),
        Some("https://maps.example.com/green-table")
    );
    assert_eq!(dietary.halal[0].price.as_deref(), Some("~12,000 KRW"));
    assert_eq!(session.progress(), Progress::Complete);
}

#[tokio::test]
async fn test_dietary_failure_leaves_result_untouched() {
    let model = Arc::new(ScriptedModel::new());
    script_successful_run(&model, "Seomyeon", "curiosity");
    model.fail_search("dietary search down");

    let mut session = session_over(&model, Locale::En);
    session
        .generate("Seomyeon", "curiosity")
        .await
        .expect("scripted run should succeed");
    model.observe_progress(session.subscribe_progress());

    let outcome = session.load_dietary().await;
    assert_eq!(outcome, DietaryOutcome::Failed);

    let result = session.result().expect("result must survive");
    assert!(result.dietary.is_none());
    assert!(result.nearby.is_some());
    assert_eq!(session.progress(), Progress::Complete);

    // The failed lookup still passed through the loading state.
    assert_eq!(model.observed_progress(), vec![Progress::DietaryLoading]);
}

#[tokio::test]
async fn test_dietary_all_empty_still_counts_as_loaded() {
    let model = Arc::new(ScriptedModel::new());
    script_successful_run(&model, "Seomyeon", "curiosity");
    model
        .queue_search("")
        .queue_structured(empty_dietary_json());

    let mut session = session_over(&model, Locale::En);
    session
        .generate("Seomyeon", "curiosity")
        .await
        .expect("scripted run should succeed");

    let outcome = session.load_dietary().await;
    assert_eq!(outcome, DietaryOutcome::Loaded);

    let dietary = session.result().unwrap().dietary.as_ref().unwrap();
    assert!(dietary.is_empty());

    // Empty search text was replaced by the fallback before extraction.
    let last_format = model.structured_prompts().pop().unwrap();
    assert!(last_format.contains("No specific dietary places found."));
}

#[tokio::test]
async fn test_dietary_cap_is_enforced_on_oversized_extraction() {
    let overfull = serde_json::json!({
        "vegan": (0..5).map(|i| serde_json::json!({
            "name": format!("v{i}"), "category": "Vegan Restaurant", "description": "d"
        })).collect::<Vec<_>>(),
        "halal": [],
        "kosher": [],
    })
    .to_string();

    let model = Arc::new(ScriptedModel::new());
    script_successful_run(&model, "Seomyeon", "curiosity");
    model.queue_search("many vegan spots").queue_structured(overfull);

    let mut session = session_over(&model, Locale::En);
    session
        .generate("Seomyeon", "curiosity")
        .await
        .expect("scripted run should succeed");

    let outcome = session.load_dietary().await;
    assert_eq!(outcome, DietaryOutcome::Loaded);

    let dietary = session.result().unwrap().dietary.as_ref().unwrap();
    assert_eq!(dietary.vegan.len(), 3);
    assert_eq!(dietary.vegan[0].name, "v0");
    assert_eq!(dietary.vegan[2].name, "v2");
    assert!(dietary.halal.is_empty());
}

#[tokio::test]
async fn test_dietary_uses_location_echoed_by_the_plan() {
    let model = Arc::new(ScriptedModel::new());
    model
        .queue_search("history")
        .queue_structured(sample_story_json("Gamcheon Culture Village", "nostalgia"))
        .queue_image("image/png", "d2M=")
        .queue_image("image/jpeg", "bHM=")
        .queue_search("places")
        .queue_structured(sample_nearby_json())
        .queue_search("dietary findings")
        .queue_structured(sample_dietary_json());

    // The user typed a rougher name; the plan echoed the canonical one.
    let mut session = session_over(&model, Locale::En);
    session
        .generate("gamcheon village", "nostalgia")
        .await
        .expect("scripted run should succeed");
    session.load_dietary().await;

    let dietary_search = &model.search_prompts()[2];
    assert!(dietary_search.contains("\"Gamcheon Culture Village\""));
}

#[tokio::test]
async fn test_failed_generate_clears_previous_result() {
    let model = Arc::new(ScriptedModel::new());
    script_successful_run(&model, "Gamcheon", "nostalgia");
    model.fail_search("backend down");

    let mut session = session_over(&model, Locale::En);
    session
        .generate("Gamcheon", "nostalgia")
        .await
        .expect("first run should succeed");
    assert!(session.result().is_some());

    let err = session.generate("Haeundae", "joy").await.unwrap_err();
    assert!(err.to_string().contains("history research failed"));
    assert!(session.result().is_none());
    assert_eq!(session.progress(), Progress::Error);
}

#[tokio::test]
async fn test_reset_returns_session_to_idle() {
    let model = Arc::new(ScriptedModel::new());
    script_successful_run(&model, "Gamcheon", "nostalgia");

    let mut session = session_over(&model, Locale::En);
    session
        .generate("Gamcheon", "nostalgia")
        .await
        .expect("scripted run should succeed");
    assert_eq!(session.progress(), Progress::Complete);

    session.reset();
    assert!(session.result().is_none());
    assert_eq!(session.progress(), Progress::Idle);
}

#[tokio::test]
async fn test_save_writes_result_json() {
    let model = Arc::new(ScriptedModel::new());
    script_successful_run(&model, "Gamcheon", "nostalgia");

    let mut session = session_over(&model, Locale::En);
    session
        .generate("Gamcheon", "nostalgia")
        .await
        .expect("scripted run should succeed");

    let path = std::env::temp_dir().join(format!("storyteller-save-{}.json", std::process::id()));
    session.save(&path).await.expect("save should succeed");

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved["content"]["posterSlogan"], "Hills hold hope");
    assert_eq!(saved["watercolor"]["mime_type"], "image/png");
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn test_save_without_result_is_an_error() {
    let model = Arc::new(ScriptedModel::new());
    let session = session_over(&model, Locale::En);

    let err = session.save("/tmp/should-not-exist.json").await.unwrap_err();
    assert!(err.to_string().contains("no story result"));
}
