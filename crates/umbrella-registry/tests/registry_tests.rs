//! Integration tests for the schema registry and validator.
//!
//! Feed realistic stage outputs through `parse_stage_result` for every
//! registered stage and check what comes out the other side.

use serde_json::{json, Value};
use umbrella_core::{Modality, StageIndex, StageKey};
use umbrella_registry::{parse_stage_result, validate, SchemaRegistry, StageResult};

fn registry() -> SchemaRegistry {
    SchemaRegistry::standard().expect("standard registry verifies")
}

fn metrics(labels: &[&str], score: f64) -> Value {
    Value::Array(
        labels
            .iter()
            .map(|label| json!({ "name": label, "value": score, "description": "not present" }))
            .collect(),
    )
}

fn review_output(key: StageKey, is_safe: bool) -> Value {
    let schema = registry().schema(key);
    let labels: Vec<&str> = schema.categories.iter().map(|c| c.label).collect();
    let mut output = json!({
        "isSafe": is_safe,
        "reason": "reviewed",
        "metrics": metrics(&labels, if is_safe { 0.0 } else { 0.9 }),
        "confidenceScore": 0.8,
        "recommendedAction": if is_safe { "Approve" } else { "Remove" }
    });
    if key == StageKey::VoiceReview {
        output["transcription"] = json!("hello and welcome to the show");
    }
    output
}

// =============================================================================
// Registry shape
// =============================================================================

#[test]
fn test_every_modality_has_a_complete_plan() {
    let registry = registry();
    for modality in Modality::ALL {
        let plan = registry.plan(modality);
        assert_eq!(plan.len(), modality.stages().len(), "{modality}");
        let last = plan.last().unwrap();
        assert!(last.key.is_final());
        assert!(last.is_verdict_shaped(), "{} is not verdict shaped", last.key);
    }
}

#[test]
fn test_schema_for_matches_plan() {
    let registry = registry();
    let first = registry
        .schema_for(Modality::Image, StageIndex::First)
        .unwrap();
    let second = registry
        .schema_for(Modality::Image, StageIndex::Second)
        .unwrap();
    assert_eq!(first.key, StageKey::ImageDescription);
    assert_eq!(second.key, StageKey::ImageReview);
}

#[test]
fn test_review_stages_share_stage_one_categories_where_expected() {
    let registry = registry();
    let voice_one: Vec<_> = registry
        .schema(StageKey::VoiceTranscription)
        .category_keys()
        .collect();
    let voice_two: Vec<_> = registry.schema(StageKey::VoiceReview).category_keys().collect();
    assert_eq!(voice_one, voice_two);

    let image_review: Vec<_> = registry
        .schema(StageKey::ImageReview)
        .categories
        .iter()
        .map(|c| c.label)
        .collect();
    assert_eq!(
        image_review,
        [
            "Violence/Gore",
            "Sexual Content",
            "Hate Speech",
            "Harassment",
            "Self-Harm",
            "Illegal Activity"
        ]
    );
}

// =============================================================================
// Parsing
// =============================================================================

#[test]
fn test_final_stages_parse_into_judgements() {
    let registry = registry();
    for key in [
        StageKey::TextModeration,
        StageKey::ImageReview,
        StageKey::VoiceReview,
        StageKey::DeepfakeReview,
    ] {
        let result = parse_stage_result(registry.schema(key), review_output(key, false)).unwrap();
        let judgement = result.judgement().expect("verdict stage");
        assert!(!judgement.is_safe);
        assert_eq!(judgement.recommended_action, "Remove");
        assert_eq!(result.key(), key);
    }
}

#[test]
fn test_voice_review_requires_transcription() {
    let registry = registry();
    let schema = registry.schema(StageKey::VoiceReview);
    let mut output = review_output(StageKey::VoiceReview, true);
    output.as_object_mut().unwrap().remove("transcription");
    assert_eq!(validate(schema, &output).unwrap_err().field, "transcription");
}

#[test]
fn test_deepfake_indicators_parse() {
    let registry = registry();
    let output = json!({
        "mediaType": "video",
        "technicalAnalysis": "Lighting on the face does not match the background",
        "detectedArtifacts": ["edge blending around jawline"],
        "manipulationIndicators": {
            "facialInconsistencies": 0.7,
            "audioVisualMismatch": 0.4,
            "unnaturalMovements": 0.5,
            "textureArtifacts": 0.6,
            "backgroundInconsistencies": 0.2,
            "metadataManipulation": 0.1
        },
        "overallDeepfakeScore": 0.65
    });
    let result =
        parse_stage_result(registry.schema(StageKey::DeepfakeIndicators), output).unwrap();
    match result {
        StageResult::DeepfakeIndicators(indicators) => {
            assert_eq!(indicators.media_type, "video");
            assert_eq!(indicators.manipulation_indicators.facial_inconsistencies, 0.7);
            assert_eq!(indicators.detected_artifacts.len(), 1);
        }
        other => panic!("unexpected variant: {:?}", other.key()),
    }
}

#[test]
fn test_deepfake_score_out_of_range() {
    let registry = registry();
    let output = json!({
        "mediaType": "image",
        "technicalAnalysis": "n/a",
        "detectedArtifacts": [],
        "manipulationIndicators": {
            "facialInconsistencies": 0.0,
            "audioVisualMismatch": 0.0,
            "unnaturalMovements": 0.0,
            "textureArtifacts": 0.0,
            "backgroundInconsistencies": 0.0,
            "metadataManipulation": 0.0
        },
        "overallDeepfakeScore": -0.1
    });
    let violation =
        parse_stage_result(registry.schema(StageKey::DeepfakeIndicators), output).unwrap_err();
    assert_eq!(violation.field, "overallDeepfakeScore");
}

#[test]
fn test_extra_top_level_fields_are_ignored() {
    let registry = registry();
    let mut output = review_output(StageKey::ImageReview, true);
    output["notes"] = json!("the model felt chatty");
    assert!(parse_stage_result(registry.schema(StageKey::ImageReview), output).is_ok());
}

#[test]
fn test_undeclared_transcription_of_any_type_is_ignored() {
    let registry = registry();
    let schema = registry.schema(StageKey::ImageReview);
    let mut output = review_output(StageKey::ImageReview, true);
    output["transcription"] = json!(["not", "applicable"]);
    assert_eq!(validate(schema, &output), Ok(()));

    let result = parse_stage_result(schema, output).unwrap();
    assert_eq!(result.judgement().unwrap().transcription, None);

    let mut output = review_output(StageKey::TextModeration, false);
    output["transcription"] = json!(42);
    let result = parse_stage_result(registry.schema(StageKey::TextModeration), output).unwrap();
    assert!(!result.to_pretty_json().unwrap().contains("transcription"));
}

#[test]
fn test_declared_transcription_is_kept() {
    let registry = registry();
    let result = parse_stage_result(
        registry.schema(StageKey::VoiceReview),
        review_output(StageKey::VoiceReview, true),
    )
    .unwrap();
    assert_eq!(
        result.judgement().unwrap().transcription.as_deref(),
        Some("hello and welcome to the show")
    );
}

#[test]
fn test_pretty_json_uses_wire_names() {
    let registry = registry();
    let result = parse_stage_result(
        registry.schema(StageKey::TextModeration),
        review_output(StageKey::TextModeration, true),
    )
    .unwrap();
    let pretty = result.to_pretty_json().unwrap();
    assert!(pretty.starts_with("{\n  \"isSafe\": true"));
    assert!(pretty.contains("\"recommendedAction\""));
    assert!(!pretty.contains("transcription"));
}
