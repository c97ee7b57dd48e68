use serde_json::{json, Map, Value as JsonValue};
use sha2::{Digest, Sha256};

use crate::models::{DifficultyLevel, EnhancementType, Notation};

/// Input document for an enrichment request; its hash keys the cache.
pub fn enrichment_input(
    notation: &Notation,
    enhancement_type: EnhancementType,
    difficulty_level: Option<DifficultyLevel>,
) -> JsonValue {
    let mut input = json!({
        "notation_data": notation.notation_json,
        "tempo": notation.tempo,
        "time_signature": notation.time_signature,
        "enhancement_type": enhancement_type.as_str(),
    });
    if let (Some(level), Some(map)) = (difficulty_level, input.as_object_mut()) {
        map.insert("difficulty_level".to_string(), json!(level.as_str()));
    }
    input
}

fn sort_keys(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), sort_keys(&map[key]));
            }
            JsonValue::Object(sorted)
        }
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Hex SHA-256 of the input serialized with sorted keys.
pub fn prompt_hash(input: &JsonValue) -> String {
    let canonical = sort_keys(input).to_string();
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn notation() -> Notation {
        let now = Utc::now();
        Notation {
            id: Uuid::new_v4(),
            video_id: Uuid::new_v4(),
            tempo: Some(120),
            time_signature: Some("4/4".to_string()),
            notation_json: json!({"timeline": [{"drum_type": "kick"}]}),
            model_version: None,
            confidence_score: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn hash_ignores_key_order() {
        let a = json!({"b": 1, "a": {"y": 2, "x": 3}});
        let b = json!({"a": {"x": 3, "y": 2}, "b": 1});
        assert_eq!(prompt_hash(&a), prompt_hash(&b));
        assert_eq!(prompt_hash(&a).len(), 64);
    }

    #[test]
    fn hash_depends_on_enhancement_type_and_difficulty() {
        let n = notation();
        let style = prompt_hash(&enrichment_input(&n, EnhancementType::StyleClassification, None));
        let full = prompt_hash(&enrichment_input(&n, EnhancementType::FullAnalysis, None));
        assert_ne!(style, full);

        let easy = enrichment_input(&n, EnhancementType::Variations, Some(DifficultyLevel::Beginner));
        let hard = enrichment_input(&n, EnhancementType::Variations, Some(DifficultyLevel::Expert));
        assert_eq!(easy["difficulty_level"], "beginner");
        assert_ne!(prompt_hash(&easy), prompt_hash(&hard));
    }

    #[test]
    fn same_input_same_hash() {
        let n = notation();
        let first = prompt_hash(&enrichment_input(&n, EnhancementType::FullAnalysis, None));
        let second = prompt_hash(&enrichment_input(&n, EnhancementType::FullAnalysis, None));
        assert_eq!(first, second);
    }
}
