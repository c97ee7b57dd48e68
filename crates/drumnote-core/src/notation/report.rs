use chrono::{DateTime, Utc};
use serde_json::{json, Value as JsonValue};

use crate::models::{Notation, NotationValidationError, NotationValidationReport};

const USUAL_TEMPO: std::ops::RangeInclusive<i32> = 60..=200;
const LOW_CONFIDENCE: f64 = 0.7;

fn is_empty_document(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Object(map) => map.is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Check a stored notation for problems a client should know about.
pub fn validate_notation(notation: &Notation) -> NotationValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut suggestions = Vec::new();

    if is_empty_document(&notation.notation_json) {
        errors.push(NotationValidationError {
            field: "notation_json".to_string(),
            message: "Notation data is empty".to_string(),
            value: None,
        });
    }

    if let Some(tempo) = notation.tempo {
        if !USUAL_TEMPO.contains(&tempo) {
            warnings.push(format!("Unusual tempo: {} BPM", tempo));
        }
    }

    if let Some(confidence) = notation.confidence_score {
        if confidence < LOW_CONFIDENCE {
            warnings.push(format!("Low confidence score: {}", confidence));
            suggestions.push("Consider re-analyzing the audio with better quality".to_string());
        }
    }

    NotationValidationReport {
        is_valid: errors.is_empty(),
        errors,
        warnings,
        suggestions,
    }
}

/// Timeline entries within `[start, end]`; either bound may be open.
pub fn filter_timeline(
    entries: Vec<JsonValue>,
    start: Option<f64>,
    end: Option<f64>,
) -> Vec<JsonValue> {
    entries
        .into_iter()
        .filter(|entry| {
            let t = entry
                .get("timestamp_seconds")
                .and_then(JsonValue::as_f64)
                .unwrap_or(0.0);
            start.map_or(true, |s| t >= s) && end.map_or(true, |e| t <= e)
        })
        .collect()
}

/// JSON export payload served as a file download.
pub fn export_document(notation: &Notation, now: DateTime<Utc>) -> JsonValue {
    json!({
        "notation_id": notation.id,
        "video_id": notation.video_id,
        "tempo": notation.tempo,
        "time_signature": notation.time_signature,
        "notation_data": notation.notation_json,
        "exported_at": now,
    })
}

pub fn export_filename(notation: &Notation) -> String {
    format!("notation_{}.json", notation.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn notation(json: JsonValue, tempo: Option<i32>, confidence: Option<f64>) -> Notation {
        let now = Utc::now();
        Notation {
            id: Uuid::new_v4(),
            video_id: Uuid::new_v4(),
            tempo,
            time_signature: Some("4/4".to_string()),
            notation_json: json,
            model_version: None,
            confidence_score: confidence,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn healthy_notation_is_valid() {
        let report = validate_notation(&notation(json!({"timeline": []}), Some(120), Some(0.9)));
        assert!(report.is_valid);
        assert!(report.warnings.is_empty());
        assert!(report.suggestions.is_empty());
    }

    #[test]
    fn empty_document_is_an_error() {
        let report = validate_notation(&notation(json!({}), None, None));
        assert!(!report.is_valid);
        assert_eq!(report.errors[0].field, "notation_json");
        assert_eq!(report.errors[0].message, "Notation data is empty");
    }

    #[test]
    fn unusual_tempo_and_low_confidence_warn() {
        let report = validate_notation(&notation(json!({"a": 1}), Some(240), Some(0.5)));
        assert!(report.is_valid);
        assert_eq!(
            report.warnings,
            vec![
                "Unusual tempo: 240 BPM".to_string(),
                "Low confidence score: 0.5".to_string()
            ]
        );
        assert_eq!(report.suggestions.len(), 1);
    }

    #[test]
    fn timeline_window() {
        let entries: Vec<JsonValue> = [0.0, 1.0, 2.0, 3.0]
            .iter()
            .map(|t| json!({"timestamp_seconds": t}))
            .collect();
        assert_eq!(filter_timeline(entries.clone(), Some(1.0), Some(2.0)).len(), 2);
        assert_eq!(filter_timeline(entries.clone(), None, Some(0.5)).len(), 1);
        assert_eq!(filter_timeline(entries, None, None).len(), 4);
    }

    #[test]
    fn export_wraps_document() {
        let n = notation(json!({"metadata": {}}), Some(100), None);
        let doc = export_document(&n, Utc::now());
        assert_eq!(doc["notation_id"], json!(n.id));
        assert_eq!(doc["tempo"], 100);
        assert_eq!(doc["notation_data"], json!({"metadata": {}}));
        assert_eq!(export_filename(&n), format!("notation_{}.json", n.id));
    }
}
