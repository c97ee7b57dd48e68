//! Plain-text pattern descriptions fed into the chat prompts.

use std::collections::BTreeMap;
use std::fmt::Write;

use drumnote_core::models::Notation;
use serde_json::Value as JsonValue;

const DEFAULT_TEMPO: f64 = 120.0;
const DEFAULT_TIME_SIGNATURE: &str = "4/4";
const DEFAULT_VELOCITY: f64 = 0.5;

/// One hit read back from a notation timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternEvent {
    pub drum_type: String,
    pub timestamp: f64,
    pub velocity: f64,
}

impl PatternEvent {
    fn from_timeline_entry(entry: &JsonValue) -> Option<Self> {
        let drum_type = entry.get("drum_type")?.as_str()?.to_string();
        Some(Self {
            drum_type,
            timestamp: entry
                .get("timestamp_seconds")
                .and_then(JsonValue::as_f64)
                .unwrap_or(0.0),
            velocity: entry
                .get("velocity")
                .and_then(JsonValue::as_f64)
                .unwrap_or(DEFAULT_VELOCITY),
        })
    }
}

/// Everything the prompts need to know about a notation.
#[derive(Debug, Clone)]
pub struct PatternContext {
    pub events: Vec<PatternEvent>,
    pub tempo: f64,
    pub time_signature: String,
    pub duration_seconds: f64,
    pub complexity: Option<f64>,
}

impl PatternContext {
    pub fn from_notation(notation: &Notation) -> Self {
        let events = notation
            .timeline()
            .iter()
            .filter_map(PatternEvent::from_timeline_entry)
            .collect();

        let tempo = notation
            .tempo
            .map(f64::from)
            .or_else(|| {
                notation
                    .notation_json
                    .pointer("/musical_structure/tempo_bpm")
                    .and_then(JsonValue::as_f64)
            })
            .unwrap_or(DEFAULT_TEMPO);

        Self {
            events,
            tempo,
            time_signature: notation
                .time_signature
                .clone()
                .unwrap_or_else(|| DEFAULT_TIME_SIGNATURE.to_string()),
            duration_seconds: notation.total_duration_seconds(),
            complexity: notation
                .notation_json
                .pointer("/musical_structure/complexity/overall_complexity")
                .and_then(JsonValue::as_f64),
        }
    }

    fn drum_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for event in &self.events {
            *counts.entry(event.drum_type.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Tempo, density and hit distribution for the analysis prompt.
    pub fn summary(&self) -> String {
        if self.events.is_empty() {
            return "No drum events detected".to_string();
        }

        let total = self.events.len();
        let events_per_second = total as f64 / self.duration_seconds.max(1.0);

        let mut summary = format!(
            "Tempo: {:.1} BPM\nTime Signature: {}\nDuration: {:.1} seconds\nTotal Events: {}\nEvents per second: {:.2}\n\nDrum distribution:\n",
            self.tempo, self.time_signature, self.duration_seconds, total, events_per_second
        );
        for (drum_type, count) in self.drum_counts() {
            let percentage = count as f64 / total as f64 * 100.0;
            let _ = writeln!(summary, "- {}: {} hits ({:.1}%)", drum_type, count, percentage);
        }
        summary
    }

    /// Hits grouped by whole second, e.g. `At 1s: kick(0.90), hihat_closed(0.40)`.
    pub fn description(&self) -> String {
        if self.events.is_empty() {
            return "Empty drum pattern".to_string();
        }

        let mut lines = vec![
            format!("Tempo: {:.1} BPM", self.tempo),
            format!("Pattern with {} drum hits:", self.events.len()),
        ];

        let mut segments: BTreeMap<i64, Vec<&PatternEvent>> = BTreeMap::new();
        for event in &self.events {
            segments
                .entry(event.timestamp.floor() as i64)
                .or_default()
                .push(event);
        }
        for (second, events) in segments {
            let hits: Vec<String> = events
                .iter()
                .map(|e| format!("{}({:.2})", e.drum_type, e.velocity))
                .collect();
            lines.push(format!("At {}s: {}", second, hits.join(", ")));
        }

        lines.join("\n")
    }

    /// Tempo band, dynamics and kit usage for style classification.
    pub fn characteristics(&self) -> String {
        if self.events.is_empty() {
            return "No pattern to analyze".to_string();
        }

        let tempo_band = match self.tempo {
            t if t < 70.0 => "Slow tempo (ballad/slow song)",
            t if t < 100.0 => "Moderate tempo",
            t if t < 140.0 => "Medium-fast tempo",
            t if t < 180.0 => "Fast tempo",
            _ => "Very fast tempo",
        };
        let avg_velocity =
            self.events.iter().map(|e| e.velocity).sum::<f64>() / self.events.len() as f64;

        [
            format!("Tempo: {:.1} BPM", self.tempo),
            tempo_band.to_string(),
            format!("Average hit velocity: {:.2}", avg_velocity),
            format!("Uses {} different drum types", self.drum_counts().len()),
        ]
        .join("\n")
    }

    /// Difficulty label derived from the stored complexity score.
    pub fn difficulty_assessment(&self) -> &'static str {
        match self.complexity {
            Some(score) if score >= 0.66 => "advanced",
            Some(score) if score >= 0.33 => "intermediate",
            Some(_) => "beginner",
            None => "intermediate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn notation(notation_json: JsonValue, tempo: Option<i32>) -> Notation {
        let now = Utc::now();
        Notation {
            id: Uuid::new_v4(),
            video_id: Uuid::new_v4(),
            tempo,
            time_signature: None,
            notation_json,
            model_version: None,
            confidence_score: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn groove() -> Notation {
        notation(
            json!({
                "musical_structure": {"tempo_bpm": 96.0, "complexity": {"overall_complexity": 0.7}},
                "timeline": [
                    {"drum_type": "kick", "timestamp_seconds": 0.0, "velocity": 0.9},
                    {"drum_type": "hihat_closed", "timestamp_seconds": 0.25, "velocity": 0.4},
                    {"drum_type": "snare", "timestamp_seconds": 1.0, "velocity": 0.8},
                    {"drum_type": "kick", "timestamp_seconds": 1.5},
                    {"timestamp_seconds": 1.7}
                ],
                "metadata": {"total_duration_seconds": 2.0}
            }),
            None,
        )
    }

    #[test]
    fn context_reads_timeline_and_structure() {
        let ctx = PatternContext::from_notation(&groove());
        assert_eq!(ctx.events.len(), 4);
        assert_eq!(ctx.events[3].velocity, 0.5);
        assert_eq!(ctx.tempo, 96.0);
        assert_eq!(ctx.time_signature, "4/4");
        assert_eq!(ctx.duration_seconds, 2.0);
        assert_eq!(ctx.difficulty_assessment(), "advanced");
    }

    #[test]
    fn tempo_column_wins_over_document() {
        let mut n = groove();
        n.tempo = Some(140);
        assert_eq!(PatternContext::from_notation(&n).tempo, 140.0);

        let bare = notation(json!({}), None);
        let ctx = PatternContext::from_notation(&bare);
        assert_eq!(ctx.tempo, 120.0);
        assert_eq!(ctx.difficulty_assessment(), "intermediate");
    }

    #[test]
    fn summary_lists_distribution() {
        let summary = PatternContext::from_notation(&groove()).summary();
        assert!(summary.contains("Tempo: 96.0 BPM"));
        assert!(summary.contains("Total Events: 4"));
        assert!(summary.contains("Events per second: 2.00"));
        assert!(summary.contains("- kick: 2 hits (50.0%)"));
        assert!(summary.contains("- snare: 1 hits (25.0%)"));
    }

    #[test]
    fn description_groups_by_second() {
        let description = PatternContext::from_notation(&groove()).description();
        assert!(description.contains("Pattern with 4 drum hits:"));
        assert!(description.contains("At 0s: kick(0.90), hihat_closed(0.40)"));
        assert!(description.contains("At 1s: snare(0.80), kick(0.50)"));
    }

    #[test]
    fn characteristics_band_tempo() {
        let text = PatternContext::from_notation(&groove()).characteristics();
        assert!(text.contains("Moderate tempo"));
        assert!(text.contains("Uses 3 different drum types"));
        assert!(text.contains("Average hit velocity: 0.65"));
    }

    #[test]
    fn empty_pattern_texts() {
        let ctx = PatternContext::from_notation(&notation(json!({"timeline": []}), Some(100)));
        assert_eq!(ctx.summary(), "No drum events detected");
        assert_eq!(ctx.description(), "Empty drum pattern");
        assert_eq!(ctx.characteristics(), "No pattern to analyze");
    }
}
