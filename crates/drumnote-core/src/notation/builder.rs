//! Notation document builder
//!
//! Turns already-detected drum events into the JSON document stored in
//! `notations.notation_json`: a musical structure summary, a sorted timeline,
//! measures subdivided into beats, and the staff mapping used.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;

use super::mapping::{drum_mapping, drum_mapping_table};
use super::tempo::{estimate_tempo, quantization_grid};
use crate::models::DrumEvent;
use crate::validation::parse_time_signature;
use crate::AppError;

pub const DEFAULT_VELOCITY: f64 = 0.5;
pub const ACCENT_THRESHOLD: f64 = 0.8;
pub const GHOST_THRESHOLD: f64 = 0.3;
const DEFAULT_BEATS_PER_MEASURE: u32 = 4;

/// Latest event time accepted on a notation timeline, one hour.
pub const MAX_NOTATION_DURATION_SECS: f64 = 3600.0;
pub const MAX_NOTATION_EVENTS: usize = 20_000;

#[derive(Debug, Clone)]
pub struct NotationOptions {
    /// Fixed tempo; estimated from the events when absent.
    pub tempo: Option<i32>,
    pub time_signature: String,
    pub quantization_level: String,
}

impl Default for NotationOptions {
    fn default() -> Self {
        Self {
            tempo: None,
            time_signature: "4/4".to_string(),
            quantization_level: "sixteenth".to_string(),
        }
    }
}

/// Result of a build: the columns stored next to the document, and the document.
#[derive(Debug, Clone)]
pub struct BuiltNotation {
    pub tempo: i32,
    pub time_signature: String,
    pub notation_json: JsonValue,
}

#[derive(Debug, Clone, Serialize)]
pub struct Quantization {
    pub level: String,
    pub grid: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Complexity {
    pub overall_complexity: f64,
    pub note_density: f64,
    pub instrument_variety: usize,
    pub velocity_variance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MusicalStructure {
    pub tempo_bpm: f64,
    pub time_signature: String,
    pub beats_per_measure: u32,
    pub total_measures: u32,
    pub duration_seconds: f64,
    pub quantization: Quantization,
    pub complexity: Complexity,
    pub instruments_detected: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineEntry {
    pub timestamp_seconds: f64,
    pub drum_type: String,
    pub velocity: f64,
    pub measure_number: u32,
    pub beat_number: f64,
    /// Beat position snapped to the quantization grid.
    pub quantized_beat: f64,
    pub staff_position: &'static str,
    pub note_head_type: &'static str,
    pub accent: Option<&'static str>,
    pub ghost_note: bool,
    pub confidence_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Note {
    pub drum_type: String,
    pub staff_position: &'static str,
    pub note_duration: &'static str,
    pub note_head_type: &'static str,
    pub velocity: f64,
    pub accent: Option<&'static str>,
    pub ghost_note: bool,
    pub confidence_score: Option<f64>,
    pub timestamp_seconds: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Beat {
    pub beat_number: u32,
    pub start_time_seconds: f64,
    pub end_time_seconds: f64,
    pub notes: Vec<Note>,
    pub note_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Measure {
    pub measure_number: u32,
    pub start_time_seconds: f64,
    pub end_time_seconds: f64,
    pub time_signature: String,
    pub tempo_bpm: f64,
    pub beats: Vec<Beat>,
    pub complexity_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotationMetadata {
    pub total_duration_seconds: f64,
    pub total_measures: u32,
    pub total_events: usize,
    pub quantization_level: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotationDocument {
    pub musical_structure: MusicalStructure,
    pub timeline: Vec<TimelineEntry>,
    pub measures: Vec<Measure>,
    pub drum_mapping: JsonValue,
    pub metadata: NotationMetadata,
    pub exports: Vec<JsonValue>,
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn velocity_of(event: &DrumEvent) -> f64 {
    event.velocity.unwrap_or(DEFAULT_VELOCITY)
}

fn velocity_variance(velocities: &[f64]) -> f64 {
    if velocities.is_empty() {
        return 0.0;
    }
    velocities
        .iter()
        .map(|v| (v - DEFAULT_VELOCITY).powi(2))
        .sum::<f64>()
        / velocities.len() as f64
}

fn accent_for(velocity: f64) -> Option<&'static str> {
    (velocity > ACCENT_THRESHOLD).then_some("accent")
}

fn measure_complexity(events: &[&DrumEvent]) -> f64 {
    let velocities: Vec<f64> = events.iter().map(|e| velocity_of(e)).collect();
    let instruments: BTreeSet<&str> = events.iter().map(|e| e.instrument.as_str()).collect();
    let density = (events.len() as f64 / 16.0).min(1.0);
    let dynamics = (velocity_variance(&velocities) * 4.0).min(1.0);
    let variety = (instruments.len() as f64 / 5.0).min(1.0);
    round_to((density + dynamics + variety) / 3.0, 3)
}

fn note_for(event: &DrumEvent) -> Note {
    let mapping = drum_mapping(&event.instrument);
    let velocity = velocity_of(event);
    Note {
        drum_type: event.instrument.clone(),
        staff_position: mapping.staff_position,
        note_duration: "quarter",
        note_head_type: mapping.note_head,
        velocity,
        accent: accent_for(velocity),
        ghost_note: velocity < GHOST_THRESHOLD,
        confidence_score: event.confidence,
        timestamp_seconds: event.time_seconds,
    }
}

/// Reject event lists the builder would have to lay out over an unbounded timeline.
pub fn check_notation_bounds(events: &[DrumEvent]) -> Result<(), AppError> {
    if events.len() > MAX_NOTATION_EVENTS {
        return Err(AppError::BadRequest(format!(
            "Too many drum events: {} (max {})",
            events.len(),
            MAX_NOTATION_EVENTS
        )));
    }
    if let Some(i) = events
        .iter()
        .position(|e| !(0.0..=MAX_NOTATION_DURATION_SECS).contains(&e.time_seconds))
    {
        return Err(AppError::BadRequest(format!(
            "events[{}].time_seconds must be between 0 and {} seconds",
            i, MAX_NOTATION_DURATION_SECS
        )));
    }
    Ok(())
}

/// Build a notation document from detected events.
///
/// Measures run from zero to the last event inclusive: an event exactly on a
/// measure boundary opens a new measure, so `total_measures` is
/// `floor(duration / seconds_per_measure) + 1`.
pub fn build_notation(
    events: &[DrumEvent],
    options: &NotationOptions,
    now: DateTime<Utc>,
) -> Result<BuiltNotation, AppError> {
    if events.is_empty() {
        return Err(AppError::BadRequest(
            "No drum events provided for notation".to_string(),
        ));
    }
    check_notation_bounds(events)?;

    let beats_per_measure = parse_time_signature(&options.time_signature)
        .map(|(beats, _)| beats)
        .unwrap_or(DEFAULT_BEATS_PER_MEASURE);

    let mut sorted: Vec<DrumEvent> = events.to_vec();
    sorted.sort_by(|a, b| a.time_seconds.total_cmp(&b.time_seconds));

    let tempo_bpm = match options.tempo {
        Some(t) if t > 0 => t as f64,
        _ => {
            let times: Vec<f64> = sorted.iter().map(|e| e.time_seconds).collect();
            estimate_tempo(&times)
        }
    };
    let seconds_per_beat = 60.0 / tempo_bpm;
    let seconds_per_measure = seconds_per_beat * beats_per_measure as f64;
    let grid = quantization_grid(&options.quantization_level);

    let duration = sorted.last().map(|e| e.time_seconds).unwrap_or(0.0);
    let total_measures = (duration / seconds_per_measure).floor() as u32 + 1;

    let timeline: Vec<TimelineEntry> = sorted
        .iter()
        .map(|event| {
            let mapping = drum_mapping(&event.instrument);
            let velocity = velocity_of(event);
            let beat_offset = (event.time_seconds % seconds_per_measure) / seconds_per_beat;
            TimelineEntry {
                timestamp_seconds: event.time_seconds,
                drum_type: event.instrument.clone(),
                velocity,
                measure_number: (event.time_seconds / seconds_per_measure).floor() as u32 + 1,
                beat_number: round_to(beat_offset + 1.0, 3),
                quantized_beat: round_to((beat_offset / grid).round() * grid + 1.0, 3),
                staff_position: mapping.staff_position,
                note_head_type: mapping.note_head,
                accent: accent_for(velocity),
                ghost_note: velocity < GHOST_THRESHOLD,
                confidence_score: event.confidence,
            }
        })
        .collect();

    // Events are sorted, so each measure takes a contiguous run of them.
    let mut measures: Vec<Measure> = Vec::with_capacity(total_measures as usize);
    let mut cursor = 0;
    for index in 0..total_measures {
        let start = index as f64 * seconds_per_measure;
        let end = start + seconds_per_measure;
        let first = cursor;
        while cursor < sorted.len()
            && (sorted[cursor].time_seconds < end || index + 1 == total_measures)
        {
            cursor += 1;
        }
        let in_measure: Vec<&DrumEvent> = sorted[first..cursor].iter().collect();

        let beats = (0..beats_per_measure)
            .map(|b| {
                let beat_start = start + b as f64 * seconds_per_beat;
                let beat_end = beat_start + seconds_per_beat;
                let notes: Vec<Note> = in_measure
                    .iter()
                    .filter(|e| e.time_seconds >= beat_start && e.time_seconds < beat_end)
                    .map(|e| note_for(e))
                    .collect();
                Beat {
                    beat_number: b + 1,
                    start_time_seconds: round_to(beat_start, 3),
                    end_time_seconds: round_to(beat_end, 3),
                    note_count: notes.len(),
                    notes,
                }
            })
            .collect();

        measures.push(Measure {
            measure_number: index + 1,
            start_time_seconds: round_to(start, 3),
            end_time_seconds: round_to(end, 3),
            time_signature: options.time_signature.clone(),
            tempo_bpm: round_to(tempo_bpm, 2),
            beats,
            complexity_score: measure_complexity(&in_measure),
        });
    }

    let instruments: BTreeSet<String> = sorted.iter().map(|e| e.instrument.clone()).collect();
    let velocities: Vec<f64> = sorted.iter().map(velocity_of).collect();
    let variance = velocity_variance(&velocities);
    let note_density = if duration > 0.0 {
        sorted.len() as f64 / duration
    } else {
        0.0
    };
    let overall = ((note_density / 10.0).min(1.0)
        + (instruments.len() as f64 / 8.0).min(1.0)
        + (variance * 4.0).min(1.0))
        / 3.0;

    let document = NotationDocument {
        musical_structure: MusicalStructure {
            tempo_bpm: round_to(tempo_bpm, 2),
            time_signature: options.time_signature.clone(),
            beats_per_measure,
            total_measures,
            duration_seconds: duration,
            quantization: Quantization {
                level: options.quantization_level.clone(),
                grid,
            },
            complexity: Complexity {
                overall_complexity: round_to(overall, 3),
                note_density: round_to(note_density, 3),
                instrument_variety: instruments.len(),
                velocity_variance: round_to(variance, 3),
            },
            instruments_detected: instruments.into_iter().collect(),
        },
        timeline,
        measures,
        drum_mapping: drum_mapping_table(),
        metadata: NotationMetadata {
            total_duration_seconds: duration,
            total_measures,
            total_events: sorted.len(),
            quantization_level: options.quantization_level.clone(),
            generated_at: now,
        },
        exports: Vec::new(),
    };

    Ok(BuiltNotation {
        tempo: tempo_bpm as i32,
        time_signature: options.time_signature.clone(),
        notation_json: serde_json::to_value(&document)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(t: f64, instrument: &str, velocity: Option<f64>) -> DrumEvent {
        DrumEvent {
            time_seconds: t,
            instrument: instrument.to_string(),
            velocity,
            confidence: Some(0.9),
        }
    }

    fn rock_beat() -> Vec<DrumEvent> {
        vec![
            ev(1.0, "snare", Some(0.9)),
            ev(0.0, "kick", Some(0.7)),
            ev(0.5, "hihat_closed", Some(0.2)),
            ev(1.5, "hihat_closed", None),
            ev(2.0, "kick", Some(0.7)),
        ]
    }

    fn fixed_tempo(tempo: i32) -> NotationOptions {
        NotationOptions {
            tempo: Some(tempo),
            ..Default::default()
        }
    }

    #[test]
    fn empty_events_are_rejected() {
        let err = build_notation(&[], &NotationOptions::default(), Utc::now()).unwrap_err();
        assert!(err.to_string().contains("No drum events provided"));
    }

    #[test]
    fn timeline_is_sorted_and_positioned() {
        let built = build_notation(&rock_beat(), &fixed_tempo(120), Utc::now()).unwrap();
        let timeline = built.notation_json["timeline"].as_array().unwrap();
        let times: Vec<f64> = timeline
            .iter()
            .map(|e| e["timestamp_seconds"].as_f64().unwrap())
            .collect();
        assert_eq!(times, vec![0.0, 0.5, 1.0, 1.5, 2.0]);

        // 120 BPM in 4/4: 0.5s per beat, 2s per measure
        let last = &timeline[4];
        assert_eq!(last["measure_number"], 2);
        assert_eq!(last["beat_number"], 1.0);
        let snare = &timeline[2];
        assert_eq!(snare["beat_number"], 3.0);
        assert_eq!(snare["staff_position"], "D5");
        assert_eq!(snare["accent"], "accent");
        assert_eq!(timeline[1]["ghost_note"], true);
        assert_eq!(timeline[1]["note_head_type"], "x");
        assert_eq!(timeline[3]["velocity"], DEFAULT_VELOCITY);
        assert!(timeline[3]["accent"].is_null());
    }

    #[test]
    fn measures_hold_beats_and_notes() {
        let built = build_notation(&rock_beat(), &fixed_tempo(120), Utc::now()).unwrap();
        let doc = &built.notation_json;
        assert_eq!(doc["musical_structure"]["total_measures"], 2);
        assert_eq!(doc["metadata"]["total_measures"], 2);
        assert_eq!(doc["metadata"]["total_events"], 5);

        let measures = doc["measures"].as_array().unwrap();
        assert_eq!(measures.len(), 2);
        let beats = measures[0]["beats"].as_array().unwrap();
        assert_eq!(beats.len(), 4);
        for beat in beats {
            assert_eq!(beat["note_count"], 1);
            assert_eq!(beat["notes"][0]["note_duration"], "quarter");
        }
        assert_eq!(measures[1]["beats"][0]["notes"][0]["drum_type"], "kick");
        assert_eq!(measures[1]["beats"][1]["note_count"], 0);
    }

    #[test]
    fn measure_complexity_formula() {
        let e1 = ev(0.0, "kick", Some(1.0));
        let e2 = ev(0.5, "snare", Some(0.0));
        // n=2 -> 0.125, var=0.25 -> 1.0, 2 instruments -> 0.4
        let score = measure_complexity(&[&e1, &e2]);
        assert_eq!(score, round_to((0.125 + 1.0 + 0.4) / 3.0, 3));
        assert_eq!(measure_complexity(&[]), 0.0);
    }

    #[test]
    fn overall_complexity_and_instruments() {
        let built = build_notation(&rock_beat(), &fixed_tempo(120), Utc::now()).unwrap();
        let structure = &built.notation_json["musical_structure"];
        assert_eq!(
            structure["instruments_detected"],
            serde_json::json!(["hihat_closed", "kick", "snare"])
        );
        let complexity = &structure["complexity"];
        assert_eq!(complexity["note_density"], 2.5);
        assert_eq!(complexity["instrument_variety"], 3);
        // variances: 0.04, 0.16, 0.09, 0, 0.04 -> mean 0.066
        assert_eq!(complexity["velocity_variance"], 0.066);
        let expected = round_to((0.25 + 3.0 / 8.0 + 0.264) / 3.0, 3);
        assert_eq!(complexity["overall_complexity"], expected);
    }

    #[test]
    fn tempo_is_estimated_when_absent() {
        let built = build_notation(&rock_beat(), &NotationOptions::default(), Utc::now()).unwrap();
        assert_eq!(built.tempo, 120);
        assert_eq!(built.notation_json["musical_structure"]["tempo_bpm"], 120.0);
    }

    #[test]
    fn single_event_at_zero_has_no_density() {
        let built = build_notation(
            &[ev(0.0, "crash", Some(0.95))],
            &NotationOptions::default(),
            Utc::now(),
        )
        .unwrap();
        let structure = &built.notation_json["musical_structure"];
        assert_eq!(structure["complexity"]["note_density"], 0.0);
        assert_eq!(structure["total_measures"], 1);
        assert_eq!(built.tempo, 120);
    }

    #[test]
    fn time_signature_and_quantization_are_honoured() {
        let options = NotationOptions {
            tempo: Some(60),
            time_signature: "3/4".to_string(),
            quantization_level: "eighth".to_string(),
        };
        let events = vec![ev(0.0, "kick", None), ev(3.2, "snare", None)];
        let built = build_notation(&events, &options, Utc::now()).unwrap();
        let doc = &built.notation_json;
        assert_eq!(doc["musical_structure"]["beats_per_measure"], 3);
        assert_eq!(doc["musical_structure"]["quantization"]["grid"], 0.5);
        assert_eq!(doc["measures"][0]["beats"].as_array().unwrap().len(), 3);
        // 3.2s at 60 BPM in 3/4 is measure 2, beat offset 0.2
        let snare = &doc["timeline"][1];
        assert_eq!(snare["measure_number"], 2);
        assert_eq!(snare["beat_number"], 1.2);
        assert_eq!(snare["quantized_beat"], 1.0);
        assert_eq!(doc["exports"], serde_json::json!([]));
    }

    #[test]
    fn event_on_measure_boundary_opens_next_measure() {
        // 120 BPM in 4/4: measures are 2s long
        let events = vec![ev(0.0, "kick", None), ev(4.0, "snare", None)];
        let built = build_notation(&events, &fixed_tempo(120), Utc::now()).unwrap();
        let doc = &built.notation_json;
        assert_eq!(doc["musical_structure"]["total_measures"], 3);
        let measures = doc["measures"].as_array().unwrap();
        assert_eq!(measures[1]["complexity_score"], 0.0);
        assert_eq!(measures[2]["beats"][0]["notes"][0]["drum_type"], "snare");
        assert_eq!(doc["timeline"][1]["measure_number"], 3);
    }

    #[test]
    fn events_past_the_duration_cap_are_rejected() {
        let events = vec![
            ev(0.0, "kick", None),
            ev(MAX_NOTATION_DURATION_SECS + 1.0, "snare", None),
        ];
        let err = build_notation(&events, &fixed_tempo(300), Utc::now()).unwrap_err();
        assert!(err.to_string().contains("events[1].time_seconds"));

        let at_cap = vec![ev(MAX_NOTATION_DURATION_SECS, "kick", None)];
        assert!(check_notation_bounds(&at_cap).is_ok());
    }

    #[test]
    fn too_many_events_are_rejected() {
        let events: Vec<DrumEvent> = (0..=MAX_NOTATION_EVENTS)
            .map(|i| ev(i as f64 * 0.01, "hihat_closed", None))
            .collect();
        let err = check_notation_bounds(&events).unwrap_err();
        assert!(err.to_string().contains("Too many drum events"));
    }
}
