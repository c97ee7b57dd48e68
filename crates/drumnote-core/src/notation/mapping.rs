use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

/// Where an instrument sits on a percussion staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DrumMapping {
    pub staff_position: &'static str,
    pub note_head: &'static str,
    pub line: i32,
}

const fn mapping(staff_position: &'static str, note_head: &'static str, line: i32) -> DrumMapping {
    DrumMapping {
        staff_position,
        note_head,
        line,
    }
}

pub const DRUM_MAPPINGS: [(&str, DrumMapping); 10] = [
    ("kick", mapping("F4", "normal", 1)),
    ("snare", mapping("D5", "normal", 3)),
    ("hihat_closed", mapping("F#5", "x", 4)),
    ("hihat_open", mapping("A5", "o", 5)),
    ("crash", mapping("A5", "x", 5)),
    ("ride", mapping("F#5", "x", 4)),
    ("tom1", mapping("B4", "normal", 2)),
    ("tom2", mapping("G4", "normal", 2)),
    ("floor_tom", mapping("D4", "normal", 0)),
    ("cowbell", mapping("G5", "triangle", 4)),
];

pub const UNKNOWN_DRUM: DrumMapping = mapping("C5", "normal", 3);

/// Staff mapping for an instrument name; unknown instruments land on C5.
pub fn drum_mapping(instrument: &str) -> DrumMapping {
    let key = instrument.trim().to_lowercase();
    DRUM_MAPPINGS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, m)| *m)
        .unwrap_or(UNKNOWN_DRUM)
}

/// The full mapping table as embedded in notation documents.
pub fn drum_mapping_table() -> JsonValue {
    let mut table = Map::new();
    for (name, m) in DRUM_MAPPINGS {
        table.insert(
            name.to_string(),
            serde_json::json!({
                "staff_position": m.staff_position,
                "note_head": m.note_head,
                "line": m.line,
            }),
        );
    }
    JsonValue::Object(table)
}
