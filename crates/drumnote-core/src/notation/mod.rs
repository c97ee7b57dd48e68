//! Pure notation functions: building documents from drum events, reports,
//! exports and the enrichment cache key.

mod builder;
mod cache_key;
mod mapping;
mod report;
mod tempo;

pub use builder::{
    build_notation, check_notation_bounds, BuiltNotation, NotationOptions, MAX_NOTATION_DURATION_SECS,
    MAX_NOTATION_EVENTS,
};
pub use cache_key::{enrichment_input, prompt_hash};
pub use mapping::{drum_mapping, drum_mapping_table, DrumMapping, DRUM_MAPPINGS, UNKNOWN_DRUM};
pub use report::{export_document, export_filename, filter_timeline, validate_notation};
pub use tempo::{estimate_tempo, quantization_grid, DEFAULT_TEMPO_BPM};
