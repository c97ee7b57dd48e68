use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::notation::check_notation_bounds;
use crate::validation::{parse_time_signature, validate_tempo, validate_unit_interval};
use crate::AppError;

/// Stored notation: one JSON document per video plus a few queryable columns.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Notation {
    pub id: Uuid,
    pub video_id: Uuid,
    pub tempo: Option<i32>,
    pub time_signature: Option<String>,
    #[schema(value_type = Object)]
    pub notation_json: JsonValue,
    pub model_version: Option<String>,
    pub confidence_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Notation {
    /// Timeline entries from the stored document, empty when absent.
    pub fn timeline(&self) -> Vec<JsonValue> {
        self.notation_json
            .get("timeline")
            .and_then(JsonValue::as_array)
            .cloned()
            .unwrap_or_default()
    }

    pub fn measures(&self) -> Vec<JsonValue> {
        self.notation_json
            .get("measures")
            .and_then(JsonValue::as_array)
            .cloned()
            .unwrap_or_default()
    }

    pub fn metadata(&self) -> JsonValue {
        self.notation_json
            .get("metadata")
            .cloned()
            .unwrap_or_else(|| JsonValue::Object(Default::default()))
    }

    pub fn total_duration_seconds(&self) -> f64 {
        self.notation_json
            .pointer("/metadata/total_duration_seconds")
            .and_then(JsonValue::as_f64)
            .unwrap_or(0.0)
    }
}

fn validate_optional_fields(
    tempo: Option<i32>,
    time_signature: Option<&str>,
    confidence_score: Option<f64>,
) -> Result<(), AppError> {
    if let Some(t) = tempo {
        validate_tempo(t)?;
    }
    if let Some(ts) = time_signature {
        parse_time_signature(ts)?;
    }
    if let Some(c) = confidence_score {
        validate_unit_interval("confidence_score", c)?;
    }
    Ok(())
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NotationCreate {
    pub video_id: Uuid,
    #[serde(default)]
    pub tempo: Option<i32>,
    #[serde(default)]
    pub time_signature: Option<String>,
    #[schema(value_type = Object)]
    pub notation_json: JsonValue,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub confidence_score: Option<f64>,
}

impl NotationCreate {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_optional_fields(
            self.tempo,
            self.time_signature.as_deref(),
            self.confidence_score,
        )
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct NotationUpdate {
    #[serde(default)]
    pub tempo: Option<i32>,
    #[serde(default)]
    pub time_signature: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub notation_json: Option<JsonValue>,
}

impl NotationUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_optional_fields(self.tempo, self.time_signature.as_deref(), None)
    }
}

/// A detected drum hit supplied by an external detector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct DrumEvent {
    pub time_seconds: f64,
    pub instrument: String,
    #[serde(default)]
    pub velocity: Option<f64>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NotationFromEvents {
    pub video_id: Uuid,
    pub events: Vec<DrumEvent>,
    #[serde(default)]
    pub tempo: Option<i32>,
    #[serde(default = "default_time_signature")]
    pub time_signature: String,
    #[serde(default = "default_quantization")]
    pub quantization_level: String,
    #[serde(default)]
    pub model_version: Option<String>,
}

fn default_time_signature() -> String {
    "4/4".to_string()
}

fn default_quantization() -> String {
    "sixteenth".to_string()
}

impl NotationFromEvents {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.events.is_empty() {
            return Err(AppError::BadRequest(
                "No drum events provided for notation".to_string(),
            ));
        }
        validate_optional_fields(self.tempo, Some(&self.time_signature), None)?;
        for (i, event) in self.events.iter().enumerate() {
            if !event.time_seconds.is_finite() || event.time_seconds < 0.0 {
                return Err(AppError::InvalidInput(format!(
                    "events[{}].time_seconds must be a non-negative number",
                    i
                )));
            }
            if event.instrument.trim().is_empty() {
                return Err(AppError::InvalidInput(format!(
                    "events[{}].instrument must not be empty",
                    i
                )));
            }
            if let Some(v) = event.velocity {
                validate_unit_interval(&format!("events[{}].velocity", i), v)?;
            }
            if let Some(c) = event.confidence {
                validate_unit_interval(&format!("events[{}].confidence", i), c)?;
            }
        }
        check_notation_bounds(&self.events)
    }

    /// Mean detector confidence, when any event carries one.
    pub fn mean_confidence(&self) -> Option<f64> {
        let values: Vec<f64> = self.events.iter().filter_map(|e| e.confidence).collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotationListQuery {
    pub video_id: Option<Uuid>,
    pub tempo_min: Option<i32>,
    pub tempo_max: Option<i32>,
    pub time_signature: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl NotationListQuery {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 100;

    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(limit) = self.limit {
            if !(1..=Self::MAX_LIMIT).contains(&limit) {
                return Err(AppError::InvalidInput(format!(
                    "limit must be between 1 and {}",
                    Self::MAX_LIMIT
                )));
            }
        }
        if self.offset.is_some_and(|o| o < 0) {
            return Err(AppError::InvalidInput("offset must be >= 0".to_string()));
        }
        if self.tempo_min.is_some_and(|t| t <= 0) || self.tempo_max.is_some_and(|t| t <= 0) {
            return Err(AppError::InvalidInput(
                "tempo filters must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotationList {
    pub notations: Vec<Notation>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

impl NotationList {
    pub fn new(notations: Vec<Notation>, total: i64, limit: i64, offset: i64) -> Self {
        let has_more = offset + (notations.len() as i64) < total;
        Self {
            notations,
            total,
            limit,
            offset,
            has_more,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotationDetail {
    pub id: Uuid,
    pub video_id: Uuid,
    pub tempo: Option<i32>,
    pub time_signature: Option<String>,
    #[schema(value_type = Vec<Object>)]
    pub measures: Vec<JsonValue>,
    #[schema(value_type = Object)]
    pub metadata: JsonValue,
    pub confidence_score: Option<f64>,
    pub model_version: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Notation> for NotationDetail {
    fn from(n: Notation) -> Self {
        Self {
            measures: n.measures(),
            metadata: n.metadata(),
            id: n.id,
            video_id: n.video_id,
            tempo: n.tempo,
            time_signature: n.time_signature,
            confidence_score: n.confidence_score,
            model_version: n.model_version,
            created_at: n.created_at,
            updated_at: n.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TimelineQuery {
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default = "default_export_format")]
    pub format_type: String,
}

fn default_export_format() -> String {
    "json".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    MusicXml,
    Midi,
}

impl std::str::FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ExportFormat::Json),
            "musicxml" => Ok(ExportFormat::MusicXml),
            "midi" => Ok(ExportFormat::Midi),
            other => Err(AppError::InvalidInput(format!(
                "Invalid export format '{}'. Must be one of: musicxml, midi, json",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
pub struct NotationValidationError {
    pub field: String,
    pub message: String,
    #[schema(value_type = Option<Object>)]
    pub value: Option<JsonValue>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct NotationValidationReport {
    pub is_valid: bool,
    pub errors: Vec<NotationValidationError>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TimeSignatureCount {
    pub time_signature: String,
    pub count: i64,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct ConfidenceDistribution {
    pub high: i64,
    pub medium: i64,
    pub low: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotationStats {
    pub total_notations: i64,
    pub total_events: i64,
    pub avg_tempo: Option<f64>,
    pub common_time_signatures: Vec<TimeSignatureCount>,
    pub instruments_detected: Vec<String>,
    pub confidence_distribution: ConfidenceDistribution,
}
