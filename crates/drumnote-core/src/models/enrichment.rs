use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use uuid::Uuid;

use super::notation::Notation;

/// Cached LLM output for one `(notation_id, prompt_hash)` pair.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Enrichment {
    pub id: Uuid,
    pub notation_id: Uuid,
    pub prompt_hash: String,
    pub enhancement_type: String,
    pub model: String,
    #[schema(value_type = Object)]
    pub input_json: JsonValue,
    #[schema(value_type = Object)]
    pub output_json: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementType {
    #[default]
    FullAnalysis,
    PatternAnalysis,
    StyleClassification,
    PracticeInstructions,
    Variations,
}

impl EnhancementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnhancementType::FullAnalysis => "full_analysis",
            EnhancementType::PatternAnalysis => "pattern_analysis",
            EnhancementType::StyleClassification => "style_classification",
            EnhancementType::PracticeInstructions => "practice_instructions",
            EnhancementType::Variations => "variations",
        }
    }

    pub fn includes_pattern_analysis(&self) -> bool {
        matches!(
            self,
            EnhancementType::FullAnalysis | EnhancementType::PatternAnalysis
        )
    }

    pub fn includes_style_classification(&self) -> bool {
        matches!(
            self,
            EnhancementType::FullAnalysis | EnhancementType::StyleClassification
        )
    }

    pub fn includes_practice_instructions(&self) -> bool {
        matches!(
            self,
            EnhancementType::FullAnalysis | EnhancementType::PracticeInstructions
        )
    }
}

impl Display for EnhancementType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
    Expert,
}

impl DifficultyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyLevel::Beginner => "beginner",
            DifficultyLevel::Intermediate => "intermediate",
            DifficultyLevel::Advanced => "advanced",
            DifficultyLevel::Expert => "expert",
        }
    }
}

impl Display for DifficultyLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct EnhanceRequest {
    #[serde(default)]
    pub enhancement_type: EnhancementType,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct VariationsRequest {
    #[serde(default)]
    pub difficulty_level: DifficultyLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnhancementMetadata {
    pub notation_id: Uuid,
    pub enhancement_type: String,
    pub cached: bool,
    pub ai_enabled: bool,
    pub model: String,
}

/// Response envelope for `/enhance` and `/variations`. Absent sections are omitted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotationAnalysisResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub pattern_analysis: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub style_classification: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub practice_instructions: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Object>>)]
    pub variations: Option<Vec<JsonValue>>,
    pub metadata: EnhancementMetadata,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EnhancementRead {
    pub id: Uuid,
    pub notation_id: Uuid,
    pub model: String,
    pub enhancement_type: String,
    #[schema(value_type = Object)]
    pub enhancement: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl From<Enrichment> for EnhancementRead {
    fn from(e: Enrichment) -> Self {
        Self {
            id: e.id,
            notation_id: e.notation_id,
            model: e.model,
            enhancement_type: e.enhancement_type,
            enhancement: e.output_json,
            created_at: e.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotationWithEnhancements {
    pub notation: Notation,
    pub ai_enhancements: Vec<EnhancementRead>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct AiStatus {
    pub enabled: bool,
    pub model: String,
    pub api_key_configured: bool,
    pub status: String,
}
