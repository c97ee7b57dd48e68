//! LLM call-and-cache for notation enrichment.
//!
//! The cache key is the SHA-256 of the request input (notation document, tempo, time
//! signature, enhancement type and difficulty). Only model-generated outputs are stored;
//! fallbacks are recomputed on every request.

use std::future::Future;

use drumnote_core::models::{
    DifficultyLevel, EnhancementMetadata, EnhancementType, Notation, NotationAnalysisResponse,
};
use drumnote_core::notation::{enrichment_input, prompt_hash};
use drumnote_core::AppError;
use drumnote_services::{DrumInsightService, Insight, PatternContext};
use serde_json::{Map, Value as JsonValue};

use crate::state::DbState;

/// Output of one enrichment request and whether it came from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedOutput {
    pub output: JsonValue,
    pub cached: bool,
}

pub struct EnrichmentService<'a> {
    db: &'a DbState,
    insights: &'a DrumInsightService,
}

impl<'a> EnrichmentService<'a> {
    pub fn new(db: &'a DbState, insights: &'a DrumInsightService) -> Self {
        Self { db, insights }
    }

    /// Return the stored output for `input`, or compute it and store it when generated.
    async fn cached_or_compute<F, Fut>(
        &self,
        notation: &Notation,
        enhancement_type: EnhancementType,
        input: JsonValue,
        compute: F,
    ) -> Result<CachedOutput, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Insight>,
    {
        let hash = prompt_hash(&input);
        let repo = &self.db.enrichment_repository;

        if let Some(hit) = repo.find(notation.id, &hash).await? {
            tracing::debug!(notation_id = %notation.id, enhancement_type = %enhancement_type, "Enrichment cache hit");
            return Ok(CachedOutput {
                output: hit.output_json,
                cached: true,
            });
        }

        let insight = compute().await;
        if !insight.ai_generated {
            return Ok(CachedOutput {
                output: insight.output,
                cached: false,
            });
        }

        let stored = repo
            .insert(
                notation.id,
                &hash,
                enhancement_type.as_str(),
                self.insights.model(),
                &input,
                &insight.output,
            )
            .await?;

        Ok(CachedOutput {
            output: stored.output_json,
            cached: false,
        })
    }

    fn metadata(
        &self,
        notation: &Notation,
        enhancement_type: EnhancementType,
        cached: bool,
    ) -> EnhancementMetadata {
        EnhancementMetadata {
            notation_id: notation.id,
            enhancement_type: enhancement_type.as_str().to_string(),
            cached,
            ai_enabled: self.insights.is_enabled(),
            model: self.insights.model().to_string(),
        }
    }

    #[tracing::instrument(skip(self, notation), fields(notation_id = %notation.id))]
    pub async fn enhance(
        &self,
        notation: &Notation,
        enhancement_type: EnhancementType,
    ) -> Result<NotationAnalysisResponse, AppError> {
        if enhancement_type == EnhancementType::Variations {
            return self
                .variations(notation, DifficultyLevel::default())
                .await;
        }

        let ctx = PatternContext::from_notation(notation);
        let input = enrichment_input(notation, enhancement_type, None);
        let (insights, ctx) = (self.insights, &ctx);

        let result = self
            .cached_or_compute(notation, enhancement_type, input, move || async move {
                combined_insight(insights, ctx, enhancement_type).await
            })
            .await?;

        let section = |key: &str| result.output.get(key).cloned();
        Ok(NotationAnalysisResponse {
            pattern_analysis: section("pattern_analysis"),
            style_classification: section("style_classification"),
            practice_instructions: section("practice_instructions"),
            variations: None,
            metadata: self.metadata(notation, enhancement_type, result.cached),
        })
    }

    #[tracing::instrument(skip(self, notation), fields(notation_id = %notation.id))]
    pub async fn variations(
        &self,
        notation: &Notation,
        difficulty: DifficultyLevel,
    ) -> Result<NotationAnalysisResponse, AppError> {
        let ctx = PatternContext::from_notation(notation);
        let input = enrichment_input(notation, EnhancementType::Variations, Some(difficulty));
        let (insights, ctx) = (self.insights, &ctx);

        let result = self
            .cached_or_compute(notation, EnhancementType::Variations, input, move || async move {
                insights.generate_variations(ctx, difficulty).await
            })
            .await?;

        Ok(NotationAnalysisResponse {
            pattern_analysis: None,
            style_classification: None,
            practice_instructions: None,
            variations: Some(vec![result.output]),
            metadata: self.metadata(notation, EnhancementType::Variations, result.cached),
        })
    }
}

/// Run every insight the enhancement type asks for and merge them into one document.
/// The document counts as generated only when every part was.
async fn combined_insight(
    insights: &DrumInsightService,
    ctx: &PatternContext,
    enhancement_type: EnhancementType,
) -> Insight {
    let mut parts: Vec<(&str, Insight)> = Vec::new();

    if enhancement_type.includes_pattern_analysis() {
        parts.push(("pattern_analysis", insights.analyze_pattern(ctx).await));
    }
    if enhancement_type.includes_style_classification() {
        parts.push(("style_classification", insights.classify_style(ctx).await));
    }
    if enhancement_type.includes_practice_instructions() {
        parts.push(("practice_instructions", insights.practice_instructions(ctx).await));
    }

    let ai_generated = parts.iter().all(|(_, insight)| insight.ai_generated);
    let sections: Map<String, JsonValue> = parts
        .into_iter()
        .map(|(key, insight)| (key.to_string(), insight.output))
        .collect();

    Insight {
        output: JsonValue::Object(sections),
        ai_generated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use drumnote_services::ChatProvider;
    use serde_json::json;
    use std::sync::Arc;
    use uuid::Uuid;

    struct EchoProvider;

    #[async_trait]
    impl ChatProvider for EchoProvider {
        fn model_name(&self) -> &str {
            "gpt-test"
        }

        async fn complete(&self, _system: &str, _user: &str, _temperature: f32) -> anyhow::Result<String> {
            Ok("Steady backbeat with driving eighth notes.".to_string())
        }
    }

    fn ctx() -> PatternContext {
        let now = Utc::now();
        PatternContext::from_notation(&Notation {
            id: Uuid::new_v4(),
            video_id: Uuid::new_v4(),
            tempo: Some(110),
            time_signature: Some("4/4".to_string()),
            notation_json: json!({"timeline": [{"drum_type": "kick", "timestamp_seconds": 0.0}]}),
            model_version: None,
            confidence_score: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    #[tokio::test]
    async fn full_analysis_merges_three_sections() {
        let insights = DrumInsightService::with_provider(Arc::new(EchoProvider), 0.7);
        let insight = combined_insight(&insights, &ctx(), EnhancementType::FullAnalysis).await;

        assert!(insight.ai_generated);
        let sections = insight.output.as_object().unwrap();
        assert_eq!(sections.len(), 3);
        assert!(sections.contains_key("pattern_analysis"));
        assert!(sections.contains_key("style_classification"));
        assert!(sections.contains_key("practice_instructions"));
    }

    #[tokio::test]
    async fn single_section_request() {
        let insights = DrumInsightService::with_provider(Arc::new(EchoProvider), 0.7);
        let insight = combined_insight(&insights, &ctx(), EnhancementType::StyleClassification).await;

        let sections = insight.output.as_object().unwrap();
        assert_eq!(sections.len(), 1);
        assert!(sections.contains_key("style_classification"));
    }

    #[tokio::test]
    async fn fallback_makes_document_uncacheable() {
        let insights = DrumInsightService::disabled("gpt-4");
        let insight = combined_insight(&insights, &ctx(), EnhancementType::FullAnalysis).await;

        assert!(!insight.ai_generated);
        assert_eq!(insight.output.as_object().unwrap().len(), 3);
    }
}
