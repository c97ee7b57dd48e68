//! Drum-pattern insights: analysis, variations, style and practice plans.
//!
//! Every operation returns an [`Insight`]. When no provider is configured, or the
//! provider call fails, the insight carries a fixed fallback payload and
//! `ai_generated == false`; callers must not cache those.

use std::sync::Arc;

use drumnote_core::{
    models::{AiStatus, DifficultyLevel},
    OpenAiConfig,
};
use serde_json::{json, Value as JsonValue};

use super::openai::{ChatProvider, OpenAiService};
use super::pattern::PatternContext;

const STYLE_TEMPERATURE: f32 = 0.3;
const PRACTICE_TEMPERATURE: f32 = 0.7;
const SUMMARY_CHARS: usize = 200;

const ANALYST_SYSTEM_PROMPT: &str = "You are an expert drummer, music teacher, and rhythm analyst. Provide detailed, educational, and practical insights about drum patterns.";
const INSTRUCTOR_SYSTEM_PROMPT: &str = "You are a professional drum instructor creating practice exercises. Be specific, practical, and pedagogically sound.";
const HISTORIAN_SYSTEM_PROMPT: &str = "You are a music historian and genre expert specializing in percussion and rhythm analysis.";
const TEACHER_SYSTEM_PROMPT: &str = "You are an experienced drum teacher creating lesson plans. Be encouraging, specific, and pedagogically sound.";

/// Output of one insight request.
#[derive(Debug, Clone, PartialEq)]
pub struct Insight {
    pub output: JsonValue,
    pub ai_generated: bool,
}

impl Insight {
    fn generated(output: JsonValue) -> Self {
        Self {
            output,
            ai_generated: true,
        }
    }

    fn fallback(output: JsonValue) -> Self {
        Self {
            output,
            ai_generated: false,
        }
    }
}

#[derive(Clone)]
pub struct DrumInsightService {
    provider: Option<Arc<dyn ChatProvider>>,
    model: String,
    temperature: f32,
}

impl DrumInsightService {
    /// Build from configuration; without an API key the service runs in fallback mode.
    pub fn from_config(config: &OpenAiConfig) -> anyhow::Result<Self> {
        let provider: Option<Arc<dyn ChatProvider>> = match config.api_key.as_deref() {
            Some(key) if config.is_enabled() => {
                tracing::info!(model = %config.model, "OpenAI integration enabled");
                Some(Arc::new(OpenAiService::new(key.to_string(), config)?))
            }
            _ => {
                tracing::warn!("OpenAI API key not found. AI features will be disabled.");
                None
            }
        };

        Ok(Self {
            provider,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    pub fn with_provider(provider: Arc<dyn ChatProvider>, temperature: f32) -> Self {
        Self {
            model: provider.model_name().to_string(),
            provider: Some(provider),
            temperature,
        }
    }

    pub fn disabled(model: impl Into<String>) -> Self {
        Self {
            provider: None,
            model: model.into(),
            temperature: PRACTICE_TEMPERATURE,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn status(&self) -> AiStatus {
        let enabled = self.is_enabled();
        AiStatus {
            enabled,
            model: if enabled {
                self.model.clone()
            } else {
                "N/A".to_string()
            },
            api_key_configured: enabled,
            status: if enabled { "Ready" } else { "API key required" }.to_string(),
        }
    }

    pub async fn analyze_pattern(&self, ctx: &PatternContext) -> Insight {
        self.ask(
            "pattern_analysis",
            ANALYST_SYSTEM_PROMPT,
            &analysis_prompt(ctx),
            self.temperature,
            parse_analysis,
            fallback_analysis,
        )
        .await
    }

    pub async fn generate_variations(
        &self,
        ctx: &PatternContext,
        difficulty: DifficultyLevel,
    ) -> Insight {
        self.ask(
            "variations",
            INSTRUCTOR_SYSTEM_PROMPT,
            &variations_prompt(ctx, difficulty),
            self.temperature,
            parse_variations,
            fallback_variations,
        )
        .await
    }

    pub async fn classify_style(&self, ctx: &PatternContext) -> Insight {
        self.ask(
            "style_classification",
            HISTORIAN_SYSTEM_PROMPT,
            &style_prompt(ctx),
            STYLE_TEMPERATURE,
            parse_style,
            fallback_style,
        )
        .await
    }

    pub async fn practice_instructions(&self, ctx: &PatternContext) -> Insight {
        self.ask(
            "practice_instructions",
            TEACHER_SYSTEM_PROMPT,
            &practice_prompt(ctx),
            PRACTICE_TEMPERATURE,
            parse_practice,
            fallback_practice,
        )
        .await
    }

    async fn ask(
        &self,
        task: &str,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        parse: fn(&str) -> JsonValue,
        fallback: fn() -> JsonValue,
    ) -> Insight {
        let Some(provider) = &self.provider else {
            return Insight::fallback(fallback());
        };

        match provider.complete(system_prompt, user_prompt, temperature).await {
            Ok(text) => Insight::generated(parse(&text)),
            Err(e) => {
                tracing::error!(task = %task, error = %e, "OpenAI request failed, using fallback");
                Insight::fallback(fallback())
            }
        }
    }
}

fn analysis_prompt(ctx: &PatternContext) -> String {
    format!(
        r#"Analyze this drum pattern and provide insights:

{}

Please provide:

1. PATTERN NAME: What would you call this drum pattern?
2. DIFFICULTY LEVEL: Rate from 1-10 with explanation
3. MUSICAL STYLE: Primary genre/style classification
4. KEY CHARACTERISTICS: What makes this pattern distinctive?
5. TECHNICAL ELEMENTS: Notable techniques or challenges
6. LEARNING FOCUS: What should a drummer focus on when learning this?
7. MUSICAL CONTEXT: Where might this pattern be used?
8. PRACTICE SUGGESTIONS: How to approach learning this pattern

Be specific, educational, and encouraging in your analysis."#,
        ctx.summary()
    )
}

fn variations_prompt(ctx: &PatternContext, difficulty: DifficultyLevel) -> String {
    format!(
        r#"Based on this drum pattern:
{}

Generate practice variations for a {} drummer:

1. SIMPLIFIED VERSIONS (3 variations):
- Easier versions for practice building up to the original

2. COMPLEXITY VARIATIONS (3 variations):
- Add fills, ghost notes, or accents

3. STYLE ADAPTATIONS (3 variations):
- Same basic pattern in different musical styles

4. TECHNICAL EXERCISES (3 variations):
- Focused exercises to master specific techniques

Format each variation as a clear, concise description that a drummer can follow."#,
        ctx.description(),
        difficulty
    )
}

fn style_prompt(ctx: &PatternContext) -> String {
    format!(
        r#"Analyze this drum pattern and classify its musical style:

Pattern Analysis:
{}

Provide:
1. PRIMARY GENRE (most likely): [Genre name] - [confidence %]
2. SECONDARY GENRES (2-3 possibilities): [Genre] - [confidence %]
3. STYLE CHARACTERISTICS: Key elements that indicate this style
4. HISTORICAL CONTEXT: Brief background about this drumming style
5. NOTABLE DRUMMERS: Who is known for this style

Consider genres like: Rock, Jazz, Blues, Funk, Latin, Reggae, Hip-Hop, Electronic, Folk, Country, Metal, Progressive, etc."#,
        ctx.characteristics()
    )
}

fn practice_prompt(ctx: &PatternContext) -> String {
    format!(
        r#"Create comprehensive practice instructions for this drum pattern:

Pattern: {}
Assessed Difficulty: {}
Target Tempo: {:.1} BPM

Provide structured practice instructions:

1. PREPARATION (2-3 steps):
- Setup and warm-up recommendations

2. LEARNING PHASES (4-5 progressive steps):
- Start slow, build complexity gradually
- Include specific tempo recommendations for each phase

3. TECHNIQUE FOCUS (3-4 key points):
- Specific technical aspects to watch for

4. COMMON MISTAKES (3-4 items):
- What to avoid and how to correct

5. MASTERY GOALS (2-3 objectives):
- How to know when you've mastered it

Make instructions clear, encouraging, and suitable for the difficulty level."#,
        ctx.description(),
        ctx.difficulty_assessment(),
        ctx.tempo
    )
}

/// Blank-line separated paragraphs in `[start, end)`, trimmed and non-empty.
fn sections(text: &str, start: usize, end: Option<usize>) -> Vec<String> {
    let paragraphs: Vec<&str> = text.split("\n\n").collect();
    let end = end.unwrap_or(paragraphs.len()).min(paragraphs.len());
    paragraphs
        .get(start.min(end)..end)
        .unwrap_or_default()
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_analysis(text: &str) -> JsonValue {
    let summary = if text.chars().count() > SUMMARY_CHARS {
        let head: String = text.chars().take(SUMMARY_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    };

    json!({
        "analysis": text,
        "ai_generated": true,
        "confidence": 0.8,
        "summary": summary,
    })
}

fn parse_variations(text: &str) -> JsonValue {
    json!({
        "simplified": sections(text, 0, Some(3)),
        "complex": sections(text, 3, Some(6)),
        "styles": sections(text, 6, Some(9)),
        "exercises": sections(text, 9, Some(12)),
        "raw_response": text,
        "ai_generated": true,
    })
}

fn parse_style(text: &str) -> JsonValue {
    json!({
        "primary_genre": "Unknown",
        "confidence": 0.7,
        "secondary_genres": [],
        "characteristics": text,
        "full_analysis": text,
        "ai_generated": true,
    })
}

fn parse_practice(text: &str) -> JsonValue {
    json!({
        "preparation": sections(text, 0, Some(3)),
        "learning_phases": sections(text, 3, Some(8)),
        "technique_focus": sections(text, 8, Some(12)),
        "common_mistakes": sections(text, 12, Some(16)),
        "mastery_goals": sections(text, 16, None),
        "full_instructions": text,
        "ai_generated": true,
    })
}

fn fallback_analysis() -> JsonValue {
    json!({
        "analysis": "AI analysis not available. Please configure OpenAI API key for intelligent insights.",
        "ai_generated": false,
        "confidence": 0.0,
        "summary": "Basic analysis only - enable OpenAI for detailed insights",
    })
}

fn fallback_variations() -> JsonValue {
    json!({
        "simplified": ["Practice at slower tempo", "Use only kick and snare", "Remove fills"],
        "complex": ["Add ghost notes", "Include hi-hat variations", "Add crash accents"],
        "styles": ["Try in different time signatures", "Apply swing feel", "Add Latin percussion"],
        "exercises": ["Practice each limb separately", "Use metronome", "Record yourself playing"],
        "note": "AI-generated variations not available",
        "ai_generated": false,
    })
}

fn fallback_style() -> JsonValue {
    json!({
        "primary_genre": "Unknown",
        "confidence": 0.0,
        "secondary_genres": [],
        "characteristics": "AI style classification not available",
        "full_analysis": "Configure OpenAI API key for intelligent style analysis",
        "ai_generated": false,
    })
}

fn fallback_practice() -> JsonValue {
    json!({
        "preparation": ["Warm up with simple beats", "Set up metronome", "Check drum tuning"],
        "learning_phases": ["Start slow", "Master basic pattern", "Gradually increase tempo", "Add dynamics"],
        "technique_focus": ["Keep steady tempo", "Maintain proper posture", "Practice limb independence"],
        "common_mistakes": ["Rushing tempo", "Poor stick technique", "Lack of consistency"],
        "mastery_goals": ["Play cleanly at target tempo", "Maintain groove", "Add personal style"],
        "note": "AI-generated instructions not available",
        "ai_generated": false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pattern::PatternEvent;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedProvider {
        reply: anyhow::Result<String>,
        calls: Mutex<Vec<(String, f32)>>,
    }

    impl ScriptedProvider {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(anyhow::anyhow!("connection reset")),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        fn model_name(&self) -> &str {
            "gpt-test"
        }

        async fn complete(
            &self,
            system_prompt: &str,
            _user_prompt: &str,
            temperature: f32,
        ) -> anyhow::Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((system_prompt.to_string(), temperature));
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(anyhow::anyhow!(e.to_string())),
            }
        }
    }

    fn ctx() -> PatternContext {
        PatternContext {
            events: vec![PatternEvent {
                drum_type: "kick".to_string(),
                timestamp: 0.0,
                velocity: 0.9,
            }],
            tempo: 110.0,
            time_signature: "4/4".to_string(),
            duration_seconds: 4.0,
            complexity: Some(0.2),
        }
    }

    #[test]
    fn status_reflects_configuration() {
        let disabled = DrumInsightService::disabled("gpt-4").status();
        assert!(!disabled.enabled);
        assert_eq!(disabled.model, "N/A");
        assert_eq!(disabled.status, "API key required");

        let enabled =
            DrumInsightService::with_provider(ScriptedProvider::replying("ok"), 0.7).status();
        assert!(enabled.enabled);
        assert!(enabled.api_key_configured);
        assert_eq!(enabled.model, "gpt-test");
        assert_eq!(enabled.status, "Ready");
    }

    #[test]
    fn from_config_without_key_is_disabled() {
        let config = OpenAiConfig {
            api_key: None,
            model: "gpt-4".to_string(),
            max_tokens: 1500,
            temperature: 0.7,
            api_base: "https://api.openai.com/v1".to_string(),
        };
        let service = DrumInsightService::from_config(&config).unwrap();
        assert!(!service.is_enabled());
        assert_eq!(service.model(), "gpt-4");
    }

    #[tokio::test]
    async fn disabled_service_returns_fallbacks() {
        let service = DrumInsightService::disabled("gpt-4");
        let analysis = service.analyze_pattern(&ctx()).await;
        assert!(!analysis.ai_generated);
        assert_eq!(analysis.output["confidence"], 0.0);

        let variations = service
            .generate_variations(&ctx(), DifficultyLevel::Beginner)
            .await;
        assert!(!variations.ai_generated);
        assert_eq!(variations.output["simplified"][0], "Practice at slower tempo");

        let practice = service.practice_instructions(&ctx()).await;
        assert_eq!(practice.output["learning_phases"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn provider_failure_falls_back() {
        let service = DrumInsightService::with_provider(ScriptedProvider::failing(), 0.7);
        let style = service.classify_style(&ctx()).await;
        assert!(!style.ai_generated);
        assert_eq!(style.output, fallback_style());
    }

    #[tokio::test]
    async fn style_uses_low_temperature() {
        let provider = ScriptedProvider::replying("Funk, mostly.");
        let service = DrumInsightService::with_provider(provider.clone(), 0.9);

        let style = service.classify_style(&ctx()).await;
        assert!(style.ai_generated);
        assert_eq!(style.output["full_analysis"], "Funk, mostly.");

        service.analyze_pattern(&ctx()).await;
        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls[0], (HISTORIAN_SYSTEM_PROMPT.to_string(), 0.3));
        assert_eq!(calls[1], (ANALYST_SYSTEM_PROMPT.to_string(), 0.9));
    }

    #[test]
    fn analysis_summary_is_truncated() {
        let long = "x".repeat(250);
        let parsed = parse_analysis(&long);
        assert_eq!(parsed["summary"].as_str().unwrap().len(), 203);
        assert!(parsed["summary"].as_str().unwrap().ends_with("..."));
        assert_eq!(parsed["analysis"], long.as_str());

        let short = parse_analysis("Rock beat");
        assert_eq!(short["summary"], "Rock beat");
    }

    #[test]
    fn variations_split_into_fixed_sections() {
        let text = (1..=13)
            .map(|i| format!("Variation {}", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let parsed = parse_variations(&text);
        assert_eq!(parsed["simplified"], json!(["Variation 1", "Variation 2", "Variation 3"]));
        assert_eq!(parsed["exercises"], json!(["Variation 10", "Variation 11", "Variation 12"]));
        assert_eq!(parsed["raw_response"], text.as_str());
    }

    #[test]
    fn short_practice_response_leaves_sections_empty() {
        let parsed = parse_practice("Warm up\n\n\n\nPlay slowly");
        assert_eq!(parsed["preparation"], json!(["Warm up", "Play slowly"]));
        assert_eq!(parsed["learning_phases"], json!([]));
        assert_eq!(parsed["mastery_goals"], json!([]));
    }

    #[test]
    fn prompts_embed_pattern_context() {
        let prompt = variations_prompt(&ctx(), DifficultyLevel::Advanced);
        assert!(prompt.contains("for a advanced drummer"));
        assert!(prompt.contains("At 0s: kick(0.90)"));

        let prompt = practice_prompt(&ctx());
        assert!(prompt.contains("Assessed Difficulty: beginner"));
        assert!(prompt.contains("Target Tempo: 110.0 BPM"));
    }
}
