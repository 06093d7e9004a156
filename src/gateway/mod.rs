//! AI gateway: request/response contracts for the reflection model.
//!
//! The journal core only depends on the shapes declared here. A concrete
//! client ([`gemini::GeminiGateway`]) implements [`AiGateway`]; callers go
//! through [`reflector::Reflector`], which adds the timeout, the contract
//! checks and the deterministic offline fallback from
//! [`fallback::FallbackBook`]. No gateway failure ever reaches the user as an
//! error.

pub mod fallback;
pub mod gemini;
pub mod reflector;
pub mod template;

pub use fallback::FallbackBook;
pub use gemini::{GeminiConfig, GeminiGateway};
pub use reflector::{FallbackReason, Origin, Reflection, Reflector};
pub use template::{action_template, matches_template};

use miette::Diagnostic;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::model::{ImageRef, Language, MoodEntry, MoodType, QuizAnswers};

/// Errors from the AI gateway. Recovered by the fallback path.
#[derive(Debug, Error, Diagnostic)]
pub enum GatewayError {
    #[error("reflection model is not available at {url}")]
    #[diagnostic(
        code(mirror::gateway::unavailable),
        help("Set `gateway.api_key` in the journal config, or disable AI in preferences.")
    )]
    Unavailable { url: String },

    #[error("reflection request failed: {message}")]
    #[diagnostic(
        code(mirror::gateway::request_failed),
        help("Check network connectivity. Offline reflections are used meanwhile.")
    )]
    RequestFailed { message: String },

    #[error("model \"{model}\" was not found")]
    #[diagnostic(
        code(mirror::gateway::model_not_found),
        help("Set `gateway.model` to a model your key can access.")
    )]
    ModelNotFound { model: String },

    #[error("failed to parse model response: {message}")]
    #[diagnostic(
        code(mirror::gateway::parse_error),
        help("The model returned an unexpected response format.")
    )]
    ParseError { message: String },

    #[error("reflection request timed out after {timeout_secs}s")]
    #[diagnostic(
        code(mirror::gateway::timeout),
        help("Increase `gateway.timeout_secs` or check the connection.")
    )]
    Timeout { timeout_secs: u64 },

    #[error("model response breaks the {contract} contract: {message}")]
    #[diagnostic(code(mirror::gateway::contract))]
    Contract {
        contract: &'static str,
        message: String,
    },

    #[error("fallback data for {language} is invalid: {message}")]
    #[diagnostic(
        code(mirror::gateway::fallback_data),
        help("Each growth pool needs at least 3 template actions; see data/fallback/.")
    )]
    FallbackData { language: Language, message: String },
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

/// What to classify: a photo, free-text context, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoodInput {
    pub image: Option<ImageRef>,
    pub context: Option<String>,
}

impl MoodInput {
    pub fn image(image: ImageRef) -> Self {
        Self {
            image: Some(image),
            context: None,
        }
    }

    pub fn text(context: impl Into<String>) -> Self {
        Self {
            image: None,
            context: Some(context.into()),
        }
    }
}

/// Mood read from a photo or text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodRead {
    #[serde(deserialize_with = "lenient_mood")]
    pub mood_type: MoodType,
    #[serde(default)]
    pub emotions: Vec<String>,
    #[serde(default, alias = "vibeDescription")]
    pub short_description: String,
}

/// A supportive one-liner for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub text: String,
}

/// An affirmation plus exactly three template actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthSuggestions {
    #[serde(default)]
    pub insight: String,
    #[serde(default)]
    pub actions: Vec<String>,
}

/// Number of actions a growth suggestion carries.
pub const GROWTH_ACTIONS: usize = 3;

/// Reading of a rushed capture (photo plus body-sensation tags).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedMoment {
    #[serde(deserialize_with = "lenient_mood")]
    pub mood_type: MoodType,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub advice: String,
    #[serde(default)]
    pub emotions: Vec<String>,
}

/// Nuanced emotions and a one-line acknowledgement for a logged mood.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryAnalysis {
    #[serde(default)]
    pub emotions: Vec<String>,
    #[serde(default)]
    pub summary: String,
}

/// Weekly pattern summary with one to three template seeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyPlan {
    #[serde(default)]
    pub pattern_summary: String,
    #[serde(default, alias = "actionSeedsIfThen")]
    pub action_seeds: Vec<String>,
}

/// Most seeds a weekly plan may carry.
pub const WEEKLY_SEEDS_MAX: usize = 3;

/// Entries sent along with an insight request.
pub const INSIGHT_HISTORY_MAX: usize = 5;

fn lenient_mood<'de, D: Deserializer<'de>>(deserializer: D) -> Result<MoodType, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

/// The reflection model. Implementations block; the [`Reflector`] runs them
/// on worker threads.
pub trait AiGateway: Send + Sync {
    fn classify_mood(&self, input: &MoodInput, language: Language) -> GatewayResult<MoodRead>;

    fn generate_insight(
        &self,
        user_name: &str,
        recent: &[MoodEntry],
        language: Language,
    ) -> GatewayResult<Insight>;

    fn generate_growth_suggestions(
        &self,
        mood: MoodType,
        context: &str,
        categories: &[String],
        language: Language,
    ) -> GatewayResult<GrowthSuggestions>;

    fn analyze_captured_moment(
        &self,
        image: Option<&ImageRef>,
        tags: &[String],
        language: Language,
    ) -> GatewayResult<CapturedMoment>;

    fn analyze_mood_entry(
        &self,
        mood: MoodType,
        cause: &str,
        image: Option<&ImageRef>,
        language: Language,
    ) -> GatewayResult<EntryAnalysis>;

    fn generate_persona(
        &self,
        name: &str,
        mbti: &str,
        quiz: Option<&QuizAnswers>,
        language: Language,
    ) -> GatewayResult<String>;

    fn weekly_plan(&self, entries: &[MoodEntry], language: Language) -> GatewayResult<WeeklyPlan>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mood_read_accepts_lowercase_and_aliases() {
        let read: MoodRead = serde_json::from_str(
            r#"{"moodType": "calm", "emotions": ["still"], "vibeDescription": "Quiet morning"}"#,
        )
        .unwrap();
        assert_eq!(read.mood_type, MoodType::Calm);
        assert_eq!(read.short_description, "Quiet morning");
    }

    #[test]
    fn unknown_mood_is_a_parse_error() {
        let result: Result<MoodRead, _> = serde_json::from_str(r#"{"moodType": "Neutral"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn weekly_plan_accepts_legacy_field_name() {
        let plan: WeeklyPlan = serde_json::from_str(
            r#"{"patternSummary": "Busy week.", "actionSeedsIfThen": ["When tired, I will rest."]}"#,
        )
        .unwrap();
        assert_eq!(plan.action_seeds.len(), 1);
    }
}
