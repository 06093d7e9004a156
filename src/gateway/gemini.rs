//! Gemini client for the reflection model.
//!
//! Talks to the `generateContent` REST endpoint with blocking `ureq`
//! requests. Structured calls ask for an `application/json` response and
//! tolerate replies wrapped in Markdown code fences. Calls carrying a photo
//! are retried once on the secondary model when the primary model is not
//! found.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::{
    AiGateway, CapturedMoment, EntryAnalysis, GROWTH_ACTIONS, GatewayError, GatewayResult,
    GrowthSuggestions, INSIGHT_HISTORY_MAX, Insight, MoodInput, MoodRead, WEEKLY_SEEDS_MAX,
    WeeklyPlan,
};
use crate::model::{ImageRef, Language, MoodEntry, MoodType, QuizAnswers};

/// Configuration for the Gemini client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    /// Base URL of the Generative Language API, without trailing slash.
    pub base_url: String,
    /// Model used for every call.
    pub model: String,
    /// Model retried for photo calls when `model` is not found.
    pub image_fallback_model: String,
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            model: "gemini-3-flash-preview".into(),
            image_fallback_model: "gemini-2.0-flash".into(),
            api_key: None,
            timeout_secs: 15,
        }
    }
}

/// Client for the Gemini REST API.
#[derive(Clone)]
pub struct GeminiGateway {
    config: GeminiConfig,
    agent: ureq::Agent,
    api_key: String,
}

impl GeminiGateway {
    /// Create a client. Fails with `Unavailable` when no API key is set.
    pub fn new(config: GeminiConfig) -> GatewayResult<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| GatewayError::Unavailable {
                url: config.base_url.clone(),
            })?
            .to_string();
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Ok(Self {
            config,
            agent,
            api_key,
        })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{model}:generateContent?key={}",
            self.config.base_url.trim_end_matches('/'),
            self.api_key
        )
    }

    /// One `generateContent` round trip; returns the concatenated text parts.
    fn generate(&self, model: &str, parts: &[Value], structured: bool) -> GatewayResult<String> {
        let body = request_body(parts, structured);
        let body_str = serde_json::to_string(&body).map_err(|e| GatewayError::RequestFailed {
            message: format!("JSON serialize error: {e}"),
        })?;

        let resp = match self
            .agent
            .post(&self.endpoint(model))
            .set("Content-Type", "application/json")
            .send_string(&body_str)
        {
            Ok(resp) => resp,
            Err(ureq::Error::Status(404, _)) => {
                return Err(GatewayError::ModelNotFound {
                    model: model.to_string(),
                });
            }
            Err(ureq::Error::Status(code, resp)) => {
                let detail = resp.into_string().unwrap_or_default();
                return Err(GatewayError::RequestFailed {
                    message: format!("server returned status {code}: {}", detail.trim()),
                });
            }
            Err(ureq::Error::Transport(transport)) => {
                let message = transport.to_string();
                if message.contains("timed out") {
                    return Err(GatewayError::Timeout {
                        timeout_secs: self.config.timeout_secs,
                    });
                }
                return Err(GatewayError::RequestFailed { message });
            }
        };

        let resp_str = resp.into_string().map_err(|e| GatewayError::ParseError {
            message: e.to_string(),
        })?;
        let json: Value = serde_json::from_str(&resp_str).map_err(|e| GatewayError::ParseError {
            message: e.to_string(),
        })?;
        response_text(&json).ok_or_else(|| GatewayError::ParseError {
            message: "missing 'candidates[0].content.parts' text".into(),
        })
    }

    /// Like [`generate`](Self::generate), retrying photo calls on the
    /// secondary model when the primary one is not found.
    fn generate_with_retry(
        &self,
        parts: &[Value],
        structured: bool,
        has_image: bool,
    ) -> GatewayResult<String> {
        match self.generate(&self.config.model, parts, structured) {
            Err(GatewayError::ModelNotFound { model }) if has_image => {
                tracing::warn!(
                    model = %model,
                    retry = %self.config.image_fallback_model,
                    "model not found, retrying photo call"
                );
                self.generate(&self.config.image_fallback_model, parts, structured)
            }
            other => other,
        }
    }

    fn generate_json<T: DeserializeOwned>(
        &self,
        parts: &[Value],
        has_image: bool,
    ) -> GatewayResult<T> {
        let raw = self.generate_with_retry(parts, true, has_image)?;
        serde_json::from_str(clean_json(&raw)).map_err(|e| GatewayError::ParseError {
            message: e.to_string(),
        })
    }
}

impl std::fmt::Debug for GeminiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiGateway")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

fn request_body(parts: &[Value], structured: bool) -> Value {
    let mut body = json!({ "contents": [{ "parts": parts }] });
    if structured {
        body["generationConfig"] = json!({ "responseMimeType": "application/json" });
    }
    body
}

fn text_part(text: impl Into<String>) -> Value {
    json!({ "text": text.into() })
}

fn image_part(image: &ImageRef) -> Option<Value> {
    let (mime_type, data) = image.inline_data()?;
    Some(json!({ "inlineData": { "mimeType": mime_type, "data": data } }))
}

/// Concatenated text of the first candidate.
fn response_text(json: &Value) -> Option<String> {
    let parts = json["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Strip a surrounding Markdown code fence from a JSON reply.
pub(crate) fn clean_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn language_name(language: Language) -> &'static str {
    match language {
        Language::English => "English",
        Language::Chinese => "Simplified Chinese (简体中文)",
        Language::Spanish => "Spanish",
    }
}

/// The action template spelled out for the prompt, with two examples.
fn template_instruction(language: Language) -> &'static str {
    match language {
        Language::English => {
            "Each action MUST be exactly one sentence of the form \"When <situation>, I will <small action>.\" \
             The action must be concrete and doable in under 30 seconds. Examples: \
             \"When I feel irritated, I will take three deep breaths.\" \
             \"When I feel restless, I will get up and drink a glass of water.\""
        }
        Language::Chinese => {
            "每条行动必须是一句话，格式严格为：在[情境]时，我会[具体小动作]。动作要具体，30 秒内可完成。\
             例如：在感到恼火时，我会深呼吸三次。在烦躁时，我会起身喝杯水。"
        }
        Language::Spanish => {
            "Cada acción DEBE ser una sola frase con la forma \"Cuando <situación>, voy a <acción pequeña>.\" \
             La acción debe ser concreta y posible en menos de 30 segundos. Ejemplos: \
             \"Cuando me sienta irritado, voy a respirar hondo tres veces.\" \
             \"Cuando me sienta inquieto, voy a levantarme a beber un vaso de agua.\""
        }
    }
}

fn entry_line(index: usize, entry: &MoodEntry) -> String {
    let mut line = format!(
        "[{}] {} {}",
        index + 1,
        entry.timestamp.date_naive(),
        entry.mood_type
    );
    if let Some(note) = entry.note.as_deref().or(entry.cause.as_deref()) {
        line.push(' ');
        line.push_str(note);
    }
    if let Some(body) = entry.body_sensations.as_deref().filter(|b| !b.is_empty()) {
        line.push_str(&format!(" body: {}", body.join(", ")));
    }
    if let Some(advice) = &entry.advice {
        line.push_str(&format!(" reaction: {advice}"));
    }
    line
}

impl AiGateway for GeminiGateway {
    fn classify_mood(&self, input: &MoodInput, language: Language) -> GatewayResult<MoodRead> {
        let mut prompt = format!(
            "Analyze the emotional atmosphere. 1) Classify the mood as one of \
             Pleasant/Stressful/Calm/Thrilled/Irritating. 2) Give 6-8 emotion keywords in {}. \
             3) A short vibe description (3-6 words). \
             Return JSON: {{\"moodType\": string, \"emotions\": string[], \"shortDescription\": string}}",
            language_name(language)
        );
        if let Some(context) = input.context.as_deref().filter(|c| !c.trim().is_empty()) {
            prompt.push_str(&format!("\nThe user wrote: \"{context}\""));
        }
        let mut parts = vec![text_part(prompt)];
        let image = input.image.as_ref().and_then(image_part);
        let has_image = image.is_some();
        parts.extend(image);
        self.generate_json(&parts, has_image)
    }

    fn generate_insight(
        &self,
        user_name: &str,
        recent: &[MoodEntry],
        language: Language,
    ) -> GatewayResult<Insight> {
        let history = recent
            .iter()
            .take(INSIGHT_HISTORY_MAX)
            .enumerate()
            .map(|(i, e)| entry_line(i, e))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Generate a warm, 1-2 sentence daily insight for {user_name}. History:\n{history}\n\
             Language: {}. Simple and grounded. Max 40 words. Reply with the insight text only.",
            language_name(language)
        );
        let text = self.generate_with_retry(&[text_part(prompt)], false, false)?;
        Ok(Insight {
            text: text.trim().to_string(),
        })
    }

    fn generate_growth_suggestions(
        &self,
        mood: MoodType,
        context: &str,
        categories: &[String],
        language: Language,
    ) -> GatewayResult<GrowthSuggestions> {
        let prompt = format!(
            "User feels {mood}. Context: {context}. Categories: {}.\n\
             Return JSON: {{\"insight\": string, \"actions\": string[]}}.\n\
             1. \"insight\": one short, validating sentence.\n\
             2. \"actions\": EXACTLY {GROWTH_ACTIONS} sentences. {}\n\
             Language: {}.",
            categories.join(", "),
            template_instruction(language),
            language_name(language)
        );
        self.generate_json(&[text_part(prompt)], false)
    }

    fn analyze_captured_moment(
        &self,
        image: Option<&ImageRef>,
        tags: &[String],
        language: Language,
    ) -> GatewayResult<CapturedMoment> {
        let tags = if tags.is_empty() {
            "None reported".to_string()
        } else {
            tags.join(", ")
        };
        let image = image.and_then(image_part);
        let prompt = format!(
            "The user's heart rate spiked. Body tags: {tags}.{}\n\
             1. Decide whether this is distress (Stressful) or excitement (Thrilled); Calm if neither.\n\
             2. A very short grounding summary in the second person.\n\
             3. One immediate action: a breathing technique if Stressful, a savoring technique if Thrilled.\n\
             Return JSON: {{\"moodType\": string, \"summary\": string, \"advice\": string, \"emotions\": string[]}}.\n\
             Language: {}.",
            if image.is_some() {
                " The user also shared a photo of their surroundings."
            } else {
                ""
            },
            language_name(language)
        );
        let has_image = image.is_some();
        let mut parts = vec![text_part(prompt)];
        parts.extend(image);
        self.generate_json(&parts, has_image)
    }

    fn analyze_mood_entry(
        &self,
        mood: MoodType,
        cause: &str,
        image: Option<&ImageRef>,
        language: Language,
    ) -> GatewayResult<EntryAnalysis> {
        let image = image.and_then(image_part);
        let prompt = format!(
            "User feels {mood} because: \"{cause}\".{}\n\
             Identify 5 nuanced emotions and a compassionate one-sentence summary.\n\
             Return JSON: {{\"emotions\": string[], \"summary\": string}}. Language: {}.",
            if image.is_some() {
                " The user also provided an image."
            } else {
                ""
            },
            language_name(language)
        );
        let has_image = image.is_some();
        let mut parts = vec![text_part(prompt)];
        parts.extend(image);
        self.generate_json(&parts, has_image)
    }

    fn generate_persona(
        &self,
        name: &str,
        mbti: &str,
        quiz: Option<&QuizAnswers>,
        language: Language,
    ) -> GatewayResult<String> {
        let traits = quiz
            .map(|q| {
                format!(
                    "handles stress by {}, recharges by {}",
                    q.stress_handling, q.recharge_method
                )
            })
            .unwrap_or_else(|| "unknown".into());
        let name = if name.trim().is_empty() { "Friend" } else { name };
        let prompt = format!(
            "Create a simple, warm \"emotional essence\" (max 30 words) for {name}, MBTI: {mbti}, \
             traits: {traits}. Speak to them directly. Language: {}. Reply with the text only.",
            language_name(language)
        );
        let text = self.generate_with_retry(&[text_part(prompt)], false, false)?;
        Ok(text.trim().to_string())
    }

    fn weekly_plan(&self, entries: &[MoodEntry], language: Language) -> GatewayResult<WeeklyPlan> {
        let summary = entries
            .iter()
            .enumerate()
            .map(|(i, e)| entry_line(i, e))
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "These are the user's most intense moments this week:\n{summary}\n\
             1. \"patternSummary\": 2-3 short sentences naming common triggers, one unhelpful \
             reaction pattern and one small helpful strategy. Warm, coaching tone.\n\
             2. \"actionSeeds\": 1 to {WEEKLY_SEEDS_MAX} goals. {}\n\
             Return JSON: {{\"patternSummary\": string, \"actionSeeds\": string[]}}. Language: {}.",
            template_instruction(language),
            language_name(language)
        );
        self.generate_json(&[text_part(prompt)], false)
    }
}
