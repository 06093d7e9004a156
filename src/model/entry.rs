//! Mood entries: the append-only records of the journal history.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, FixedOffset, NaiveTime, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;
use crate::model::profile::Language;

// ---------------------------------------------------------------------------
// Identifiers and small value types
// ---------------------------------------------------------------------------

/// Opaque, history-unique entry identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// A fresh random (UUID v4) id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntryId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Reference to an attached photo: a `data:` URI or a path/URL the host resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split a base64 `data:` URI into `(mime_type, payload)`.
    ///
    /// Returns `None` for references that are not inline data.
    pub fn inline_data(&self) -> Option<(&str, &str)> {
        let rest = self.0.strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        let mime = header.strip_suffix(";base64")?;
        let mime = if mime.is_empty() { "image/jpeg" } else { mime };
        Some((mime, payload))
    }
}

/// The five mood families a user can log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoodType {
    Pleasant,
    Stressful,
    Calm,
    Thrilled,
    Irritating,
}

impl MoodType {
    pub const ALL: [MoodType; 5] = [
        MoodType::Pleasant,
        MoodType::Stressful,
        MoodType::Calm,
        MoodType::Thrilled,
        MoodType::Irritating,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pleasant => "Pleasant",
            Self::Stressful => "Stressful",
            Self::Calm => "Calm",
            Self::Thrilled => "Thrilled",
            Self::Irritating => "Irritating",
        }
    }

    /// Moods whose growth seeds savour the state rather than regulate it.
    pub fn is_positive(self) -> bool {
        matches!(self, Self::Pleasant | Self::Thrilled | Self::Calm)
    }
}

impl fmt::Display for MoodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoodType {
    type Err = String;

    /// Case-insensitive parse, as model output is not always capitalised.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown mood type \"{trimmed}\""))
    }
}

/// Strength of a feeling, 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Intensity(u8);

impl Intensity {
    pub const MAX: u8 = 100;

    /// Validate a raw intensity.
    pub fn new(value: i64) -> Result<Self, ValidationError> {
        if (0..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ValidationError::IntensityOutOfRange { value })
        }
    }

    /// Clamp a raw intensity into range.
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(0, i64::from(Self::MAX)) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Intensity {
    fn default() -> Self {
        Self(50)
    }
}

impl<'de> Deserialize<'de> for Intensity {
    /// Persisted values may be floats or drift out of range; clamp them
    /// instead of dropping the whole entry.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        if raw.is_nan() {
            return Ok(Self::default());
        }
        Ok(Self::clamped(raw.round() as i64))
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A small behavioural intention ("seed") attached to an entry.
///
/// State transitions live in [`crate::garden`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthGoal {
    pub text: String,
    pub is_completed: bool,
    #[serde(default)]
    pub is_harvested: bool,
}

impl GrowthGoal {
    /// A freshly planted, growing seed.
    pub fn planted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_completed: false,
            is_harvested: false,
        }
    }
}

/// One journaled emotional record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntry {
    pub id: EntryId,
    pub timestamp: DateTime<FixedOffset>,
    pub mood_type: MoodType,
    #[serde(default)]
    pub emotions: Vec<String>,
    #[serde(default)]
    pub intensity: Intensity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_analysis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance_question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_sensations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_goal: Option<GrowthGoal>,
}

impl MoodEntry {
    /// Whether any of the entry's categories equals `tag` (case-insensitive).
    pub fn has_category(&self, tag: &str) -> bool {
        self.categories
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|c| c.trim().eq_ignore_ascii_case(tag))
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// An uncommitted entry as produced by a capture flow.
///
/// Turned into a [`MoodEntry`] by [`EntryDraft::into_entry`], which is where
/// every entry invariant is checked.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryDraft {
    pub id: Option<EntryId>,
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub mood_type: MoodType,
    pub emotions: Vec<String>,
    pub intensity: i64,
    pub note: Option<String>,
    pub cause: Option<String>,
    pub ai_analysis: Option<String>,
    pub advice: Option<String>,
    pub image: Option<ImageRef>,
    pub categories: Option<Vec<String>>,
    pub guidance_question: Option<String>,
    pub guidance_answer: Option<String>,
    pub body_sensations: Option<Vec<String>>,
    pub growth_goal: Option<String>,
}

impl EntryDraft {
    pub fn new(mood_type: MoodType) -> Self {
        Self {
            id: None,
            timestamp: None,
            mood_type,
            emotions: Vec::new(),
            intensity: i64::from(Intensity::default().get()),
            note: None,
            cause: None,
            ai_analysis: None,
            advice: None,
            image: None,
            categories: None,
            guidance_question: None,
            guidance_answer: None,
            body_sensations: None,
            growth_goal: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<EntryId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Backfill the entry to a calendar moment instead of "now".
    pub fn at(mut self, timestamp: DateTime<FixedOffset>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_emotions<I, S>(mut self, emotions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.emotions = emotions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_intensity(mut self, intensity: i64) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn with_analysis(mut self, analysis: impl Into<String>) -> Self {
        self.ai_analysis = Some(analysis.into());
        self
    }

    pub fn with_advice(mut self, advice: impl Into<String>) -> Self {
        self.advice = Some(advice.into());
        self
    }

    pub fn with_image(mut self, image: ImageRef) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_guidance(mut self, question: impl Into<String>, answer: impl Into<String>) -> Self {
        self.guidance_question = Some(question.into());
        self.guidance_answer = Some(answer.into());
        self
    }

    pub fn with_body_sensations<I, S>(mut self, sensations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body_sensations = Some(sensations.into_iter().map(Into::into).collect());
        self
    }

    /// Plant a seed together with the entry.
    pub fn with_goal(mut self, text: impl Into<String>) -> Self {
        self.growth_goal = Some(text.into());
        self
    }

    /// Validate and build the entry. A missing id is generated, a missing
    /// timestamp becomes `now`.
    pub fn into_entry(self, now: DateTime<FixedOffset>) -> Result<MoodEntry, ValidationError> {
        let id = match self.id {
            Some(id) if id.as_str().trim().is_empty() => return Err(ValidationError::BlankId),
            Some(id) => id,
            None => EntryId::generate(),
        };
        let intensity = Intensity::new(self.intensity)?;
        let emotions = clean_tags(self.emotions)?;
        let growth_goal = match self.growth_goal {
            Some(text) if text.trim().is_empty() => return Err(ValidationError::BlankGoal),
            Some(text) => Some(GrowthGoal::planted(text.trim())),
            None => None,
        };

        Ok(MoodEntry {
            id,
            timestamp: self.timestamp.unwrap_or(now),
            mood_type: self.mood_type,
            emotions,
            intensity,
            note: non_blank(self.note),
            cause: non_blank(self.cause),
            ai_analysis: non_blank(self.ai_analysis),
            advice: non_blank(self.advice),
            image: self.image,
            categories: self.categories.map(drop_blank),
            guidance_question: non_blank(self.guidance_question),
            guidance_answer: non_blank(self.guidance_answer),
            body_sensations: self.body_sensations.map(drop_blank),
            growth_goal,
        })
    }
}

/// Edits allowed on a committed entry: user-edited or AI-derived text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPatch {
    pub note: Option<String>,
    pub ai_analysis: Option<String>,
    pub advice: Option<String>,
    pub emotions: Option<Vec<String>>,
    pub guidance_question: Option<String>,
    pub guidance_answer: Option<String>,
}

impl EntryPatch {
    /// Check the patch without applying it.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(emotions) = &self.emotions {
            clean_tags(emotions.clone())?;
        }
        Ok(())
    }

    /// Apply to `entry`. Returns whether anything changed.
    pub(crate) fn apply(&self, entry: &mut MoodEntry) -> Result<bool, ValidationError> {
        let mut changed = false;
        if let Some(emotions) = &self.emotions {
            let cleaned = clean_tags(emotions.clone())?;
            if cleaned != entry.emotions {
                entry.emotions = cleaned;
                changed = true;
            }
        }
        changed |= set_text(&mut entry.note, &self.note);
        changed |= set_text(&mut entry.ai_analysis, &self.ai_analysis);
        changed |= set_text(&mut entry.advice, &self.advice);
        changed |= set_text(&mut entry.guidance_question, &self.guidance_question);
        changed |= set_text(&mut entry.guidance_answer, &self.guidance_answer);
        Ok(changed)
    }
}

fn set_text(slot: &mut Option<String>, update: &Option<String>) -> bool {
    let Some(text) = update else {
        return false;
    };
    let next = non_blank(Some(text.clone()));
    if *slot == next {
        return false;
    }
    *slot = next;
    true
}

fn clean_tags(tags: Vec<String>) -> Result<Vec<String>, ValidationError> {
    tags.into_iter()
        .enumerate()
        .map(|(index, tag)| {
            let trimmed = tag.trim();
            if trimmed.is_empty() {
                Err(ValidationError::BlankEmotion { index })
            } else {
                Ok(trimmed.to_string())
            }
        })
        .collect()
}

fn drop_blank(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// History records
// ---------------------------------------------------------------------------

/// Decode a persisted history array.
///
/// Returns `None` when the record is not an array at all. Individual entries
/// that fail to parse, and repeated ids after their first occurrence, are
/// dropped with a warning.
pub fn parse_history(raw: &serde_json::Value) -> Option<Vec<MoodEntry>> {
    let items = raw.as_array()?;
    let mut seen = HashSet::with_capacity(items.len());
    let mut history = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match MoodEntry::deserialize(item) {
            Ok(entry) => {
                if seen.insert(entry.id.clone()) {
                    history.push(entry);
                } else {
                    tracing::warn!(index, entry_id = %entry.id, "dropping entry with duplicate id");
                }
            }
            Err(e) => tracing::warn!(index, error = %e, "dropping unparseable history entry"),
        }
    }
    Some(history)
}

/// The example history shown on first run: one pleasant entry from
/// yesterday with a completed seed.
pub fn seed_history(now: DateTime<FixedOffset>, language: Language) -> Vec<MoodEntry> {
    let lunch = NaiveTime::from_hms_opt(12, 30, 0).unwrap_or(NaiveTime::MIN);
    let yesterday = now
        .date_naive()
        .checked_sub_days(Days::new(1))
        .unwrap_or(now.date_naive())
        .and_time(lunch);
    let timestamp = now
        .offset()
        .from_local_datetime(&yesterday)
        .single()
        .unwrap_or(now);

    let (emotions, note, advice, goal): (&[&str], &str, &str, &str) = match language {
        Language::Chinese => (
            &["开心", "感激"],
            "午餐很棒。",
            "继续保持这种滋养身心的状态。",
            "花5分钟深呼吸",
        ),
        Language::Spanish => (
            &["feliz", "agradecido"],
            "El almuerzo estuvo genial.",
            "Sigue cuidando este estado que te nutre.",
            "Respirar hondo durante 5 minutos",
        ),
        Language::English => (
            &["happy", "grateful"],
            "Lunch was great.",
            "Keep nurturing this state.",
            "Take 5 minutes to breathe deeply",
        ),
    };

    vec![MoodEntry {
        id: EntryId::from("demo-1"),
        timestamp,
        mood_type: MoodType::Pleasant,
        emotions: emotions.iter().map(|e| e.to_string()).collect(),
        intensity: Intensity::clamped(75),
        note: Some(note.into()),
        cause: None,
        ai_analysis: None,
        advice: Some(advice.into()),
        image: None,
        categories: None,
        guidance_question: None,
        guidance_answer: None,
        body_sensations: None,
        growth_goal: Some(GrowthGoal {
            text: goal.into(),
            is_completed: true,
            is_harvested: false,
        }),
    }]
}
