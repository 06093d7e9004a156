//! The user profile and its forward-compatible migration.
//!
//! Persisted profiles come from older app versions with missing or mistyped
//! fields. [`migrate`] merges whatever is present over documented defaults
//! field by field, so a partially readable profile keeps everything it can.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::achievement::{AchievementId, BASELINE};
use crate::error::ValidationError;
use crate::model::entry::ImageRef;

/// Interface and reflection language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    English,
    Chinese,
    Spanish,
}

impl Language {
    /// Short code used in fallback tables and logs.
    pub fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::Chinese => "zh",
            Self::Spanish => "es",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "english" | "en" => Some(Self::English),
            "chinese" | "zh" => Some(Self::Chinese),
            "spanish" | "es" => Some(Self::Spanish),
            _ => None,
        }
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    /// Accepts the English name or the short code, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("unknown language \"{}\"", s.trim()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::English => "English",
            Self::Chinese => "Chinese",
            Self::Spanish => "Spanish",
        })
    }
}

/// Voice of AI reflections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AiStyle {
    #[default]
    Empathetic,
    Direct,
    Poetic,
}

/// Allowed caps on concurrently growing seeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum GoalLimit {
    #[default]
    Three,
    Five,
    Seven,
}

impl GoalLimit {
    pub fn get(self) -> usize {
        match self {
            Self::Three => 3,
            Self::Five => 5,
            Self::Seven => 7,
        }
    }
}

impl TryFrom<i64> for GoalLimit {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            3 => Ok(Self::Three),
            5 => Ok(Self::Five),
            7 => Ok(Self::Seven),
            _ => Err(ValidationError::InvalidGoalLimit { value }),
        }
    }
}

impl Serialize for GoalLimit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.get() as u8)
    }
}

impl<'de> Deserialize<'de> for GoalLimit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Self::try_from(raw).map_err(serde::de::Error::custom)
    }
}

/// User-tunable behaviour.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(rename = "notifications")]
    pub notifications_enabled: bool,
    pub ai_style: AiStyle,
    pub language: Language,
    pub ai_enabled: bool,
    pub max_active_goals: GoalLimit,
}

impl Preferences {
    pub fn with_language(language: Language) -> Self {
        Self {
            language,
            ..Self::default()
        }
    }
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            notifications_enabled: true,
            ai_style: AiStyle::default(),
            language: Language::default(),
            ai_enabled: true,
            max_active_goals: GoalLimit::default(),
        }
    }
}

/// Onboarding quiz answers fed into persona generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswers {
    pub stress_handling: String,
    pub recharge_method: String,
}

/// A photo captured in a rush, waiting for reflection before it becomes an
/// entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrozenCapture {
    pub timestamp: DateTime<FixedOffset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
}

/// Unlocked achievement ids in unlock order, without duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UnlockedSet(Vec<AchievementId>);

impl UnlockedSet {
    /// The first-run set: just the baseline achievement.
    pub fn baseline() -> Self {
        Self(vec![AchievementId::from(BASELINE)])
    }

    pub fn contains(&self, id: &AchievementId) -> bool {
        self.0.contains(id)
    }

    /// Add an id. Returns false if it was already present.
    pub fn insert(&mut self, id: AchievementId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.0.push(id);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &AchievementId> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn from_value(raw: Option<&Value>) -> Self {
        let mut set = Self(Vec::new());
        for id in raw.and_then(Value::as_array).into_iter().flatten() {
            if let Some(id) = id.as_str().filter(|s| !s.trim().is_empty()) {
                set.insert(AchievementId::from(id.trim()));
            }
        }
        if set.is_empty() { Self::baseline() } else { set }
    }
}

impl Default for UnlockedSet {
    fn default() -> Self {
        Self::baseline()
    }
}

/// The single user of the journal.
///
/// Created once with defaults, edited in place, never deleted (only reset).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub mbti: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_answers: Option<QuizAnswers>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotional_profile: Option<String>,
    pub has_onboarded: bool,
    pub preferences: Preferences,
    #[serde(rename = "unlockedAnimals")]
    pub unlocked: UnlockedSet,
    pub pending_frozen_entry: Option<FrozenCapture>,
    /// Fields written by newer versions, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Placeholder personality type before onboarding.
pub const UNKNOWN_MBTI: &str = "Unknown";

impl UserProfile {
    /// First-run defaults in the given interface language.
    pub fn new(language: Language) -> Self {
        Self {
            name: String::new(),
            mbti: UNKNOWN_MBTI.into(),
            quiz_answers: None,
            emotional_profile: None,
            has_onboarded: false,
            preferences: Preferences::with_language(language),
            unlocked: UnlockedSet::baseline(),
            pending_frozen_entry: None,
            extra: Map::new(),
        }
    }
}

impl Default for UserProfile {
    fn default() -> Self {
        Self::new(Language::default())
    }
}

impl<'de> Deserialize<'de> for UserProfile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(migrate(&raw, Language::default()))
    }
}

const KNOWN_FIELDS: &[&str] = &[
    "name",
    "mbti",
    "quizAnswers",
    "emotionalProfile",
    "hasOnboarded",
    "preferences",
    "unlockedAnimals",
    "unlockedAchievements",
    "pendingFrozenEntry",
    "spiritAnimal",
];

/// Merge a persisted profile of any vintage over first-run defaults.
///
/// Anything that is not an object yields pure defaults. Ill-typed fields fall
/// back individually; `maxActiveGoals` outside {3, 5, 7} resets to 3; an
/// absent or empty unlocked set becomes the baseline set. The retired
/// single `spiritAnimal` field is dropped.
pub fn migrate(raw: &Value, default_language: Language) -> UserProfile {
    let mut profile = UserProfile::new(default_language);
    let Some(obj) = raw.as_object() else {
        return profile;
    };

    if let Some(name) = obj.get("name").and_then(Value::as_str) {
        profile.name = name.to_string();
    }
    if let Some(mbti) = obj
        .get("mbti")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
    {
        profile.mbti = mbti.to_string();
    }
    profile.quiz_answers = obj
        .get("quizAnswers")
        .and_then(|v| QuizAnswers::deserialize(v).ok());
    profile.emotional_profile = obj
        .get("emotionalProfile")
        .and_then(Value::as_str)
        .map(str::to_string);
    profile.has_onboarded = obj
        .get("hasOnboarded")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    profile.preferences = migrate_preferences(obj.get("preferences"), default_language);
    profile.unlocked = UnlockedSet::from_value(
        obj.get("unlockedAnimals")
            .or_else(|| obj.get("unlockedAchievements")),
    );
    profile.pending_frozen_entry = obj
        .get("pendingFrozenEntry")
        .filter(|v| !v.is_null())
        .and_then(|v| match FrozenCapture::deserialize(v) {
            Ok(capture) => Some(capture),
            Err(e) => {
                tracing::warn!(error = %e, "dropping unreadable frozen capture");
                None
            }
        });

    profile.extra = obj
        .iter()
        .filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    profile
}

fn migrate_preferences(raw: Option<&Value>, default_language: Language) -> Preferences {
    let mut prefs = Preferences::with_language(default_language);
    let Some(obj) = raw.and_then(Value::as_object) else {
        return prefs;
    };

    if let Some(on) = obj
        .get("notifications")
        .or_else(|| obj.get("notificationsEnabled"))
        .and_then(Value::as_bool)
    {
        prefs.notifications_enabled = on;
    }
    if let Some(style) = obj
        .get("aiStyle")
        .and_then(|v| AiStyle::deserialize(v).ok())
    {
        prefs.ai_style = style;
    }
    if let Some(language) = obj
        .get("language")
        .and_then(Value::as_str)
        .and_then(Language::parse)
    {
        prefs.language = language;
    }
    if let Some(enabled) = obj.get("aiEnabled").and_then(Value::as_bool) {
        prefs.ai_enabled = enabled;
    }
    prefs.max_active_goals = obj
        .get("maxActiveGoals")
        .and_then(Value::as_i64)
        .and_then(|v| GoalLimit::try_from(v).ok())
        .unwrap_or_default();
    prefs
}

/// A partial profile edit. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub mbti: Option<String>,
    pub quiz_answers: Option<QuizAnswers>,
    pub emotional_profile: Option<String>,
    pub has_onboarded: Option<bool>,
    pub notifications_enabled: Option<bool>,
    pub ai_style: Option<AiStyle>,
    pub language: Option<Language>,
    pub ai_enabled: Option<bool>,
    pub max_active_goals: Option<GoalLimit>,
}

impl ProfilePatch {
    /// Apply to `profile`. Returns whether anything changed.
    pub(crate) fn apply(&self, profile: &mut UserProfile) -> bool {
        let before = profile.clone();
        if let Some(name) = &self.name {
            profile.name = name.trim().to_string();
        }
        if let Some(mbti) = &self.mbti {
            let mbti = mbti.trim();
            profile.mbti = if mbti.is_empty() { UNKNOWN_MBTI.into() } else { mbti.into() };
        }
        if let Some(answers) = &self.quiz_answers {
            profile.quiz_answers = Some(answers.clone());
        }
        if let Some(persona) = &self.emotional_profile {
            profile.emotional_profile = Some(persona.clone());
        }
        if let Some(done) = self.has_onboarded {
            profile.has_onboarded = done;
        }
        let prefs = &mut profile.preferences;
        if let Some(on) = self.notifications_enabled {
            prefs.notifications_enabled = on;
        }
        if let Some(style) = self.ai_style {
            prefs.ai_style = style;
        }
        if let Some(language) = self.language {
            prefs.language = language;
        }
        if let Some(enabled) = self.ai_enabled {
            prefs.ai_enabled = enabled;
        }
        if let Some(limit) = self.max_active_goals {
            prefs.max_active_goals = limit;
        }
        *profile != before
    }
}
