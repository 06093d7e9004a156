//! Offline reflections: the content used whenever the model is unavailable.
//!
//! One pack per language is bundled into the library via `include_str!`.
//! Packs can be overridden from a directory holding `english.toml`,
//! `chinese.toml` and `spanish.toml`. Selection never uses randomness: a
//! FNV-1a hash of the request inputs picks the rotation offset, so the same
//! request always gets the same reflection.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::template;
use super::{
    CapturedMoment, EntryAnalysis, GROWTH_ACTIONS, GatewayError, GatewayResult, GrowthSuggestions,
    Insight, MoodRead, WEEKLY_SEEDS_MAX, WeeklyPlan,
};
use crate::model::{Language, MoodEntry, MoodType};

const BUNDLED_ENGLISH: &str = include_str!("../../data/fallback/english.toml");
const BUNDLED_CHINESE: &str = include_str!("../../data/fallback/chinese.toml");
const BUNDLED_SPANISH: &str = include_str!("../../data/fallback/spanish.toml");

const LANGUAGES: [Language; 3] = [Language::English, Language::Chinese, Language::Spanish];

fn file_name(language: Language) -> &'static str {
    match language {
        Language::English => "english.toml",
        Language::Chinese => "chinese.toml",
        Language::Spanish => "spanish.toml",
    }
}

fn bundled_source(language: Language) -> &'static str {
    match language {
        Language::English => BUNDLED_ENGLISH,
        Language::Chinese => BUNDLED_CHINESE,
        Language::Spanish => BUNDLED_SPANISH,
    }
}

// ── TOML deserialization helpers ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct PackToml {
    persona: String,
    insights: Vec<String>,
    emotions: HashMap<String, Vec<String>>,
    growth: GrowthToml,
    photo: PhotoToml,
    capture: CaptureToml,
    weekly: WeeklyToml,
}

#[derive(Debug, Deserialize)]
struct GrowthToml {
    positive_insights: Vec<String>,
    difficult_insights: Vec<String>,
    positive: Vec<String>,
    difficult: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PhotoToml {
    mood: String,
    emotions: Vec<String>,
    description: String,
}

#[derive(Debug, Deserialize)]
struct CaptureToml {
    mood: String,
    summary: String,
    advice: String,
    emotions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WeeklyToml {
    summary: String,
    seeds: Vec<String>,
}

// ── Validated pack ──────────────────────────────────────────────────────

/// Offline content for one language.
#[derive(Debug, Clone)]
pub struct FallbackPack {
    persona: String,
    insights: Vec<String>,
    emotions: HashMap<MoodType, Vec<String>>,
    positive_insights: Vec<String>,
    difficult_insights: Vec<String>,
    positive_actions: Vec<String>,
    difficult_actions: Vec<String>,
    photo: MoodRead,
    capture: CapturedMoment,
    weekly: WeeklyPlan,
}

impl FallbackPack {
    /// Parse and validate a pack written for `language`.
    pub fn parse(source: &str, language: Language) -> GatewayResult<Self> {
        let invalid = |message: String| GatewayError::FallbackData { language, message };

        let raw: PackToml = toml::from_str(source).map_err(|e| invalid(e.to_string()))?;

        let mut emotions = HashMap::new();
        for (name, words) in raw.emotions {
            let mood: MoodType = name
                .parse()
                .map_err(|_| invalid(format!("unknown mood \"{name}\" in [emotions]")))?;
            emotions.insert(mood, words);
        }
        for mood in MoodType::ALL {
            if emotions.get(&mood).is_none_or(|w| w.is_empty()) {
                return Err(invalid(format!("[emotions] has no words for {mood}")));
            }
        }

        non_empty("insights", &raw.insights).map_err(invalid)?;
        non_empty("growth.positive_insights", &raw.growth.positive_insights).map_err(invalid)?;
        non_empty("growth.difficult_insights", &raw.growth.difficult_insights).map_err(invalid)?;
        templated_pool("growth.positive", &raw.growth.positive, language).map_err(invalid)?;
        templated_pool("growth.difficult", &raw.growth.difficult, language).map_err(invalid)?;

        if raw.weekly.seeds.is_empty() || raw.weekly.seeds.len() > WEEKLY_SEEDS_MAX {
            return Err(invalid(format!(
                "weekly.seeds needs 1 to {WEEKLY_SEEDS_MAX} entries, found {}",
                raw.weekly.seeds.len()
            )));
        }
        if let Some(bad) = raw
            .weekly
            .seeds
            .iter()
            .find(|s| !template::matches_template(s, language))
        {
            return Err(invalid(format!("weekly seed does not follow the template: {bad}")));
        }

        let photo_mood: MoodType = raw
            .photo
            .mood
            .parse()
            .map_err(|_| invalid(format!("unknown photo mood \"{}\"", raw.photo.mood)))?;
        let capture_mood: MoodType = raw
            .capture
            .mood
            .parse()
            .map_err(|_| invalid(format!("unknown capture mood \"{}\"", raw.capture.mood)))?;

        Ok(Self {
            persona: raw.persona,
            insights: raw.insights,
            emotions,
            positive_insights: raw.growth.positive_insights,
            difficult_insights: raw.growth.difficult_insights,
            positive_actions: raw.growth.positive,
            difficult_actions: raw.growth.difficult,
            photo: MoodRead {
                mood_type: photo_mood,
                emotions: raw.photo.emotions,
                short_description: raw.photo.description,
            },
            capture: CapturedMoment {
                mood_type: capture_mood,
                summary: raw.capture.summary,
                advice: raw.capture.advice,
                emotions: raw.capture.emotions,
            },
            weekly: WeeklyPlan {
                pattern_summary: raw.weekly.summary,
                action_seeds: raw.weekly.seeds,
            },
        })
    }

    /// Last-resort English pack used when a bundled file fails to load.
    fn minimal() -> Self {
        let words = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let actions = words(&[
            "When I feel tense, I will take three slow breaths.",
            "When I feel restless, I will drink a glass of water.",
            "When emotions run high, I will step away for one minute.",
        ]);
        let emotions = MoodType::ALL
            .into_iter()
            .map(|m| (m, vec![m.as_str().to_lowercase()]))
            .collect();
        Self {
            persona: "You are a thoughtful soul.".into(),
            insights: words(&["Take a slow breath. You are doing fine."]),
            emotions,
            positive_insights: words(&["This good feeling is worth pausing for."]),
            difficult_insights: words(&["It makes sense that you feel this way."]),
            positive_actions: actions.clone(),
            difficult_actions: actions.clone(),
            photo: MoodRead {
                mood_type: MoodType::Pleasant,
                emotions: words(&["present"]),
                short_description: "A moment worth keeping.".into(),
            },
            capture: CapturedMoment {
                mood_type: MoodType::Stressful,
                summary: "Your body is feeling some strain right now.".into(),
                advice: "Breathe slowly. This will pass.".into(),
                emotions: words(&["tense"]),
            },
            weekly: WeeklyPlan {
                pattern_summary: "You met some strong feelings this week.".into(),
                action_seeds: actions[..1].to_vec(),
            },
        }
    }
}

fn non_empty(field: &str, pool: &[String]) -> Result<(), String> {
    if pool.iter().all(|s| s.trim().is_empty()) {
        return Err(format!("{field} must not be empty"));
    }
    Ok(())
}

fn templated_pool(field: &str, pool: &[String], language: Language) -> Result<(), String> {
    if pool.len() < GROWTH_ACTIONS {
        return Err(format!(
            "{field} needs at least {GROWTH_ACTIONS} actions, found {}",
            pool.len()
        ));
    }
    match pool
        .iter()
        .find(|a| !template::matches_template(a, language))
    {
        Some(bad) => Err(format!("{field} action does not follow the template: {bad}")),
        None => Ok(()),
    }
}

// ── Book ────────────────────────────────────────────────────────────────

/// Offline reflections for every supported language.
#[derive(Debug, Clone)]
pub struct FallbackBook {
    packs: HashMap<Language, FallbackPack>,
}

impl Default for FallbackBook {
    fn default() -> Self {
        Self::bundled()
    }
}

impl FallbackBook {
    /// Load the packs compiled into the library.
    ///
    /// A pack that fails to parse is logged and replaced by the English pack.
    pub fn bundled() -> Self {
        let mut packs = HashMap::new();
        for language in LANGUAGES {
            match FallbackPack::parse(bundled_source(language), language) {
                Ok(pack) => {
                    packs.insert(language, pack);
                }
                Err(e) => {
                    tracing::warn!(language = language.code(), error = %e, "skipping bundled fallback pack");
                }
            }
        }
        let english = packs
            .get(&Language::English)
            .cloned()
            .unwrap_or_else(FallbackPack::minimal);
        for language in LANGUAGES {
            packs.entry(language).or_insert_with(|| english.clone());
        }
        Self { packs }
    }

    /// Bundled packs, overridden by any `<language>.toml` found in `dir`.
    ///
    /// Unlike [`bundled`](Self::bundled), an invalid override is an error.
    pub fn from_dir(dir: &Path) -> GatewayResult<Self> {
        let mut book = Self::bundled();
        for language in LANGUAGES {
            let path = dir.join(file_name(language));
            if !path.is_file() {
                continue;
            }
            let source =
                std::fs::read_to_string(&path).map_err(|e| GatewayError::FallbackData {
                    language,
                    message: format!("{}: {e}", path.display()),
                })?;
            let pack = FallbackPack::parse(&source, language)?;
            tracing::debug!(language = language.code(), path = %path.display(), "fallback pack overridden");
            book.packs.insert(language, pack);
        }
        Ok(book)
    }

    fn pack(&self, language: Language) -> &FallbackPack {
        self.packs
            .get(&language)
            .or_else(|| self.packs.get(&Language::English))
            .unwrap_or_else(|| minimal_pack())
    }

    /// Default nuanced emotions for a mood.
    pub fn emotions_for(&self, mood: MoodType, language: Language) -> &[String] {
        self.pack(language)
            .emotions
            .get(&mood)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn mood_read(&self, language: Language) -> MoodRead {
        self.pack(language).photo.clone()
    }

    pub fn insight(&self, user_name: &str, recent: &[MoodEntry], language: Language) -> Insight {
        let mut parts = vec![user_name];
        parts.extend(recent.iter().map(|e| e.id.as_str()));
        let seed = fnv1a(&parts);
        Insight {
            text: pick(&self.pack(language).insights, seed).to_string(),
        }
    }

    /// An affirmation and three distinct actions from the pool matching the
    /// mood's polarity.
    pub fn growth(&self, mood: MoodType, context: &str, language: Language) -> GrowthSuggestions {
        let pack = self.pack(language);
        let (insights, pool) = if mood.is_positive() {
            (&pack.positive_insights, &pack.positive_actions)
        } else {
            (&pack.difficult_insights, &pack.difficult_actions)
        };
        let seed = fnv1a(&[mood.as_str(), context]);
        GrowthSuggestions {
            insight: pick(insights, seed).to_string(),
            actions: rotate(pool, seed, GROWTH_ACTIONS),
        }
    }

    pub fn captured_moment(&self, language: Language) -> CapturedMoment {
        self.pack(language).capture.clone()
    }

    pub fn entry_analysis(&self, mood: MoodType, cause: &str, language: Language) -> EntryAnalysis {
        let pack = self.pack(language);
        let seed = fnv1a(&[mood.as_str(), cause]);
        EntryAnalysis {
            emotions: self.emotions_for(mood, language).iter().take(3).cloned().collect(),
            summary: pick(&pack.insights, seed).to_string(),
        }
    }

    pub fn persona(&self, language: Language) -> String {
        self.pack(language).persona.clone()
    }

    pub fn weekly_plan(&self, language: Language) -> WeeklyPlan {
        self.pack(language).weekly.clone()
    }
}

fn minimal_pack() -> &'static FallbackPack {
    static MINIMAL: std::sync::LazyLock<FallbackPack> =
        std::sync::LazyLock::new(FallbackPack::minimal);
    &MINIMAL
}

// ── Deterministic selection ─────────────────────────────────────────────

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a over the parts, separated by a zero byte.
pub fn fnv1a(parts: &[&str]) -> u64 {
    let mut hash = FNV_OFFSET;
    for part in parts {
        for byte in part.bytes().chain(std::iter::once(0)) {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

fn pick(pool: &[String], seed: u64) -> &str {
    if pool.is_empty() {
        return "";
    }
    &pool[(seed % pool.len() as u64) as usize]
}

/// `count` consecutive items starting at the seeded offset, wrapping around.
fn rotate(pool: &[String], seed: u64, count: usize) -> Vec<String> {
    if pool.is_empty() {
        return Vec::new();
    }
    let start = (seed % pool.len() as u64) as usize;
    pool.iter()
        .cycle()
        .skip(start)
        .take(count.min(pool.len()))
        .cloned()
        .collect()
}
