//! Spirit-animal achievements and the unlock evaluator.
//!
//! The table below is fixed and ordered. Order is the tie-break rule: when an
//! append satisfies several locked predicates at once, only the earliest one
//! unlocks, and the rest wait for the next evaluation.

use std::fmt;

use chrono::{FixedOffset, Local, Timelike};
use serde::{Deserialize, Serialize};

use crate::model::{Language, MoodEntry, MoodType, UserProfile};

/// Id of the achievement every profile starts with.
pub const BASELINE: &str = "cat";

/// Stable achievement identifier, persisted in the profile's unlocked set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AchievementId(String);

impl AchievementId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AchievementId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Text in each supported language.
#[derive(Debug, Clone, Copy)]
pub struct Localized {
    pub en: &'static str,
    pub zh: &'static str,
    pub es: &'static str,
}

impl Localized {
    pub fn get(&self, language: Language) -> &'static str {
        match language {
            Language::English => self.en,
            Language::Chinese => self.zh,
            Language::Spanish => self.es,
        }
    }
}

/// History, profile, and the user's local offset for hour-of-day rules.
type Predicate = fn(&[MoodEntry], &UserProfile, FixedOffset) -> bool;

/// One row of the achievement table.
pub struct AchievementDef {
    pub id: &'static str,
    pub name: Localized,
    pub description: Localized,
    pub hint: Localized,
    predicate: Predicate,
}

impl AchievementDef {
    /// Whether the predicate holds for this history and profile, reading
    /// clock hours in `local`.
    pub fn is_satisfied(
        &self,
        history: &[MoodEntry],
        profile: &UserProfile,
        local: FixedOffset,
    ) -> bool {
        (self.predicate)(history, profile, local)
    }
}

impl fmt::Debug for AchievementDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AchievementDef").field("id", &self.id).finish_non_exhaustive()
    }
}

fn count_mood(history: &[MoodEntry], mood: MoodType) -> usize {
    history.iter().filter(|e| e.mood_type == mood).count()
}

fn any_mood(history: &[MoodEntry], mood: MoodType) -> bool {
    history.iter().any(|e| e.mood_type == mood)
}

/// Hour 22:00..=04:59 on the user's clock, whatever offset was stored.
fn is_late_night(entry: &MoodEntry, local: FixedOffset) -> bool {
    let hour = entry.timestamp.with_timezone(&local).hour();
    hour >= 22 || hour <= 4
}

/// Category tags that count as "relationships", per interface language.
const RELATIONSHIP_TAGS: &[&str] = &["Relationships", "人际", "Relaciones"];

static ACHIEVEMENTS: [AchievementDef; 8] = [
    AchievementDef {
        id: BASELINE,
        name: Localized { en: "The Observer", zh: "观察者·猫", es: "El Observador" },
        description: Localized {
            en: "Quiet, independent, and deeply observant. You value your own space.",
            zh: "安静、独立且观察敏锐。你珍视属于自己的空间。",
            es: "Tranquilo, independiente y profundamente observador.",
        },
        hint: Localized { en: "Always with you.", zh: "始终相伴。", es: "Siempre contigo." },
        predicate: |_, _, _| true,
    },
    AchievementDef {
        id: "dolphin",
        name: Localized { en: "The Joyful", zh: "喜悦者·海豚", es: "El Alegre" },
        description: Localized {
            en: "Playful and connected. You find happiness in shared moments.",
            zh: "顽皮且充满联结感。你在分享的时刻中找到快乐。",
            es: "Juguetón y conectado.",
        },
        hint: Localized {
            en: "Log 2 Pleasant moods.",
            zh: "记录 2 次“愉悦”心情。",
            es: "Registra 2 estados de ánimo agradables.",
        },
        predicate: |history, _, _| count_mood(history, MoodType::Pleasant) >= 2,
    },
    AchievementDef {
        id: "owl",
        name: Localized { en: "The Wise", zh: "智者·猫头鹰", es: "El Sabio" },
        description: Localized {
            en: "You find clarity in solitude and late hours.",
            zh: "你在独处和深夜中找到清晰的思绪。",
            es: "Encuentras claridad en la soledad.",
        },
        hint: Localized {
            en: "Log an entry late at night.",
            zh: "在深夜记录一次心情。",
            es: "Registra una entrada tarde en la noche.",
        },
        predicate: |history, _, local| history.iter().any(|e| is_late_night(e, local)),
    },
    AchievementDef {
        id: "lion",
        name: Localized { en: "The Brave", zh: "勇者·狮子", es: "El Valiente" },
        description: Localized {
            en: "Full of energy and courage. You embrace intensity.",
            zh: "充满能量与勇气。你拥抱强烈的情感。",
            es: "Lleno de energía y coraje.",
        },
        hint: Localized {
            en: "Log a Thrilled mood.",
            zh: "记录一次“激动”心情。",
            es: "Registra un estado de ánimo emocionado.",
        },
        predicate: |history, _, _| any_mood(history, MoodType::Thrilled),
    },
    AchievementDef {
        id: "koala",
        name: Localized { en: "The Peaceful", zh: "平和者·考拉", es: "El Pacífico" },
        description: Localized {
            en: "Calmness is your superpower. You stay grounded.",
            zh: "平静是你的超能力。你始终脚踏实地。",
            es: "La calma es tu superpoder.",
        },
        hint: Localized {
            en: "Log 3 Calm moods.",
            zh: "记录 3 次“平静”心情。",
            es: "Registra 3 estados de ánimo tranquilos.",
        },
        predicate: |history, _, _| count_mood(history, MoodType::Calm) >= 3,
    },
    AchievementDef {
        id: "fox",
        name: Localized { en: "The Survivor", zh: "幸存者·狐狸", es: "El Superviviente" },
        description: Localized {
            en: "Clever and resilient. You navigate stress with adaptability.",
            zh: "聪明且坚韧。你用适应力应对压力。",
            es: "Inteligente y resistente.",
        },
        hint: Localized {
            en: "Log a Stressful mood.",
            zh: "记录一次“紧绷”心情。",
            es: "Registra un estado de ánimo estresante.",
        },
        predicate: |history, _, _| any_mood(history, MoodType::Stressful),
    },
    AchievementDef {
        id: "butterfly",
        name: Localized { en: "The Transformer", zh: "蜕变者·蝴蝶", es: "El Transformador" },
        description: Localized {
            en: "Constantly growing. You value the journey of change.",
            zh: "不断成长。你珍视改变的旅程。",
            es: "Creciendo constantemente.",
        },
        hint: Localized {
            en: "Reach 5 total entries.",
            zh: "累计记录 5 篇日记。",
            es: "Alcanza 5 entradas totales.",
        },
        predicate: |history, _, _| history.len() >= 5,
    },
    AchievementDef {
        id: "wolf",
        name: Localized { en: "The Guardian", zh: "守护者·狼", es: "El Guardián" },
        description: Localized {
            en: "Loyal and protective. Relationships define your strength.",
            zh: "忠诚且具保护欲。人际关系定义了你的力量。",
            es: "Leal y protector.",
        },
        hint: Localized {
            en: "Tag an entry with \"Relationships\".",
            zh: "使用“人际”标签记录一次。",
            es: "Etiqueta una entrada con \"Relaciones\".",
        },
        predicate: |history, _, _| {
            history
                .iter()
                .any(|e| RELATIONSHIP_TAGS.iter().any(|tag| e.has_category(tag)))
        },
    },
];

/// The full table, in evaluation order.
pub fn all() -> &'static [AchievementDef] {
    &ACHIEVEMENTS
}

/// Look up a definition by id.
pub fn definition(id: &AchievementId) -> Option<&'static AchievementDef> {
    ACHIEVEMENTS.iter().find(|def| def.id == id.as_str())
}

/// The first locked achievement whose predicate holds, if any, judged in
/// the machine's current local offset.
///
/// Pure: the caller records the unlock.
pub fn evaluate(history: &[MoodEntry], profile: &UserProfile) -> Option<AchievementId> {
    evaluate_in(history, profile, *Local::now().offset())
}

/// [`evaluate`] with an explicit local offset, e.g. from an injected clock.
pub fn evaluate_in(
    history: &[MoodEntry],
    profile: &UserProfile,
    local: FixedOffset,
) -> Option<AchievementId> {
    ACHIEVEMENTS
        .iter()
        .find(|def| {
            !profile.unlocked.contains(&AchievementId::from(def.id))
                && def.is_satisfied(history, profile, local)
        })
        .map(|def| AchievementId::from(def.id))
}

/// Display strings for one achievement in one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AchievementDisplay {
    pub id: AchievementId,
    pub name: &'static str,
    pub description: &'static str,
    pub hint: &'static str,
}

/// Localized name, description and unlock hint. `None` for unknown ids,
/// which older or newer profiles may carry.
pub fn display(id: &AchievementId, language: Language) -> Option<AchievementDisplay> {
    definition(id).map(|def| AchievementDisplay {
        id: id.clone(),
        name: def.name.get(language),
        description: def.description.get(language),
        hint: def.hint.get(language),
    })
}

/// One row of the collection view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub id: AchievementId,
    pub unlocked: bool,
}

/// Every definition with its unlocked flag, in table order.
pub fn progress(profile: &UserProfile) -> Vec<Progress> {
    ACHIEVEMENTS
        .iter()
        .map(|def| {
            let id = AchievementId::from(def.id);
            Progress {
                unlocked: profile.unlocked.contains(&id),
                id,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntryDraft;
    use chrono::DateTime;

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    fn entry(mood: MoodType, when: &str) -> MoodEntry {
        EntryDraft::new(mood).at(at(when)).into_entry(at(when)).unwrap()
    }

    fn utc8() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    /// Evaluate as a device set to UTC+8.
    fn evaluate(history: &[MoodEntry], profile: &UserProfile) -> Option<AchievementId> {
        evaluate_in(history, profile, utc8())
    }

    fn unlocked(profile: &mut UserProfile, id: &str) {
        profile.unlocked.insert(AchievementId::from(id));
    }

    #[test]
    fn table_order_is_fixed() {
        let ids: Vec<_> = all().iter().map(|d| d.id).collect();
        assert_eq!(
            ids,
            ["cat", "dolphin", "owl", "lion", "koala", "fox", "butterfly", "wolf"]
        );
    }

    #[test]
    fn baseline_is_preunlocked() {
        let profile = UserProfile::default();
        assert!(profile.unlocked.contains(&AchievementId::from(BASELINE)));
        assert_eq!(evaluate(&[], &profile), None);
    }

    #[test]
    fn pleasant_needs_two_entries() {
        let profile = UserProfile::default();
        let one = vec![entry(MoodType::Pleasant, "2026-05-10T10:00:00+08:00")];
        assert_eq!(evaluate(&one, &profile), None);

        let two = vec![
            entry(MoodType::Pleasant, "2026-05-10T10:00:00+08:00"),
            entry(MoodType::Pleasant, "2026-05-10T11:00:00+08:00"),
        ];
        assert_eq!(evaluate(&two, &profile), Some(AchievementId::from("dolphin")));
    }

    #[test]
    fn earliest_definition_wins_a_tie() {
        let profile = UserProfile::default();
        // Satisfies owl, lion and fox at once.
        let history = vec![
            entry(MoodType::Thrilled, "2026-05-10T23:30:00+08:00"),
            entry(MoodType::Stressful, "2026-05-10T09:00:00+08:00"),
        ];
        assert_eq!(evaluate(&history, &profile), Some(AchievementId::from("owl")));

        let mut profile = profile;
        unlocked(&mut profile, "owl");
        assert_eq!(evaluate(&history, &profile), Some(AchievementId::from("lion")));
        unlocked(&mut profile, "lion");
        assert_eq!(evaluate(&history, &profile), Some(AchievementId::from("fox")));
    }

    #[test]
    fn late_night_boundaries() {
        let profile = UserProfile::default();
        let history = vec![entry(MoodType::Irritating, "2026-05-10T05:30:00+08:00")];
        assert_eq!(evaluate(&history, &profile), None);
        let history = vec![entry(MoodType::Irritating, "2026-05-10T04:59:00+08:00")];
        assert_eq!(evaluate(&history, &profile), Some(AchievementId::from("owl")));
        let history = vec![entry(MoodType::Irritating, "2026-05-10T22:00:00+08:00")];
        assert_eq!(evaluate(&history, &profile), Some(AchievementId::from("owl")));
    }

    #[test]
    fn utc_timestamps_are_judged_on_the_local_clock() {
        let profile = UserProfile::default();
        let raw = serde_json::json!([
            {"id": "late", "timestamp": "2026-05-10T15:30:00.000Z", "moodType": "Calm"}
        ]);
        // 15:30 UTC is 23:30 at UTC+8.
        let late = crate::model::parse_history(&raw).unwrap();
        assert_eq!(evaluate(&late, &profile), Some(AchievementId::from("owl")));

        let raw = serde_json::json!([
            {"id": "morning", "timestamp": "2026-05-10T02:00:00.000Z", "moodType": "Calm"}
        ]);
        // 02:00 UTC is 10:00 at UTC+8.
        let morning = crate::model::parse_history(&raw).unwrap();
        assert_eq!(evaluate(&morning, &profile), None);

        // The same instant read on a UTC clock is late night.
        assert_eq!(
            evaluate_in(&morning, &profile, FixedOffset::east_opt(0).unwrap()),
            Some(AchievementId::from("owl"))
        );
    }

    #[test]
    fn relationships_tag_in_any_language() {
        let profile = UserProfile::default();
        let tagged = EntryDraft::new(MoodType::Irritating)
            .with_categories(["人际"])
            .into_entry(at("2026-05-10T12:00:00+08:00"))
            .unwrap();
        assert_eq!(evaluate(&[tagged], &profile), Some(AchievementId::from("wolf")));
    }

    #[test]
    fn display_is_localized() {
        let id = AchievementId::from("koala");
        assert_eq!(display(&id, Language::Chinese).unwrap().name, "平和者·考拉");
        assert_eq!(display(&id, Language::English).unwrap().hint, "Log 3 Calm moods.");
        assert!(display(&AchievementId::from("unicorn"), Language::English).is_none());
    }

    #[test]
    fn progress_marks_unlocked_rows() {
        let mut profile = UserProfile::default();
        unlocked(&mut profile, "fox");
        let rows = progress(&profile);
        assert_eq!(rows.len(), 8);
        assert!(rows[0].unlocked);
        assert!(rows[5].unlocked);
        assert!(!rows[1].unlocked);
    }
}
