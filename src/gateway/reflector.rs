//! The only way the journal talks to the reflection model.
//!
//! [`Reflector`] runs each gateway call on a worker thread and waits at most
//! its timeout. Every call resolves to a [`Reflection`]: the model's answer
//! when it arrived in time and honours the contract, otherwise the
//! deterministic offline value from the [`FallbackBook`]. Errors are logged,
//! never returned.
//!
//! The `spawn_*` helpers are fire-and-forget: they run on their own thread
//! and deliver the result as an id-keyed [`Action`] on the store's completion
//! channel.

use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use super::template;
use super::{
    AiGateway, CapturedMoment, EntryAnalysis, FallbackBook, GROWTH_ACTIONS, GatewayResult,
    GrowthSuggestions, INSIGHT_HISTORY_MAX, Insight, MoodInput, MoodRead, WEEKLY_SEEDS_MAX,
    WeeklyPlan,
};
use crate::model::{
    EntryPatch, ImageRef, Language, MoodEntry, MoodType, Preferences, ProfilePatch, QuizAnswers,
    UserProfile,
};
use crate::state::Action;

/// Default wait for a model answer.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Why the offline value was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// `aiEnabled` is off in preferences.
    Disabled,
    /// No gateway is configured.
    NoGateway,
    /// Nothing to send (no photo or text, no entries).
    EmptyInput,
    /// The gateway returned an error.
    Error(String),
    /// No answer within the timeout.
    Timeout,
    /// The answer broke the structural contract.
    InvalidShape(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "ai disabled"),
            Self::NoGateway => write!(f, "no gateway configured"),
            Self::EmptyInput => write!(f, "empty input"),
            Self::Error(message) => write!(f, "gateway error: {message}"),
            Self::Timeout => write!(f, "timed out"),
            Self::InvalidShape(message) => write!(f, "invalid response: {message}"),
        }
    }
}

/// Where a reflection came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Model,
    Fallback(FallbackReason),
}

/// A gateway result that always carries a usable value.
#[derive(Debug, Clone, PartialEq)]
pub struct Reflection<T> {
    pub value: T,
    pub origin: Origin,
}

impl<T> Reflection<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self.origin, Origin::Fallback(_))
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Gateway calls with timeout, contract checks and offline fallback.
#[derive(Clone)]
pub struct Reflector {
    gateway: Option<Arc<dyn AiGateway>>,
    fallback: Arc<FallbackBook>,
    timeout: Duration,
}

impl fmt::Debug for Reflector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reflector")
            .field("gateway", &self.gateway.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Reflector {
    pub fn new(gateway: Option<Arc<dyn AiGateway>>, fallback: FallbackBook) -> Self {
        Self {
            gateway,
            fallback: Arc::new(fallback),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// A reflector that always answers from the bundled fallback book.
    pub fn offline() -> Self {
        Self::new(None, FallbackBook::bundled())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn fallback_book(&self) -> &FallbackBook {
        &self.fallback
    }

    /// Run `request` on a worker thread, waiting at most the timeout.
    fn call<T, F>(&self, prefs: &Preferences, request: F) -> Result<T, FallbackReason>
    where
        T: Send + 'static,
        F: FnOnce(&dyn AiGateway) -> GatewayResult<T> + Send + 'static,
    {
        if !prefs.ai_enabled {
            return Err(FallbackReason::Disabled);
        }
        let Some(gateway) = self.gateway.clone() else {
            return Err(FallbackReason::NoGateway);
        };

        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            // The receiver is gone if we already timed out.
            let _ = tx.send(request(gateway.as_ref()));
        });

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(FallbackReason::Error(e.to_string())),
            Err(RecvTimeoutError::Timeout) => Err(FallbackReason::Timeout),
            Err(RecvTimeoutError::Disconnected) => {
                Err(FallbackReason::Error("gateway worker exited".into()))
            }
        }
    }

    /// Check a model answer and fall back on any failure.
    fn settle<T>(
        request: &'static str,
        result: Result<T, FallbackReason>,
        check: impl FnOnce(T) -> Result<T, String>,
        fallback: impl FnOnce() -> T,
    ) -> Reflection<T> {
        let reason = match result.map(check) {
            Ok(Ok(value)) => {
                return Reflection {
                    value,
                    origin: Origin::Model,
                };
            }
            Ok(Err(message)) => FallbackReason::InvalidShape(message),
            Err(reason) => reason,
        };
        match &reason {
            FallbackReason::Disabled | FallbackReason::NoGateway | FallbackReason::EmptyInput => {
                tracing::debug!(request, reason = %reason, "using offline reflection");
            }
            _ => tracing::warn!(request, reason = %reason, "using offline reflection"),
        }
        Reflection {
            value: fallback(),
            origin: Origin::Fallback(reason),
        }
    }

    pub fn classify_mood(&self, prefs: &Preferences, input: &MoodInput) -> Reflection<MoodRead> {
        let language = prefs.language;
        let has_text = input.context.as_deref().is_some_and(|c| !c.trim().is_empty());
        let result = if input.image.is_none() && !has_text {
            Err(FallbackReason::EmptyInput)
        } else {
            let input = input.clone();
            self.call(prefs, move |g| g.classify_mood(&input, language))
        };
        Self::settle(
            "classify_mood",
            result,
            |mut read| {
                if read.emotions.is_empty() {
                    read.emotions = self.fallback.emotions_for(read.mood_type, language).to_vec();
                }
                Ok(read)
            },
            || self.fallback.mood_read(language),
        )
    }

    /// A dashboard insight from at most the five most recent entries.
    pub fn insight(
        &self,
        prefs: &Preferences,
        user_name: &str,
        recent: &[MoodEntry],
    ) -> Reflection<Insight> {
        let language = prefs.language;
        let recent = &recent[..recent.len().min(INSIGHT_HISTORY_MAX)];
        let name = user_name.to_string();
        let entries = recent.to_vec();
        let result = self.call(prefs, move |g| g.generate_insight(&name, &entries, language));
        Self::settle(
            "generate_insight",
            result,
            |insight| {
                let text = insight.text.trim();
                if text.is_empty() {
                    return Err("empty insight".into());
                }
                Ok(Insight { text: text.into() })
            },
            || self.fallback.insight(user_name, recent, language),
        )
    }

    /// An affirmation and exactly three template actions.
    pub fn growth_suggestions(
        &self,
        prefs: &Preferences,
        mood: MoodType,
        context: &str,
        categories: &[String],
    ) -> Reflection<GrowthSuggestions> {
        let language = prefs.language;
        let owned_context = context.to_string();
        let owned_categories = categories.to_vec();
        let result = self.call(prefs, move |g| {
            g.generate_growth_suggestions(mood, &owned_context, &owned_categories, language)
        });
        Self::settle(
            "generate_growth_suggestions",
            result,
            |s| check_growth(s, language),
            || self.fallback.growth(mood, context, language),
        )
    }

    pub fn captured_moment(
        &self,
        prefs: &Preferences,
        image: Option<&ImageRef>,
        tags: &[String],
    ) -> Reflection<CapturedMoment> {
        let language = prefs.language;
        let image = image.cloned();
        let tags = tags.to_vec();
        let result = self.call(prefs, move |g| {
            g.analyze_captured_moment(image.as_ref(), &tags, language)
        });
        Self::settle(
            "analyze_captured_moment",
            result,
            |moment| {
                if moment.summary.trim().is_empty() {
                    return Err("empty summary".into());
                }
                Ok(moment)
            },
            || self.fallback.captured_moment(language),
        )
    }

    pub fn entry_analysis(
        &self,
        prefs: &Preferences,
        mood: MoodType,
        cause: &str,
        image: Option<&ImageRef>,
    ) -> Reflection<EntryAnalysis> {
        let language = prefs.language;
        let owned_cause = cause.to_string();
        let image = image.cloned();
        let result = self.call(prefs, move |g| {
            g.analyze_mood_entry(mood, &owned_cause, image.as_ref(), language)
        });
        Self::settle(
            "analyze_mood_entry",
            result,
            |analysis| {
                if analysis.summary.trim().is_empty() && analysis.emotions.is_empty() {
                    return Err("empty analysis".into());
                }
                Ok(analysis)
            },
            || self.fallback.entry_analysis(mood, cause, language),
        )
    }

    pub fn persona(
        &self,
        prefs: &Preferences,
        name: &str,
        mbti: &str,
        quiz: Option<&QuizAnswers>,
    ) -> Reflection<String> {
        let language = prefs.language;
        let (name, mbti, quiz) = (name.to_string(), mbti.to_string(), quiz.cloned());
        let result = self.call(prefs, move |g| {
            g.generate_persona(&name, &mbti, quiz.as_ref(), language)
        });
        Self::settle(
            "generate_persona",
            result,
            |text| {
                let text = text.trim();
                if text.is_empty() {
                    return Err("empty persona".into());
                }
                Ok(text.to_string())
            },
            || self.fallback.persona(language),
        )
    }

    /// Pattern summary and one to three seeds for the week's intense entries.
    pub fn weekly_plan(&self, prefs: &Preferences, entries: &[MoodEntry]) -> Reflection<WeeklyPlan> {
        let language = prefs.language;
        let result = if entries.is_empty() {
            Err(FallbackReason::EmptyInput)
        } else {
            let entries = entries.to_vec();
            self.call(prefs, move |g| g.weekly_plan(&entries, language))
        };
        Self::settle(
            "weekly_plan",
            result,
            |plan| check_weekly(plan, language),
            || self.fallback.weekly_plan(language),
        )
    }

    // ── Fire-and-forget ─────────────────────────────────────────────────

    /// Analyse a freshly logged entry and send the result back by id.
    pub fn spawn_entry_analysis(
        &self,
        prefs: &Preferences,
        entry: &MoodEntry,
        completions: Sender<Action>,
    ) -> JoinHandle<()> {
        let reflector = self.clone();
        let prefs = prefs.clone();
        let id = entry.id.clone();
        let mood = entry.mood_type;
        let cause = entry
            .cause
            .clone()
            .or_else(|| entry.note.clone())
            .unwrap_or_default();
        let image = entry.image.clone();
        std::thread::spawn(move || {
            let analysis = reflector
                .entry_analysis(&prefs, mood, &cause, image.as_ref())
                .into_value();
            let patch = EntryPatch {
                ai_analysis: Some(analysis.summary).filter(|s| !s.trim().is_empty()),
                emotions: tags(analysis.emotions),
                ..EntryPatch::default()
            };
            deliver(&completions, Action::UpdateEntry { id, patch });
        })
    }

    /// Read a thawed rushed capture and send summary and advice back by id.
    pub fn spawn_capture_analysis(
        &self,
        prefs: &Preferences,
        entry: &MoodEntry,
        completions: Sender<Action>,
    ) -> JoinHandle<()> {
        let reflector = self.clone();
        let prefs = prefs.clone();
        let id = entry.id.clone();
        let image = entry.image.clone();
        let sensations = entry.body_sensations.clone().unwrap_or_default();
        std::thread::spawn(move || {
            let moment = reflector
                .captured_moment(&prefs, image.as_ref(), &sensations)
                .into_value();
            let patch = EntryPatch {
                ai_analysis: Some(moment.summary),
                advice: Some(moment.advice).filter(|s| !s.trim().is_empty()),
                emotions: tags(moment.emotions),
                ..EntryPatch::default()
            };
            deliver(&completions, Action::UpdateEntry { id, patch });
        })
    }

    /// Generate the persona text and store it on the profile.
    pub fn spawn_persona(
        &self,
        profile: &UserProfile,
        completions: Sender<Action>,
    ) -> JoinHandle<()> {
        let reflector = self.clone();
        let prefs = profile.preferences.clone();
        let name = profile.name.clone();
        let mbti = profile.mbti.clone();
        let quiz = profile.quiz_answers.clone();
        std::thread::spawn(move || {
            let persona = reflector
                .persona(&prefs, &name, &mbti, quiz.as_ref())
                .into_value();
            let patch = ProfilePatch {
                emotional_profile: Some(persona),
                ..ProfilePatch::default()
            };
            deliver(&completions, Action::SetProfile(patch));
        })
    }
}

/// Non-blank tags, or `None` to leave the entry's emotions alone.
fn tags(raw: Vec<String>) -> Option<Vec<String>> {
    let cleaned: Vec<String> = raw
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    (!cleaned.is_empty()).then_some(cleaned)
}

fn deliver(completions: &Sender<Action>, action: Action) {
    let name = action.name();
    if completions.send(action).is_err() {
        tracing::debug!(action = name, "store closed before completion arrived");
    }
}

fn check_growth(
    suggestions: GrowthSuggestions,
    language: Language,
) -> Result<GrowthSuggestions, String> {
    let insight = suggestions.insight.trim().to_string();
    if insight.is_empty() {
        return Err("empty insight".into());
    }
    if suggestions.actions.len() != GROWTH_ACTIONS {
        return Err(format!(
            "expected {GROWTH_ACTIONS} actions, got {}",
            suggestions.actions.len()
        ));
    }
    let actions: Vec<String> = suggestions
        .actions
        .iter()
        .map(|a| a.trim().to_string())
        .collect();
    if let Some(bad) = actions
        .iter()
        .find(|a| !template::matches_template(a, language))
    {
        return Err(format!("action does not follow the template: {bad}"));
    }
    Ok(GrowthSuggestions { insight, actions })
}

fn check_weekly(plan: WeeklyPlan, language: Language) -> Result<WeeklyPlan, String> {
    let pattern_summary = plan.pattern_summary.trim().to_string();
    if pattern_summary.is_empty() {
        return Err("empty pattern summary".into());
    }
    let seeds: Vec<String> = plan
        .action_seeds
        .iter()
        .map(|s| s.trim().to_string())
        .collect();
    if seeds.is_empty() || seeds.len() > WEEKLY_SEEDS_MAX {
        return Err(format!(
            "expected 1 to {WEEKLY_SEEDS_MAX} seeds, got {}",
            seeds.len()
        ));
    }
    if let Some(bad) = seeds
        .iter()
        .find(|s| !template::matches_template(s, language))
    {
        return Err(format!("seed does not follow the template: {bad}"));
    }
    Ok(WeeklyPlan {
        pattern_summary,
        action_seeds: seeds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayError;
    use crate::model::EntryDraft;
    use chrono::DateTime;
    use std::sync::Mutex;

    /// Gateway answering from canned values.
    #[derive(Default)]
    struct Canned {
        growth: Mutex<Option<GatewayResult<GrowthSuggestions>>>,
        delay: Option<Duration>,
        calls: Mutex<usize>,
    }

    impl Canned {
        fn growth(result: GatewayResult<GrowthSuggestions>) -> Self {
            Self {
                growth: Mutex::new(Some(result)),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }

        fn tick(&self) {
            *self.calls.lock().unwrap() += 1;
            if let Some(delay) = self.delay {
                std::thread::sleep(delay);
            }
        }
    }

    fn unsupported<T>() -> GatewayResult<T> {
        Err(GatewayError::RequestFailed {
            message: "not canned".into(),
        })
    }

    impl AiGateway for Canned {
        fn classify_mood(&self, _: &MoodInput, _: Language) -> GatewayResult<MoodRead> {
            self.tick();
            Ok(MoodRead {
                mood_type: MoodType::Calm,
                emotions: vec![],
                short_description: "Still water".into(),
            })
        }

        fn generate_insight(&self, _: &str, recent: &[MoodEntry], _: Language) -> GatewayResult<Insight> {
            self.tick();
            Ok(Insight {
                text: format!("  saw {} entries  ", recent.len()),
            })
        }

        fn generate_growth_suggestions(
            &self,
            _: MoodType,
            _: &str,
            _: &[String],
            _: Language,
        ) -> GatewayResult<GrowthSuggestions> {
            self.tick();
            self.growth.lock().unwrap().take().unwrap_or_else(unsupported)
        }

        fn analyze_captured_moment(
            &self,
            _: Option<&ImageRef>,
            tags: &[String],
            _: Language,
        ) -> GatewayResult<CapturedMoment> {
            self.tick();
            Ok(CapturedMoment {
                mood_type: MoodType::Thrilled,
                summary: format!("You felt {}.", tags.join(" and ")),
                advice: "Savour it.".into(),
                emotions: vec!["excited".into()],
            })
        }

        fn analyze_mood_entry(
            &self,
            _: MoodType,
            cause: &str,
            _: Option<&ImageRef>,
            _: Language,
        ) -> GatewayResult<EntryAnalysis> {
            self.tick();
            Ok(EntryAnalysis {
                emotions: vec!["proud".into()],
                summary: format!("About {cause}."),
            })
        }

        fn generate_persona(
            &self,
            name: &str,
            _: &str,
            _: Option<&QuizAnswers>,
            _: Language,
        ) -> GatewayResult<String> {
            self.tick();
            Ok(format!("{name} notices everything."))
        }

        fn weekly_plan(&self, _: &[MoodEntry], _: Language) -> GatewayResult<WeeklyPlan> {
            self.tick();
            Ok(WeeklyPlan {
                pattern_summary: "Mornings are hard.".into(),
                action_seeds: vec!["Make a list.".into()],
            })
        }
    }

    fn reflector(gateway: Canned) -> (Reflector, Arc<Canned>) {
        let gateway = Arc::new(gateway);
        let reflector = Reflector::new(
            Some(gateway.clone() as Arc<dyn AiGateway>),
            FallbackBook::bundled(),
        );
        (reflector, gateway)
    }

    fn prefs() -> Preferences {
        Preferences::default()
    }

    fn entry(id: &str) -> MoodEntry {
        let now = DateTime::parse_from_rfc3339("2026-05-10T10:00:00+00:00").unwrap();
        EntryDraft::new(MoodType::Pleasant)
            .with_id(id)
            .with_cause("a good talk")
            .into_entry(now)
            .unwrap()
    }

    #[test]
    fn disabled_ai_returns_conforming_fallback_without_calling() {
        let (reflector, gateway) = reflector(Canned::default());
        let prefs = Preferences {
            ai_enabled: false,
            ..prefs()
        };
        for language in [Language::English, Language::Chinese, Language::Spanish] {
            let prefs = Preferences { language, ..prefs.clone() };
            let growth = reflector.growth_suggestions(&prefs, MoodType::Stressful, "work", &[]);
            assert_eq!(growth.origin, Origin::Fallback(FallbackReason::Disabled));
            assert_eq!(growth.value.actions.len(), 3);
            for action in &growth.value.actions {
                assert!(template::matches_template(action, language));
            }
        }
        assert_eq!(gateway.calls(), 0);
    }

    #[test]
    fn valid_model_answer_is_used_and_trimmed() {
        let (reflector, _) = reflector(Canned::growth(Ok(GrowthSuggestions {
            insight: " You handled it. ".into(),
            actions: vec![
                " When stressed, I will breathe. ".into(),
                "When tired, I will rest.".into(),
                "When angry, I will walk.".into(),
            ],
        })));
        let growth = reflector.growth_suggestions(&prefs(), MoodType::Stressful, "", &[]);
        assert_eq!(growth.origin, Origin::Model);
        assert_eq!(growth.value.insight, "You handled it.");
        assert_eq!(growth.value.actions[0], "When stressed, I will breathe.");
    }

    #[test]
    fn wrong_action_count_falls_back() {
        let (reflector, _) = reflector(Canned::growth(Ok(GrowthSuggestions {
            insight: "ok".into(),
            actions: vec!["When tired, I will rest.".into()],
        })));
        let growth = reflector.growth_suggestions(&prefs(), MoodType::Calm, "", &[]);
        assert!(matches!(growth.origin, Origin::Fallback(FallbackReason::InvalidShape(_))));
        assert_eq!(growth.value.actions.len(), 3);
    }

    #[test]
    fn off_template_action_falls_back() {
        let (reflector, _) = reflector(Canned::growth(Ok(GrowthSuggestions {
            insight: "ok".into(),
            actions: vec![
                "Breathe.".into(),
                "When tired, I will rest.".into(),
                "When angry, I will walk.".into(),
            ],
        })));
        let growth = reflector.growth_suggestions(&prefs(), MoodType::Calm, "", &[]);
        assert!(growth.is_fallback());
    }

    #[test]
    fn gateway_error_falls_back() {
        let (reflector, _) = reflector(Canned::growth(Err(GatewayError::ModelNotFound {
            model: "x".into(),
        })));
        let growth = reflector.growth_suggestions(&prefs(), MoodType::Irritating, "", &[]);
        assert!(matches!(growth.origin, Origin::Fallback(FallbackReason::Error(_))));
    }

    #[test]
    fn slow_gateway_times_out() {
        let (reflector, _) = reflector(Canned {
            delay: Some(Duration::from_millis(500)),
            ..Canned::default()
        });
        let reflector = reflector.with_timeout(Duration::from_millis(20));
        let persona = reflector.persona(&prefs(), "Ada", "INFJ", None);
        assert_eq!(persona.origin, Origin::Fallback(FallbackReason::Timeout));
        assert!(!persona.value.is_empty());
    }

    #[test]
    fn no_gateway_is_offline() {
        let reflector = Reflector::offline();
        let insight = reflector.insight(&prefs(), "Ada", &[]);
        assert_eq!(insight.origin, Origin::Fallback(FallbackReason::NoGateway));
        assert!(!insight.value.text.is_empty());
    }

    #[test]
    fn insight_sees_at_most_five_entries() {
        let (reflector, _) = reflector(Canned::default());
        let history: Vec<MoodEntry> = (0..8).map(|i| entry(&format!("e{i}"))).collect();
        let insight = reflector.insight(&prefs(), "Ada", &history);
        assert_eq!(insight.value.text, "saw 5 entries");
    }

    #[test]
    fn classify_fills_missing_emotions_and_needs_input() {
        let (reflector, gateway) = reflector(Canned::default());
        let read = reflector.classify_mood(&prefs(), &MoodInput::text("sunny walk"));
        assert_eq!(read.origin, Origin::Model);
        assert_eq!(read.value.emotions, vec!["peaceful", "relaxed", "steady", "balanced"]);

        let empty = reflector.classify_mood(&prefs(), &MoodInput::default());
        assert_eq!(empty.origin, Origin::Fallback(FallbackReason::EmptyInput));
        assert_eq!(gateway.calls(), 1);
    }

    #[test]
    fn weekly_plan_requires_templated_seeds() {
        let (reflector, _) = reflector(Canned::default());
        let plan = reflector.weekly_plan(&prefs(), &[entry("e1")]);
        assert!(matches!(plan.origin, Origin::Fallback(FallbackReason::InvalidShape(_))));
        assert!(!plan.value.action_seeds.is_empty());
        assert!(plan.value.action_seeds.len() <= WEEKLY_SEEDS_MAX);

        let none = reflector.weekly_plan(&prefs(), &[]);
        assert_eq!(none.origin, Origin::Fallback(FallbackReason::EmptyInput));
    }

    #[test]
    fn spawned_analysis_sends_keyed_update() {
        let (reflector, _) = reflector(Canned::default());
        let (tx, rx) = mpsc::channel();
        let e = entry("e1");
        reflector.spawn_entry_analysis(&prefs(), &e, tx).join().unwrap();
        match rx.recv().unwrap() {
            Action::UpdateEntry { id, patch } => {
                assert_eq!(id.as_str(), "e1");
                assert_eq!(patch.ai_analysis.as_deref(), Some("About a good talk."));
                assert_eq!(patch.emotions, Some(vec!["proud".to_string()]));
                assert_eq!(patch.note, None);
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn spawned_persona_patches_profile() {
        let (reflector, _) = reflector(Canned::default());
        let (tx, rx) = mpsc::channel();
        let mut profile = UserProfile::default();
        profile.name = "Ada".into();
        reflector.spawn_persona(&profile, tx).join().unwrap();
        match rx.recv().unwrap() {
            Action::SetProfile(patch) => {
                assert_eq!(patch.emotional_profile.as_deref(), Some("Ada notices everything."));
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn spawned_capture_uses_body_tags() {
        let (reflector, _) = reflector(Canned::default());
        let (tx, rx) = mpsc::channel();
        let now = DateTime::parse_from_rfc3339("2026-05-10T23:30:00+00:00").unwrap();
        let e = EntryDraft::new(MoodType::Stressful)
            .with_id("c1")
            .with_body_sensations(["racing heart", "warm face"])
            .into_entry(now)
            .unwrap();
        reflector.spawn_capture_analysis(&prefs(), &e, tx).join().unwrap();
        let Action::UpdateEntry { patch, .. } = rx.recv().unwrap() else {
            panic!("expected an entry update");
        };
        assert_eq!(
            patch.ai_analysis.as_deref(),
            Some("You felt racing heart and warm face.")
        );
        assert_eq!(patch.advice.as_deref(), Some("Savour it."));
    }
}
