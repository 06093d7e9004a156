//! The application state store: single owner of the profile and history.
//!
//! All mutation goes through [`JournalStore::dispatch`]. After every change to
//! the profile or history the changed records are persisted according to the
//! [`PersistMode`], and subscribers receive a [`StoreEvent`].
//!
//! Background work (AI calls) never touches the store directly: it sends a
//! keyed [`Action`] into [`JournalStore::completion_sender`], and the owner
//! applies it with [`JournalStore::pump`].

pub mod action;
pub mod persist;

pub use action::Action;
pub use persist::PersistMode;

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::achievement::{self, AchievementId};
use crate::error::{JournalResult, ValidationError};
use crate::garden::{self, Transition};
use crate::model::{
    Clock, EntryDraft, EntryId, Language, MoodEntry, SystemClock, UserProfile, migrate,
    parse_history, seed_history,
};
use crate::store::durable::DurableStore;
use crate::store::mem::MemStore;
use crate::store::{HISTORY_KEY, KvBackend, PROFILE_KEY, RecordStore};

use persist::Persister;

/// How a store is opened.
#[derive(Clone)]
pub struct StoreOptions {
    pub persist: PersistMode,
    /// Language for first-run defaults.
    pub language: Language,
    /// Show the example entry when no history has been saved yet.
    pub seed_history: bool,
    pub clock: Arc<dyn Clock>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            persist: PersistMode::Immediate,
            language: Language::default(),
            seed_history: true,
            clock: Arc::new(SystemClock),
        }
    }
}

impl std::fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreOptions")
            .field("persist", &self.persist)
            .field("language", &self.language)
            .field("seed_history", &self.seed_history)
            .finish_non_exhaustive()
    }
}

/// A non-blocking message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A record could not be saved; the session continues from memory.
    PersistenceFailed { key: String, message: String },
}

impl Notice {
    /// The record the notice is about.
    pub fn key(&self) -> &str {
        match self {
            Self::PersistenceFailed { key, .. } => key,
        }
    }
}

/// Presentation hints owned by the store and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transient {
    /// Entries whose seed was just completed and should play the harvest
    /// animation once.
    pub newly_harvested: BTreeSet<EntryId>,
    /// Achievement unlocked by the last append, until dismissed.
    pub pending_unlock: Option<AchievementId>,
    /// Oldest first.
    pub notices: Vec<Notice>,
}

/// Read-only view of the store.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub profile: &'a UserProfile,
    /// Newest first.
    pub history: &'a [MoodEntry],
    pub transient: &'a Transient,
}

/// Outcome of a successful [`JournalStore::dispatch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dispatched {
    /// Anything in the snapshot changed.
    pub changed: bool,
    /// The action named an entry that does not exist; nothing happened.
    pub stale: bool,
    /// Achievement newly unlocked by this action.
    pub unlocked: Option<AchievementId>,
}

impl Dispatched {
    fn stale() -> Self {
        Self {
            stale: true,
            ..Self::default()
        }
    }
}

/// Broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Changed { revision: u64 },
    Unlocked(AchievementId),
    Notice(Notice),
}

#[derive(Debug, Default)]
struct Dirty {
    profile: bool,
    history: bool,
    transient: bool,
    unlocked: Option<AchievementId>,
}

impl Dirty {
    fn any(&self) -> bool {
        self.profile || self.history || self.transient
    }
}

/// The central in-memory store.
pub struct JournalStore {
    profile: UserProfile,
    history: Vec<MoodEntry>,
    transient: Transient,
    revision: u64,
    default_language: Language,
    clock: Arc<dyn Clock>,
    persister: Persister,
    subscribers: Vec<Sender<StoreEvent>>,
    completion_tx: Sender<Action>,
    completion_rx: Receiver<Action>,
}

impl JournalStore {
    /// Load the profile and history from `backend`, substituting defaults for
    /// anything missing or unreadable.
    pub fn open(backend: Arc<dyn KvBackend>, options: StoreOptions) -> Self {
        let records = RecordStore::new(backend);
        let language = options.language;

        let profile = match records.load_value(PROFILE_KEY) {
            Some(raw) => migrate(&raw, language),
            None => UserProfile::new(language),
        };
        let history = match records.load_value(HISTORY_KEY).map(|raw| parse_history(&raw)) {
            Some(Some(history)) => history,
            Some(None) => {
                tracing::warn!(key = HISTORY_KEY, "history record is not an array, using defaults");
                default_history(&options, &profile)
            }
            None => default_history(&options, &profile),
        };

        tracing::info!(
            entries = history.len(),
            onboarded = profile.has_onboarded,
            "journal store opened"
        );

        let (completion_tx, completion_rx) = mpsc::channel();
        Self {
            profile,
            history,
            transient: Transient::default(),
            revision: 0,
            default_language: language,
            clock: options.clock,
            persister: Persister::new(records, options.persist),
            subscribers: Vec::new(),
            completion_tx,
            completion_rx,
        }
    }

    /// Open a store persisted in a redb file under `data_dir`.
    pub fn open_dir(data_dir: &Path, options: StoreOptions) -> JournalResult<Self> {
        let backend = DurableStore::open(data_dir)?;
        Ok(Self::open(Arc::new(backend), options))
    }

    /// A store over a fresh volatile backend.
    pub fn in_memory() -> Self {
        Self::open(Arc::new(MemStore::new()), StoreOptions::default())
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            profile: &self.profile,
            history: &self.history,
            transient: &self.transient,
        }
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    /// Newest first.
    pub fn history(&self) -> &[MoodEntry] {
        &self.history
    }

    pub fn entry(&self, id: &EntryId) -> Option<&MoodEntry> {
        self.history.iter().find(|e| &e.id == id)
    }

    pub fn transient(&self) -> &Transient {
        &self.transient
    }

    /// Incremented on every change to the snapshot.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The backend records, e.g. for export.
    pub fn records(&self) -> &RecordStore {
        self.persister.records()
    }

    /// Receive an event after every change. Dropped receivers are pruned.
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Sender for results of background work, applied by [`Self::pump`].
    pub fn completion_sender(&self) -> Sender<Action> {
        self.completion_tx.clone()
    }

    /// Apply every queued completion. Returns how many changed the store.
    ///
    /// Completions that fail validation or name vanished entries are logged
    /// and skipped.
    pub fn pump(&mut self) -> usize {
        let queued: Vec<Action> = self.completion_rx.try_iter().collect();
        let mut applied = 0;
        for action in queued {
            let name = action.name();
            match self.dispatch(action) {
                Ok(outcome) if outcome.changed => applied += 1,
                Ok(outcome) => {
                    tracing::debug!(action = name, stale = outcome.stale, "completion had no effect");
                }
                Err(e) => tracing::warn!(action = name, error = %e, "discarding completion"),
            }
        }
        self.collect_failures();
        applied
    }

    /// Block until every change so far is durable.
    pub fn flush(&mut self) {
        self.persister.flush();
        self.collect_failures();
    }

    /// The only mutation entry point.
    ///
    /// A validation error leaves the store untouched.
    pub fn dispatch(&mut self, action: Action) -> Result<Dispatched, ValidationError> {
        let name = action.name();
        let mut dirty = Dirty::default();

        match action {
            Action::SetProfile(patch) => {
                dirty.profile = patch.apply(&mut self.profile);
            }
            Action::ResetProfile => {
                let mut fresh = UserProfile::new(self.default_language);
                for id in self.profile.unlocked.iter() {
                    fresh.unlocked.insert(id.clone());
                }
                dirty.profile = fresh != self.profile;
                self.profile = fresh;
                dirty.transient = self.transient.pending_unlock.take().is_some();
            }
            Action::AppendEntry(draft) => {
                let entry = self.validate_append(draft)?;
                self.commit_entry(entry, &mut dirty);
            }
            Action::UpdateEntry { id, patch } => {
                patch.validate()?;
                let Some(entry) = self.entry_mut(&id) else {
                    return Ok(self.stale(name, &id));
                };
                dirty.history = patch.apply(entry)?;
            }
            Action::PlantGoal { id, text } => {
                let active = garden::active_count(&self.history);
                let limit = self.profile.preferences.max_active_goals;
                let Some(entry) = self.entry_mut(&id) else {
                    return Ok(self.stale(name, &id));
                };
                garden::plant(entry, &text, active, limit)?;
                tracing::debug!(entry_id = %id, "seed planted");
                dirty.history = true;
            }
            Action::ToggleCompletion(id) => {
                let active = garden::active_count(&self.history);
                let limit = self.profile.preferences.max_active_goals;
                let Some(entry) = self.entry_mut(&id) else {
                    return Ok(self.stale(name, &id));
                };
                // Reopening puts the seed back in the growing set.
                if entry
                    .growth_goal
                    .as_ref()
                    .is_some_and(|g| garden::GoalState::of(g) == garden::GoalState::Completed)
                {
                    garden::check_capacity(active, limit)?;
                }
                let transition = match entry.growth_goal.as_mut() {
                    Some(goal) => garden::toggle_completion(goal),
                    None => Transition::Ignored,
                };
                match transition {
                    Transition::Completed => {
                        self.transient.newly_harvested.insert(id.clone());
                        dirty.history = true;
                        dirty.transient = true;
                    }
                    Transition::Reopened => {
                        self.transient.newly_harvested.remove(&id);
                        dirty.history = true;
                        dirty.transient = true;
                    }
                    Transition::Ignored => {}
                }
                tracing::debug!(entry_id = %id, ?transition, "seed toggled");
            }
            Action::MarkHarvestedTransient(id) => {
                let Some(entry) = self.entry(&id) else {
                    return Ok(self.stale(name, &id));
                };
                let flowering = entry
                    .growth_goal
                    .as_ref()
                    .is_some_and(|g| g.is_completed && !g.is_harvested);
                if flowering {
                    dirty.transient = self.transient.newly_harvested.insert(id);
                }
            }
            Action::ClearHarvestedTransient(ids) => {
                let targets: Vec<EntryId> = match ids {
                    Some(ids) => ids,
                    None => self.transient.newly_harvested.iter().cloned().collect(),
                };
                for id in targets {
                    dirty.transient |= self.transient.newly_harvested.remove(&id);
                    if let Some(goal) = self.entry_mut(&id).and_then(|e| e.growth_goal.as_mut()) {
                        dirty.history |= garden::harvest(goal);
                    }
                }
            }
            Action::FreezeCapture(capture) => {
                self.profile.pending_frozen_entry = Some(capture);
                dirty.profile = true;
            }
            Action::ThawCapture(mut draft) => {
                let capture = self
                    .profile
                    .pending_frozen_entry
                    .clone()
                    .ok_or(ValidationError::NoPendingCapture)?;
                draft.timestamp = Some(capture.timestamp);
                if draft.image.is_none() {
                    draft.image = capture.image;
                }
                let entry = self.validate_append(draft)?;
                self.profile.pending_frozen_entry = None;
                dirty.profile = true;
                self.commit_entry(entry, &mut dirty);
            }
            Action::DiscardCapture => {
                dirty.profile = self.profile.pending_frozen_entry.take().is_some();
            }
            Action::DismissUnlock => {
                dirty.transient = self.transient.pending_unlock.take().is_some();
            }
            Action::DismissNotice => {
                if !self.transient.notices.is_empty() {
                    self.transient.notices.remove(0);
                    dirty.transient = true;
                }
            }
        }

        tracing::debug!(action = name, changed = dirty.any(), "dispatched");
        Ok(self.finish(dirty))
    }

    fn validate_append(&self, draft: EntryDraft) -> Result<MoodEntry, ValidationError> {
        let entry = draft.into_entry(self.clock.now())?;
        if self.entry(&entry.id).is_some() {
            return Err(ValidationError::DuplicateId {
                id: entry.id.to_string(),
            });
        }
        if entry.growth_goal.is_some() {
            garden::check_capacity(
                garden::active_count(&self.history),
                self.profile.preferences.max_active_goals,
            )?;
        }
        Ok(entry)
    }

    fn commit_entry(&mut self, entry: MoodEntry, dirty: &mut Dirty) {
        tracing::debug!(entry_id = %entry.id, mood = %entry.mood_type, "entry appended");
        self.history.insert(0, entry);
        dirty.history = true;

        let local = *self.clock.now().offset();
        if let Some(id) = achievement::evaluate_in(&self.history, &self.profile, local) {
            tracing::info!(achievement = %id, "achievement unlocked");
            self.profile.unlocked.insert(id.clone());
            self.transient.pending_unlock = Some(id.clone());
            dirty.profile = true;
            dirty.transient = true;
            dirty.unlocked = Some(id);
        }
    }

    fn entry_mut(&mut self, id: &EntryId) -> Option<&mut MoodEntry> {
        self.history.iter_mut().find(|e| &e.id == id)
    }

    fn stale(&self, action: &str, id: &EntryId) -> Dispatched {
        tracing::debug!(action, entry_id = %id, "ignoring action for unknown entry");
        Dispatched::stale()
    }

    fn finish(&mut self, dirty: Dirty) -> Dispatched {
        if dirty.profile {
            self.persist(PROFILE_KEY);
        }
        if dirty.history {
            self.persist(HISTORY_KEY);
        }
        self.collect_failures();

        let changed = dirty.any();
        if changed {
            self.revision += 1;
            self.emit(StoreEvent::Changed {
                revision: self.revision,
            });
        }
        if let Some(id) = &dirty.unlocked {
            self.emit(StoreEvent::Unlocked(id.clone()));
        }
        Dispatched {
            changed,
            stale: false,
            unlocked: dirty.unlocked,
        }
    }

    fn persist(&mut self, key: &'static str) {
        let result = if key == PROFILE_KEY {
            self.persister.write(key, &self.profile)
        } else {
            self.persister.write(key, &self.history)
        };
        if let Err(error) = result {
            tracing::warn!(key, error = %error, "record write failed, keeping state in memory");
            self.push_notice(Notice::PersistenceFailed {
                key: key.to_string(),
                message: error.to_string(),
            });
        }
    }

    fn collect_failures(&mut self) {
        for failure in self.persister.drain_failures() {
            self.push_notice(Notice::PersistenceFailed {
                key: failure.key,
                message: failure.error.to_string(),
            });
        }
    }

    /// Record a notice, replacing any earlier one for the same record.
    fn push_notice(&mut self, notice: Notice) {
        match self
            .transient
            .notices
            .iter_mut()
            .find(|n| n.key() == notice.key())
        {
            Some(existing) => *existing = notice.clone(),
            None => self.transient.notices.push(notice.clone()),
        }
        self.emit(StoreEvent::Notice(notice));
    }

    fn emit(&mut self, event: StoreEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

fn default_history(options: &StoreOptions, profile: &UserProfile) -> Vec<MoodEntry> {
    if options.seed_history {
        seed_history(options.clock.now(), profile.preferences.language)
    } else {
        Vec::new()
    }
}

impl std::fmt::Debug for JournalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalStore")
            .field("entries", &self.history.len())
            .field("revision", &self.revision)
            .field("persister", &self.persister)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        EntryPatch, FixedClock, FrozenCapture, GoalLimit, ImageRef, MoodType, ProfilePatch,
    };
    use chrono::{DateTime, FixedOffset};

    fn noon() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2026-05-10T12:00:00+02:00").unwrap()
    }

    fn options() -> StoreOptions {
        StoreOptions {
            seed_history: false,
            clock: Arc::new(FixedClock(noon())),
            ..StoreOptions::default()
        }
    }

    fn empty_store() -> (Arc<MemStore>, JournalStore) {
        let backend = Arc::new(MemStore::new());
        let store = JournalStore::open(backend.clone(), options());
        (backend, store)
    }

    fn append(store: &mut JournalStore, id: &str, mood: MoodType) -> Dispatched {
        store
            .dispatch(Action::AppendEntry(EntryDraft::new(mood).with_id(id)))
            .unwrap()
    }

    #[test]
    fn cold_start_seeds_one_example_entry() {
        let store = JournalStore::open(
            Arc::new(MemStore::new()),
            StoreOptions {
                clock: Arc::new(FixedClock(noon())),
                ..StoreOptions::default()
            },
        );
        assert_eq!(store.history().len(), 1);
        assert_eq!(store.history()[0].id.as_str(), "demo-1");
        assert!(!store.profile().has_onboarded);
    }

    #[test]
    fn append_prepends_and_persists() {
        let (backend, mut store) = empty_store();
        append(&mut store, "a", MoodType::Calm);
        append(&mut store, "b", MoodType::Irritating);
        let ids: Vec<_> = store.history().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(backend.get(HISTORY_KEY).unwrap().is_some());
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn rejected_append_leaves_state_untouched() {
        let (_, mut store) = empty_store();
        append(&mut store, "a", MoodType::Calm);
        let before = store.history().to_vec();
        let err = store
            .dispatch(Action::AppendEntry(
                EntryDraft::new(MoodType::Calm).with_intensity(101),
            ))
            .unwrap_err();
        assert_eq!(err, ValidationError::IntensityOutOfRange { value: 101 });
        assert_eq!(store.history(), before.as_slice());

        let err = store
            .dispatch(Action::AppendEntry(EntryDraft::new(MoodType::Calm).with_id("a")))
            .unwrap_err();
        assert_eq!(err, ValidationError::DuplicateId { id: "a".into() });
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn second_pleasant_entry_unlocks_once() {
        let (_, mut store) = empty_store();
        let events = store.subscribe();

        assert_eq!(append(&mut store, "p1", MoodType::Pleasant).unlocked, None);
        let outcome = append(&mut store, "p2", MoodType::Pleasant);
        assert_eq!(outcome.unlocked, Some(AchievementId::from("dolphin")));
        assert_eq!(
            store.transient().pending_unlock,
            Some(AchievementId::from("dolphin"))
        );
        assert_eq!(append(&mut store, "p3", MoodType::Pleasant).unlocked, None);

        let unlocks: Vec<_> = events
            .try_iter()
            .filter(|e| matches!(e, StoreEvent::Unlocked(_)))
            .collect();
        assert_eq!(unlocks, vec![StoreEvent::Unlocked(AchievementId::from("dolphin"))]);

        store.dispatch(Action::DismissUnlock).unwrap();
        assert_eq!(store.transient().pending_unlock, None);
    }

    #[test]
    fn stale_ids_are_no_ops() {
        let (_, mut store) = empty_store();
        let ghost = EntryId::from("ghost");
        for action in [
            Action::ToggleCompletion(ghost.clone()),
            Action::PlantGoal { id: ghost.clone(), text: "When tired, I will rest.".into() },
            Action::UpdateEntry { id: ghost.clone(), patch: EntryPatch::default() },
            Action::MarkHarvestedTransient(ghost.clone()),
        ] {
            let outcome = store.dispatch(action).unwrap();
            assert!(outcome.stale);
            assert!(!outcome.changed);
        }
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn plant_toggle_and_harvest() {
        let (_, mut store) = empty_store();
        append(&mut store, "e1", MoodType::Stressful);
        let id = EntryId::from("e1");
        store
            .dispatch(Action::PlantGoal {
                id: id.clone(),
                text: "When stressed, I will breathe.".into(),
            })
            .unwrap();

        store.dispatch(Action::ToggleCompletion(id.clone())).unwrap();
        let goal = store.entry(&id).unwrap().growth_goal.clone().unwrap();
        assert!(goal.is_completed);
        assert!(!goal.is_harvested);
        assert!(store.transient().newly_harvested.contains(&id));

        store.dispatch(Action::ClearHarvestedTransient(None)).unwrap();
        assert!(store.transient().newly_harvested.is_empty());
        let goal = store.entry(&id).unwrap().growth_goal.clone().unwrap();
        assert!(goal.is_harvested);

        let outcome = store.dispatch(Action::ToggleCompletion(id.clone())).unwrap();
        assert!(!outcome.changed);
    }

    #[test]
    fn reopening_clears_the_marker() {
        let (_, mut store) = empty_store();
        store
            .dispatch(Action::AppendEntry(
                EntryDraft::new(MoodType::Calm)
                    .with_id("e1")
                    .with_goal("When calm, I will savor it."),
            ))
            .unwrap();
        let id = EntryId::from("e1");
        store.dispatch(Action::ToggleCompletion(id.clone())).unwrap();
        store.dispatch(Action::ToggleCompletion(id.clone())).unwrap();
        let goal = store.entry(&id).unwrap().growth_goal.clone().unwrap();
        assert!(!goal.is_completed);
        assert!(store.transient().newly_harvested.is_empty());
    }

    #[test]
    fn garden_cap_is_enforced() {
        let (_, mut store) = empty_store();
        for i in 0..3 {
            store
                .dispatch(Action::AppendEntry(
                    EntryDraft::new(MoodType::Irritating)
                        .with_id(format!("g{i}"))
                        .with_goal("When annoyed, I will step outside."),
                ))
                .unwrap();
        }
        let err = store
            .dispatch(Action::AppendEntry(
                EntryDraft::new(MoodType::Irritating).with_goal("When annoyed, I will sip water."),
            ))
            .unwrap_err();
        assert_eq!(err, ValidationError::GardenFull { active: 3, limit: 3 });

        store
            .dispatch(Action::SetProfile(ProfilePatch {
                max_active_goals: Some(GoalLimit::Five),
                ..Default::default()
            }))
            .unwrap();
        append(&mut store, "free", MoodType::Irritating);
        store
            .dispatch(Action::PlantGoal {
                id: EntryId::from("free"),
                text: "When annoyed, I will sip water.".into(),
            })
            .unwrap();
        assert_eq!(garden::active_count(store.history()), 4);
    }

    #[test]
    fn thaw_commits_the_frozen_capture() {
        let (_, mut store) = empty_store();
        let captured_at = DateTime::parse_from_rfc3339("2026-05-09T23:10:00+02:00").unwrap();
        store
            .dispatch(Action::FreezeCapture(FrozenCapture {
                timestamp: captured_at,
                image: Some(ImageRef::new("data:image/jpeg;base64,AAAA")),
            }))
            .unwrap();
        assert!(store.profile().pending_frozen_entry.is_some());

        let outcome = store
            .dispatch(Action::ThawCapture(
                EntryDraft::new(MoodType::Stressful).with_body_sensations(["racing heart"]),
            ))
            .unwrap();
        let entry = &store.history()[0];
        assert_eq!(entry.timestamp, captured_at);
        assert!(entry.image.is_some());
        assert!(store.profile().pending_frozen_entry.is_none());
        // 23:10 local satisfies the late-night achievement.
        assert_eq!(outcome.unlocked, Some(AchievementId::from("owl")));

        let err = store
            .dispatch(Action::ThawCapture(EntryDraft::new(MoodType::Calm)))
            .unwrap_err();
        assert_eq!(err, ValidationError::NoPendingCapture);
    }

    #[test]
    fn reset_keeps_unlocked_achievements() {
        let (_, mut store) = empty_store();
        append(&mut store, "s", MoodType::Stressful);
        store
            .dispatch(Action::SetProfile(ProfilePatch {
                name: Some("Ada".into()),
                has_onboarded: Some(true),
                ..Default::default()
            }))
            .unwrap();
        store.dispatch(Action::ResetProfile).unwrap();
        assert_eq!(store.profile().name, "");
        assert!(!store.profile().has_onboarded);
        assert!(store.profile().unlocked.contains(&AchievementId::from("fox")));
    }

    #[test]
    fn write_failure_becomes_a_notice() {
        let backend = Arc::new(MemStore::with_quota(16));
        let mut store = JournalStore::open(backend, options());
        let events = store.subscribe();
        let outcome = append(&mut store, "big", MoodType::Calm);
        assert!(outcome.changed);
        assert_eq!(store.history().len(), 1);
        assert!(matches!(
            store.transient().notices.first(),
            Some(Notice::PersistenceFailed { key, .. }) if key == HISTORY_KEY
        ));
        assert!(events.try_iter().any(|e| matches!(e, StoreEvent::Notice(_))));

        store.dispatch(Action::DismissNotice).unwrap();
        assert!(store.transient().notices.is_empty());
    }

    #[test]
    fn completions_apply_by_id() {
        let (_, mut store) = empty_store();
        append(&mut store, "e1", MoodType::Calm);
        let tx = store.completion_sender();
        tx.send(Action::UpdateEntry {
            id: EntryId::from("e1"),
            patch: EntryPatch {
                ai_analysis: Some("A steady day.".into()),
                ..Default::default()
            },
        })
        .unwrap();
        tx.send(Action::UpdateEntry {
            id: EntryId::from("gone"),
            patch: EntryPatch {
                ai_analysis: Some("late".into()),
                ..Default::default()
            },
        })
        .unwrap();
        assert_eq!(store.pump(), 1);
        assert_eq!(
            store.history()[0].ai_analysis.as_deref(),
            Some("A steady day.")
        );
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let (_, mut store) = empty_store();
        let rx = store.subscribe();
        drop(rx);
        append(&mut store, "a", MoodType::Calm);
        assert!(store.subscribers.is_empty());
    }

    #[test]
    fn reopening_respects_the_garden_cap() {
        let (_, mut store) = empty_store();
        // Three rounds of planting to the cap and completing everything.
        for round in 0..3 {
            for i in 0..3 {
                let id = format!("r{round}g{i}");
                store
                    .dispatch(Action::AppendEntry(
                        EntryDraft::new(MoodType::Stressful)
                            .with_id(id.as_str())
                            .with_goal("When stressed, I will breathe."),
                    ))
                    .unwrap();
                store
                    .dispatch(Action::ToggleCompletion(EntryId::from(id.as_str())))
                    .unwrap();
            }
        }
        assert_eq!(garden::active_count(store.history()), 0);

        let ids: Vec<EntryId> = store.history().iter().map(|e| e.id.clone()).collect();
        let mut refused = 0;
        for id in ids {
            let before = store.revision();
            match store.dispatch(Action::ToggleCompletion(id.clone())) {
                Ok(_) => {}
                Err(err) => {
                    assert_eq!(err, ValidationError::GardenFull { active: 3, limit: 3 });
                    assert!(store.entry(&id).unwrap().growth_goal.as_ref().unwrap().is_completed);
                    assert_eq!(store.revision(), before);
                    refused += 1;
                }
            }
        }
        assert_eq!(refused, 6);
        assert_eq!(garden::active_count(store.history()), 3);
    }

    #[test]
    fn repeated_write_failures_keep_one_notice_per_record() {
        let backend = Arc::new(MemStore::with_quota(16));
        let mut store = JournalStore::open(backend, options());
        let events = store.subscribe();
        for i in 0..5 {
            append(&mut store, &format!("e{i}"), MoodType::Calm);
        }
        let keys: Vec<&str> = store.transient().notices.iter().map(Notice::key).collect();
        assert_eq!(keys, vec![HISTORY_KEY, PROFILE_KEY]);
        // Subscribers still hear about every failure.
        let notices = events
            .try_iter()
            .filter(|e| matches!(e, StoreEvent::Notice(_)))
            .count();
        assert!(notices >= 5);
    }
}
