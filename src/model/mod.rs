//! Domain model: typed journal entities and their construction rules.
//!
//! Invariants are enforced when values are built ([`EntryDraft::into_entry`],
//! [`Intensity::new`], [`migrate`]) so the rest of the crate can take them for
//! granted. Nothing here touches storage or presentation.

pub mod entry;
pub mod profile;

pub use entry::{
    EntryDraft, EntryId, EntryPatch, GrowthGoal, ImageRef, Intensity, MoodEntry, MoodType,
    parse_history, seed_history,
};
pub use profile::{
    AiStyle, FrozenCapture, GoalLimit, Language, Preferences, ProfilePatch, QuizAnswers,
    UnlockedSet, UserProfile, migrate,
};

use chrono::{DateTime, FixedOffset, Local};

/// Source of "now" for entry timestamps and the seeded example history.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock in the machine's local offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// A clock frozen at one instant, for reproducible tests and imports.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}
