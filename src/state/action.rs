//! Mutations accepted by [`JournalStore::dispatch`](super::JournalStore::dispatch).
//!
//! Every action that targets an entry names it by id, so a late result from
//! a background call can never land on the wrong entry.

use crate::model::{EntryDraft, EntryId, EntryPatch, FrozenCapture, ProfilePatch};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Edit profile fields and preferences.
    SetProfile(ProfilePatch),
    /// Restore first-run profile defaults. Unlocked achievements are kept.
    ResetProfile,
    /// Validate and prepend a new entry, then evaluate achievements.
    AppendEntry(EntryDraft),
    /// Edit derived text on an existing entry.
    UpdateEntry { id: EntryId, patch: EntryPatch },
    /// Attach a growing seed to an existing entry.
    PlantGoal { id: EntryId, text: String },
    /// Complete or reopen an entry's seed.
    ToggleCompletion(EntryId),
    /// Raise the newly-harvested marker for an entry.
    MarkHarvestedTransient(EntryId),
    /// Drop newly-harvested markers (all of them when `None`) and record the
    /// goals as harvested.
    ClearHarvestedTransient(Option<Vec<EntryId>>),
    /// Stage a rushed capture for later reflection.
    FreezeCapture(FrozenCapture),
    /// Commit the staged capture as an entry built from this draft.
    ThawCapture(EntryDraft),
    /// Throw the staged capture away.
    DiscardCapture,
    /// Acknowledge the one-shot unlock notification.
    DismissUnlock,
    /// Acknowledge the oldest notice.
    DismissNotice,
}

impl Action {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetProfile(_) => "set_profile",
            Self::ResetProfile => "reset_profile",
            Self::AppendEntry(_) => "append_entry",
            Self::UpdateEntry { .. } => "update_entry",
            Self::PlantGoal { .. } => "plant_goal",
            Self::ToggleCompletion(_) => "toggle_completion",
            Self::MarkHarvestedTransient(_) => "mark_harvested",
            Self::ClearHarvestedTransient(_) => "clear_harvested",
            Self::FreezeCapture(_) => "freeze_capture",
            Self::ThawCapture(_) => "thaw_capture",
            Self::DiscardCapture => "discard_capture",
            Self::DismissUnlock => "dismiss_unlock",
            Self::DismissNotice => "dismiss_notice",
        }
    }
}
