//! Growth-goal lifecycle: seeds that grow, flower and are harvested.
//!
//! A goal is `Growing` until completed, `Completed` (a garden flower) until
//! its one-time harvest animation has played, then `Harvested`. Completion
//! can be undone until the goal is harvested.
//!
//! The "newly harvested" marker that drives the animation is not part of the
//! goal; the state store keeps it in its transient flags.

use std::time::Duration;

use crate::error::ValidationError;
use crate::gateway::template;
use crate::model::{GoalLimit, GrowthGoal, Language, MoodEntry};

/// Minimum time the newly-harvested marker stays up before it may be cleared.
pub const HARVEST_MARKER_DWELL: Duration = Duration::from_millis(1200);

/// Lifecycle state of a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalState {
    Growing,
    Completed,
    Harvested,
}

impl GoalState {
    pub fn of(goal: &GrowthGoal) -> Self {
        if goal.is_harvested {
            Self::Harvested
        } else if goal.is_completed {
            Self::Completed
        } else {
            Self::Growing
        }
    }
}

impl std::fmt::Display for GoalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Growing => write!(f, "growing"),
            Self::Completed => write!(f, "completed"),
            Self::Harvested => write!(f, "harvested"),
        }
    }
}

/// Whether the goal counts toward `maxActiveGoals`.
pub fn is_active(goal: &GrowthGoal) -> bool {
    !goal.is_completed && !goal.is_harvested
}

/// Outcome of [`toggle_completion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Growing → Completed. The caller raises the newly-harvested marker.
    Completed,
    /// Completed → Growing. The caller drops any pending marker.
    Reopened,
    /// The goal is harvested; nothing changed.
    Ignored,
}

/// Attach a new growing goal to `entry`.
///
/// Fails if the entry already carries a goal, the text is blank, or
/// `active_count` has reached `limit`.
pub fn plant(
    entry: &mut MoodEntry,
    text: &str,
    active_count: usize,
    limit: GoalLimit,
) -> Result<(), ValidationError> {
    if entry.growth_goal.is_some() {
        return Err(ValidationError::GoalAlreadyPlanted {
            id: entry.id.to_string(),
        });
    }
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::BlankGoal);
    }
    check_capacity(active_count, limit)?;
    entry.growth_goal = Some(GrowthGoal::planted(text));
    Ok(())
}

/// Whether one more goal may start growing.
pub fn check_capacity(active_count: usize, limit: GoalLimit) -> Result<(), ValidationError> {
    if active_count >= limit.get() {
        return Err(ValidationError::GardenFull {
            active: active_count,
            limit: limit.get(),
        });
    }
    Ok(())
}

/// Flip `is_completed` unless the goal is already harvested.
pub fn toggle_completion(goal: &mut GrowthGoal) -> Transition {
    match GoalState::of(goal) {
        GoalState::Harvested => Transition::Ignored,
        GoalState::Growing => {
            goal.is_completed = true;
            Transition::Completed
        }
        GoalState::Completed => {
            goal.is_completed = false;
            Transition::Reopened
        }
    }
}

/// Mark a completed goal as harvested. Returns whether anything changed.
pub fn harvest(goal: &mut GrowthGoal) -> bool {
    if GoalState::of(goal) != GoalState::Completed {
        return false;
    }
    goal.is_harvested = true;
    true
}

/// Number of growing goals across the history.
pub fn active_count(history: &[MoodEntry]) -> usize {
    history
        .iter()
        .filter_map(|e| e.growth_goal.as_ref())
        .filter(|g| is_active(g))
        .count()
}

/// Entries whose goal has flowered (completed, harvested or not).
pub fn garden(history: &[MoodEntry]) -> Vec<&MoodEntry> {
    history
        .iter()
        .filter(|e| e.growth_goal.as_ref().is_some_and(|g| g.is_completed))
        .collect()
}

/// Entries whose goal is still growing.
pub fn seedlings(history: &[MoodEntry]) -> Vec<&MoodEntry> {
    history
        .iter()
        .filter(|e| e.growth_goal.as_ref().is_some_and(is_active))
        .collect()
}

/// Normalise seed text for display as a template sentence.
///
/// Text that already follows the template, or the older "if … then …"
/// phrasing, is returned trimmed; anything else is wrapped.
pub fn format_seed(text: &str, language: Language) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if template::matches_template(trimmed, language) || is_legacy_phrasing(trimmed, language) {
        return trimmed.to_string();
    }
    template::wrap(trimmed, language)
}

fn is_legacy_phrasing(text: &str, language: Language) -> bool {
    match language {
        Language::Chinese => {
            (text.contains('时') && text.contains("我会"))
                || (text.contains("如果") && text.contains("那么"))
        }
        Language::English => {
            let lower = text.to_lowercase();
            lower.starts_with("if ") && lower.contains(" then ")
        }
        Language::Spanish => {
            let lower = text.to_lowercase();
            lower.starts_with("si ") && lower.contains(" entonces ")
        }
    }
}
