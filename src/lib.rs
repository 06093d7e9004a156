// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # mirror-journal
//!
//! The state core of a personal mood journal: a typed entry history, growth
//! seeds that flower and are harvested, spirit-animal achievements unlocked
//! from the history, and an AI reflection gateway that always has an offline
//! answer.
//!
//! ## Architecture
//!
//! - **Domain model** (`model`): entries, profile, preferences, and the
//!   forward-compatible profile migration
//! - **Storage** (`store`): a key-value backend trait with in-memory
//!   (`dashmap`) and durable (`redb`) implementations holding two JSON records
//! - **Achievements** (`achievement`): an ordered predicate table, one unlock
//!   per evaluation
//! - **Garden** (`garden`): the growth-goal lifecycle
//! - **State store** (`state`): the single owner of profile and history;
//!   validates actions, evaluates unlocks, persists and notifies
//! - **Gateway** (`gateway`): the reflection-model contract, a Gemini client
//!   and the deterministic fallback book
//!
//! ## Library usage
//!
//! ```no_run
//! use mirror_journal::model::{EntryDraft, MoodType};
//! use mirror_journal::state::{Action, JournalStore};
//!
//! let mut store = JournalStore::in_memory();
//! let events = store.subscribe();
//! store
//!     .dispatch(Action::AppendEntry(
//!         EntryDraft::new(MoodType::Pleasant).with_note("Sunny walk"),
//!     ))
//!     .unwrap();
//! for event in events.try_iter() {
//!     println!("{event:?}");
//! }
//! ```

pub mod achievement;
pub mod config;
pub mod error;
pub mod gateway;
pub mod garden;
pub mod model;
pub mod paths;
pub mod state;
pub mod store;

pub use error::{JournalError, JournalResult};
pub use state::{Action, JournalStore};
