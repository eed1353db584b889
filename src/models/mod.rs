//! Domain models for GlobalBridge.
//!
//! # Core Concepts
//!
//! - [`Participant`]: A registered student. The role is derived from the
//!   participant's [`Language`]: Korean speakers mentor, English speakers are
//!   mentees. Participants are immutable once registered.
//! - [`Pair`]: One mentor matched with one mentee, keyed by
//!   `mentorId-menteeId`. Construction fails if either role is wrong.
//! - [`Activity`]: Something a pair did together. Activities are appended per
//!   pair in insertion order; only the `completed` flag changes afterwards.
//! - [`ProgramState`]: The whole program (roster, pairs, ledger) as the single
//!   unit that gets saved and loaded.

mod activity;
mod pair;
mod participant;
mod state;

pub use activity::*;
pub use pair::*;
pub use participant::*;
pub use state::*;
