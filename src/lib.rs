//! GlobalBridge: a campus mentor/mentee exchange program.
//!
//! Participants register into a roster, Korean speakers are paired with
//! English speakers, and each pair's activities are kept in a ledger. The
//! whole state is saved after every change.
//!
//! [`program::Program`] is the entry point; it owns the state and persists it
//! through a [`db::Store`].

pub mod atomic_write;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod matching;
pub mod models;
pub mod program;
pub mod render;
