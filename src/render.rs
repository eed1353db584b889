//! Human-readable views of the program for the command line.

use crate::models::{Activity, Pair, Participant, ProgramState};

/// Titled, numbered participant list.
///
/// ```text
/// Mentors (2):
///   1. Kim (1001) - Korean - CS
///   2. Park (1003) - Korean - Math
/// ```
pub fn render_roster(title: &str, participants: &[&Participant]) -> String {
    if participants.is_empty() {
        return format!("{}: none\n", title);
    }
    let mut out = format!("{} ({}):\n", title, participants.len());
    for (i, p) in participants.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, p));
    }
    out
}

/// Every pair with its key, so the key can be passed to other commands.
pub fn render_pairs<'a>(pairs: impl IntoIterator<Item = &'a Pair>) -> String {
    let lines: Vec<String> = pairs
        .into_iter()
        .map(|pair| format!("  {}  {}\n", pair.key(), pair))
        .collect();
    if lines.is_empty() {
        return "Current matches: none\n".to_string();
    }
    format!("Current matches ({}):\n{}", lines.len(), lines.concat())
}

/// One pair's activities with their 0-based indexes.
pub fn render_pair_activities(pair: &Pair, activities: &[Activity]) -> String {
    let mut out = format!("[ {} - {} ] {}\n", pair.mentor().name, pair.mentee().name, pair.key());
    if activities.is_empty() {
        out.push_str("  (no activities)\n");
    }
    for (i, activity) in activities.iter().enumerate() {
        out.push_str(&format!("  #{} {}\n", i, activity));
    }
    out
}

/// Activity history for every pair that has activities.
pub fn render_history(state: &ProgramState) -> String {
    let blocks: Vec<String> = state
        .ledger()
        .map(|(pair, activities)| render_pair_activities(pair, activities))
        .collect();
    if blocks.is_empty() {
        return "Activity history: none\n".to_string();
    }
    format!("Activity history:\n\n{}", blocks.join("\n"))
}
