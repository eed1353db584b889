use std::collections::BTreeMap;

use serde::Serialize;

use super::{Activity, Pair, Participant};

/// The complete program: roster, pair mapping, and activity ledger.
///
/// This is the unit that stores save and load. The collections are private;
/// reads go through the accessors below and writes through
/// [`crate::program::Program`], which keeps the invariants:
///
/// - student ids are unique within the roster
/// - every pair's mentor and mentee are registered, and nobody is in two pairs
/// - every ledger key names an existing pair
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ProgramState {
    participants: Vec<Participant>,
    pairs: BTreeMap<String, Pair>,
    activities: BTreeMap<String, Vec<Activity>>,
}

impl ProgramState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a state from stored collections, checking every invariant.
    ///
    /// Returns a description of the first violation found.
    pub fn from_parts(
        participants: Vec<Participant>,
        pairs: Vec<Pair>,
        activities: BTreeMap<String, Vec<Activity>>,
    ) -> Result<Self, String> {
        let mut state = Self::new();

        for participant in participants {
            if state.find_participant(&participant.student_id).is_some() {
                return Err(format!(
                    "duplicate student id {}",
                    participant.student_id
                ));
            }
            state.participants.push(participant);
        }

        for pair in pairs {
            for side in [pair.mentor(), pair.mentee()] {
                match state.find_participant(&side.student_id) {
                    Some(registered) if registered == side => {}
                    _ => {
                        return Err(format!(
                            "pair {} references unregistered participant {}",
                            pair.key(),
                            side.student_id
                        ))
                    }
                }
                if let Some(existing) = state.pair_of(&side.student_id) {
                    return Err(format!(
                        "participant {} is in both {} and {}",
                        side.student_id,
                        existing.key(),
                        pair.key()
                    ));
                }
            }
            state.pairs.insert(pair.key(), pair);
        }

        for (key, list) in activities {
            if !state.pairs.contains_key(&key) {
                return Err(format!("activities recorded for unknown pair {}", key));
            }
            if !list.is_empty() {
                state.activities.insert(key, list);
            }
        }

        Ok(state)
    }

    /// Every participant, in registration order.
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn find_participant(&self, student_id: &str) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.student_id == student_id)
    }

    /// Korean-speaking participants, in registration order.
    pub fn mentors(&self) -> Vec<&Participant> {
        self.participants.iter().filter(|p| p.is_mentor()).collect()
    }

    /// Everyone who is not a mentor, in registration order.
    pub fn mentees(&self) -> Vec<&Participant> {
        self.participants.iter().filter(|p| !p.is_mentor()).collect()
    }

    /// All pairs, ordered by key.
    pub fn pairs(&self) -> impl Iterator<Item = &Pair> {
        self.pairs.values()
    }

    pub fn pair(&self, key: &str) -> Option<&Pair> {
        self.pairs.get(key)
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    /// The pair a participant belongs to, if any.
    pub fn pair_of(&self, student_id: &str) -> Option<&Pair> {
        self.pairs.values().find(|pair| pair.involves(student_id))
    }

    /// Activities for `key` in insertion order; empty when none were recorded.
    pub fn activities_for(&self, key: &str) -> &[Activity] {
        self.activities.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ledger entries that have at least one activity, ordered by pair key.
    pub fn ledger(&self) -> impl Iterator<Item = (&Pair, &[Activity])> {
        self.activities.iter().filter_map(|(key, list)| {
            self.pairs.get(key).map(|pair| (pair, list.as_slice()))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty() && self.pairs.is_empty() && self.activities.is_empty()
    }

    pub(crate) fn push_participant(&mut self, participant: Participant) {
        self.participants.push(participant);
    }

    pub(crate) fn insert_pair(&mut self, pair: Pair) {
        self.pairs.insert(pair.key(), pair);
    }

    /// Removes the pair and its ledger entry.
    pub(crate) fn remove_pair(&mut self, key: &str) -> Option<(Pair, Vec<Activity>)> {
        let pair = self.pairs.remove(key)?;
        let activities = self.activities.remove(key).unwrap_or_default();
        Some((pair, activities))
    }

    pub(crate) fn push_activity(&mut self, key: &str, activity: Activity) {
        self.activities
            .entry(key.to_string())
            .or_default()
            .push(activity);
    }

    pub(crate) fn activity_mut(&mut self, key: &str, index: usize) -> Option<&mut Activity> {
        self.activities.get_mut(key)?.get_mut(index)
    }
}
