//! The program: sole owner of the in-memory state.
//!
//! Roster, matching and ledger operations all go through [`Program`]. Each
//! mutation is applied to a copy of the state, saved through the [`Store`],
//! and only then swapped in. A rejected operation or a failed save leaves the
//! in-memory state exactly as it was.

use std::collections::HashMap;

use chrono::Utc;

use crate::db::Store;
use crate::error::{ProgramError, SelectionError, ValidationError};
use crate::export::{self, ImportReport};
use crate::matching;
use crate::models::*;

pub struct Program<S: Store> {
    state: ProgramState,
    store: S,
}

impl<S: Store> Program<S> {
    /// Load the committed state, or start empty if nothing was saved yet.
    pub fn open(store: S) -> Result<Self, ProgramError> {
        let state = match store.load()? {
            Some(state) => {
                tracing::info!(
                    participants = state.participants().len(),
                    pairs = state.pair_count(),
                    "Loaded saved program"
                );
                state
            }
            None => {
                tracing::info!("No saved program found, starting empty");
                ProgramState::new()
            }
        };
        Ok(Self { state, store })
    }

    pub fn state(&self) -> &ProgramState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Apply `op` to a copy of the state, save the copy, then commit it.
    fn commit<T>(
        &mut self,
        what: &str,
        op: impl FnOnce(&mut ProgramState) -> Result<T, ProgramError>,
    ) -> Result<T, ProgramError> {
        let mut next = self.state.clone();
        let out = op(&mut next)?;

        if let Err(e) = self.store.save(&next) {
            tracing::warn!("Save failed during {}, change discarded: {}", what, e);
            return Err(e.into());
        }

        self.state = next;
        Ok(out)
    }

    // ============================================================
    // Roster
    // ============================================================

    pub fn register(&mut self, input: RegisterParticipantInput) -> Result<Participant, ProgramError> {
        let participant = Participant::new(input)?;

        self.commit("register", |state| {
            register_into(state, participant.clone())?;
            Ok(())
        })?;

        tracing::info!(
            student_id = %participant.student_id,
            mentor = participant.is_mentor(),
            "Registered participant"
        );
        Ok(participant)
    }

    pub fn participants(&self) -> &[Participant] {
        self.state.participants()
    }

    pub fn find_participant(&self, student_id: &str) -> Option<&Participant> {
        self.state.find_participant(student_id)
    }

    pub fn mentors(&self) -> Vec<&Participant> {
        self.state.mentors()
    }

    pub fn mentees(&self) -> Vec<&Participant> {
        self.state.mentees()
    }

    // ============================================================
    // Matching
    // ============================================================

    /// Pair still-unmatched mentors and mentees in registration order.
    ///
    /// Participants already in a pair are left out, so calling this again
    /// only matches people registered since. Returns the new pairs.
    pub fn auto_match(&mut self) -> Result<Vec<Pair>, ProgramError> {
        let pairs = {
            let unmatched = |p: &&Participant| self.state.pair_of(&p.student_id).is_none();
            let mentors: Vec<&Participant> =
                self.state.mentors().into_iter().filter(&unmatched).collect();
            let mentees: Vec<&Participant> =
                self.state.mentees().into_iter().filter(&unmatched).collect();
            matching::auto_match(&mentors, &mentees)?
        };

        if pairs.is_empty() {
            tracing::info!("Auto-match found nobody left to pair");
            return Ok(pairs);
        }

        self.commit("auto-match", |state| {
            for pair in &pairs {
                state.insert_pair(pair.clone());
            }
            Ok(())
        })?;

        tracing::info!(count = pairs.len(), "Auto-matched pairs");
        Ok(pairs)
    }

    /// Pair two participants picked by student id. `None` means unselected.
    ///
    /// Matching a pair that already exists returns it unchanged. If either
    /// participant is already in a different pair the match is refused; use
    /// [`Program::unmatch`] first.
    pub fn manual_match(
        &mut self,
        mentor_id: Option<&str>,
        mentee_id: Option<&str>,
    ) -> Result<Pair, ProgramError> {
        let mentor = self.select(mentor_id)?;
        let mentee = self.select(mentee_id)?;
        let pair = matching::manual_match(mentor, mentee)?;

        if let Some(existing) = self.state.pair(&pair.key()) {
            return Ok(existing.clone());
        }

        self.commit("manual match", |state| {
            match_into(state, pair.clone())?;
            Ok(())
        })?;

        tracing::info!(pair = %pair.key(), "Manually matched pair");
        Ok(pair)
    }

    /// Dissolve a pair. Its recorded activities are removed with it.
    pub fn unmatch(&mut self, pair_key: &str) -> Result<Pair, ProgramError> {
        let (pair, activities) = self.commit("unmatch", |state| {
            state
                .remove_pair(pair_key)
                .ok_or_else(|| ProgramError::UnknownPair(pair_key.to_string()))
        })?;

        tracing::info!(
            pair = %pair_key,
            activities = activities.len(),
            "Dissolved pair"
        );
        Ok(pair)
    }

    pub fn pairs(&self) -> impl Iterator<Item = &Pair> {
        self.state.pairs()
    }

    pub fn pair(&self, key: &str) -> Option<&Pair> {
        self.state.pair(key)
    }

    fn select(&self, student_id: Option<&str>) -> Result<Option<&Participant>, SelectionError> {
        match student_id.map(str::trim) {
            None | Some("") => Ok(None),
            Some(id) => self
                .state
                .find_participant(id)
                .map(Some)
                .ok_or_else(|| SelectionError::UnknownParticipant(id.to_string())),
        }
    }

    // ============================================================
    // Activity ledger
    // ============================================================

    /// Append `activity` to the ledger of an existing pair.
    pub fn add_activity(&mut self, pair_key: &str, activity: Activity) -> Result<(), ProgramError> {
        self.commit("add activity", |state| {
            add_activity_into(state, pair_key, activity)
        })?;

        tracing::info!(pair = %pair_key, "Recorded activity");
        Ok(())
    }

    /// Record an activity happening now.
    pub fn record_activity(
        &mut self,
        pair_key: &str,
        input: RecordActivityInput,
    ) -> Result<Activity, ProgramError> {
        let activity = Activity::new(Utc::now(), input.content, input.location)?;
        self.add_activity(pair_key, activity.clone())?;
        Ok(activity)
    }

    /// Activities for `pair_key` in the order they were recorded.
    pub fn activities_for(&self, pair_key: &str) -> &[Activity] {
        self.state.activities_for(pair_key)
    }

    /// Mark the `index`-th activity (0-based) of a pair as done or not done.
    pub fn set_activity_completed(
        &mut self,
        pair_key: &str,
        index: usize,
        completed: bool,
    ) -> Result<Activity, ProgramError> {
        let activity = self.commit("update activity", |state| {
            if state.pair(pair_key).is_none() {
                return Err(ProgramError::UnknownPair(pair_key.to_string()));
            }
            let activity = state.activity_mut(pair_key, index).ok_or_else(|| {
                ProgramError::ActivityNotFound {
                    pair_key: pair_key.to_string(),
                    index,
                }
            })?;
            activity.completed = completed;
            Ok(activity.clone())
        })?;

        tracing::info!(pair = %pair_key, index, completed, "Updated activity");
        Ok(activity)
    }

    // ============================================================
    // Plain-text import
    // ============================================================

    /// Register every valid participant line. Ids that are already registered
    /// are skipped. The whole import is saved once.
    pub fn import_participants(&mut self, text: &str) -> Result<ImportReport, ProgramError> {
        let lines = export::parse_participants(text);

        self.import("participant import", |state, report| {
            for parsed in lines {
                let result = parsed
                    .record
                    .and_then(|input| Participant::new(input).map_err(|e| e.to_string()))
                    .and_then(|p| register_into(state, p).map_err(|e| e.to_string()));
                match result {
                    Ok(()) => report.imported += 1,
                    Err(reason) => report.skip(parsed.line, reason),
                }
            }
        })
    }

    /// Recreate pairs from `mentorName,mentorId,menteeName,menteeId` lines.
    ///
    /// Both ids must already be registered under the given names; pairs that
    /// already exist are skipped.
    pub fn import_matches(&mut self, text: &str) -> Result<ImportReport, ProgramError> {
        let lines = export::parse_matches(text);

        self.import("match import", |state, report| {
            for parsed in lines {
                let result = parsed.record.and_then(|record| {
                    let mentor = registered_as(state, &record.mentor_id, &record.mentor_name)?;
                    let mentee = registered_as(state, &record.mentee_id, &record.mentee_name)?;
                    let pair = Pair::new(mentor, mentee).map_err(|e| e.to_string())?;
                    if state.pair(&pair.key()).is_some() {
                        return Err(format!("pair {} already exists", pair.key()));
                    }
                    match_into(state, pair).map_err(|e| e.to_string())
                });
                match result {
                    Ok(()) => report.imported += 1,
                    Err(reason) => report.skip(parsed.line, reason),
                }
            }
        })
    }

    /// Append activities from the grouped listing format.
    ///
    /// Each `[ mentor - mentee ]` header must name exactly one existing pair.
    /// Lines are compared with the pair's existing activities as rendered
    /// text, counting repeats: a line that occurs twice in the file is only
    /// skipped twice if the pair already holds two such activities. Importing
    /// the same file twice therefore changes nothing.
    pub fn import_activities(&mut self, text: &str) -> Result<ImportReport, ProgramError> {
        let parsed = export::parse_activities(text);

        self.import("activity import", |state, report| {
            report.skipped.extend(parsed.stray);

            for group in parsed.groups {
                let candidates: Vec<String> = state
                    .pairs()
                    .filter(|pair| {
                        pair.mentor().name == group.mentor_name
                            && pair.mentee().name == group.mentee_name
                    })
                    .map(Pair::key)
                    .collect();

                let key = match candidates.as_slice() {
                    [key] => key.clone(),
                    [] => {
                        report.skip(
                            group.line,
                            format!(
                                "no pair for [ {} - {} ]",
                                group.mentor_name, group.mentee_name
                            ),
                        );
                        continue;
                    }
                    _ => {
                        report.skip(
                            group.line,
                            format!(
                                "[ {} - {} ] matches {} pairs",
                                group.mentor_name,
                                group.mentee_name,
                                candidates.len()
                            ),
                        );
                        continue;
                    }
                };

                // Each rendered line in the file consumes at most one matching
                // existing activity, so repeats within the same minute survive.
                let mut existing: HashMap<String, usize> = HashMap::new();
                for activity in state.activities_for(&key) {
                    *existing.entry(activity.to_string()).or_default() += 1;
                }

                for entry in group.entries {
                    let activity = match entry.record {
                        Ok(activity) => activity,
                        Err(reason) => {
                            report.skip(entry.line, reason);
                            continue;
                        }
                    };
                    if let Some(count) = existing
                        .get_mut(&activity.to_string())
                        .filter(|count| **count > 0)
                    {
                        *count -= 1;
                        report.skip(entry.line, format!("already recorded for {}", key));
                        continue;
                    }
                    state.push_activity(&key, activity);
                    report.imported += 1;
                }
            }
        })
    }

    /// Run an import against a copy of the state and save once if anything
    /// was imported.
    fn import(
        &mut self,
        what: &str,
        apply: impl FnOnce(&mut ProgramState, &mut ImportReport),
    ) -> Result<ImportReport, ProgramError> {
        let mut candidate = self.state.clone();
        let mut report = ImportReport::default();
        apply(&mut candidate, &mut report);

        for skipped in &report.skipped {
            tracing::warn!(line = skipped.line, "{}: skipped: {}", what, skipped.reason);
        }

        if report.imported > 0 {
            self.commit(what, |state| {
                *state = candidate;
                Ok(())
            })?;
        }

        tracing::info!(
            imported = report.imported,
            skipped = report.skipped.len(),
            "Finished {}",
            what
        );
        Ok(report)
    }
}

fn register_into(state: &mut ProgramState, participant: Participant) -> Result<(), ValidationError> {
    if state.find_participant(&participant.student_id).is_some() {
        return Err(ValidationError::DuplicateStudentId(participant.student_id));
    }
    state.push_participant(participant);
    Ok(())
}

/// Insert a new pair unless one of its members is already paired.
fn match_into(state: &mut ProgramState, pair: Pair) -> Result<(), ProgramError> {
    for side in [pair.mentor(), pair.mentee()] {
        if let Some(existing) = state.pair_of(&side.student_id) {
            return Err(ProgramError::AlreadyMatched {
                student_id: side.student_id.clone(),
                pair_key: existing.key(),
            });
        }
    }
    state.insert_pair(pair);
    Ok(())
}

fn add_activity_into(
    state: &mut ProgramState,
    pair_key: &str,
    activity: Activity,
) -> Result<(), ProgramError> {
    if state.pair(pair_key).is_none() {
        return Err(ProgramError::UnknownPair(pair_key.to_string()));
    }
    state.push_activity(pair_key, activity);
    Ok(())
}

/// The registered participant with `student_id`, if it is registered as `name`.
fn registered_as(state: &ProgramState, student_id: &str, name: &str) -> Result<Participant, String> {
    match state.find_participant(student_id) {
        Some(p) if p.name == name => Ok(p.clone()),
        Some(p) => Err(format!(
            "student id {} is registered as {}, not {}",
            student_id, p.name, name
        )),
        None => Err(format!("student id {} is not registered", student_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn input(name: &str, id: &str, language: &str) -> RegisterParticipantInput {
        RegisterParticipantInput {
            name: name.to_string(),
            student_id: id.to_string(),
            major: "CS".to_string(),
            language: language.to_string(),
            grade: 1,
        }
    }

    #[test]
    fn test_commit_rolls_back_on_failed_save() {
        let store = MemoryStore::new();
        let mut program = Program::open(store.clone()).unwrap();

        store.fail_next_save();
        let err = program.register(input("Kim", "1001", "Korean")).unwrap_err();

        assert!(matches!(err, ProgramError::Persistence(_)));
        assert!(program.participants().is_empty());
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_rejected_operation_does_not_save() {
        let store = MemoryStore::new();
        let mut program = Program::open(store.clone()).unwrap();

        let err = program.register(input("", "1001", "Korean")).unwrap_err();
        assert!(matches!(err, ProgramError::Validation(_)));
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_select_treats_blank_as_unselected() {
        let mut program = Program::open(MemoryStore::new()).unwrap();
        program.register(input("Lee", "2002", "English")).unwrap();

        let err = program.manual_match(Some("  "), Some("2002")).unwrap_err();
        assert!(matches!(
            err,
            ProgramError::Selection(SelectionError::MentorNotSelected)
        ));
    }
}
