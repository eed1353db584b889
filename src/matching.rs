//! Mentor/mentee matching.
//!
//! Both functions are pure: they build [`Pair`]s and leave registering them to
//! the caller.

use crate::error::{MatchError, SelectionError};
use crate::models::{Pair, Participant};

/// Pair the i-th mentor with the i-th mentee.
///
/// Produces `min(mentors.len(), mentees.len())` pairs in input order. Whoever
/// is left over on the longer side stays unmatched. This is first come, first
/// matched, not an optimal assignment.
pub fn auto_match(
    mentors: &[&Participant],
    mentees: &[&Participant],
) -> Result<Vec<Pair>, MatchError> {
    mentors
        .iter()
        .zip(mentees)
        .map(|(mentor, mentee)| Pair::new((*mentor).clone(), (*mentee).clone()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(MatchError::from)
}

/// Pair two explicitly chosen participants.
///
/// `None` means the operator left that side unselected.
pub fn manual_match(
    mentor: Option<&Participant>,
    mentee: Option<&Participant>,
) -> Result<Pair, MatchError> {
    let mentor = mentor.ok_or(SelectionError::MentorNotSelected)?;
    let mentee = mentee.ok_or(SelectionError::MenteeNotSelected)?;
    Ok(Pair::new(mentor.clone(), mentee.clone())?)
}
