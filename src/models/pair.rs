use std::fmt;

use serde::Serialize;

use super::Participant;
use crate::error::RoleConstraintError;

/// A mentor matched with a mentee.
///
/// The fields are private so a pair can only come out of [`Pair::new`], which
/// checks both roles. Pairs are never mutated after construction. They are not
/// `Deserialize`; stores rebuild them through `Pair::new`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Pair {
    mentor: Participant,
    mentee: Participant,
}

impl Pair {
    pub fn new(mentor: Participant, mentee: Participant) -> Result<Self, RoleConstraintError> {
        if !mentor.is_mentor() {
            return Err(RoleConstraintError::MentorNotKorean {
                student_id: mentor.student_id,
            });
        }
        if mentee.is_mentor() {
            return Err(RoleConstraintError::MenteeNotEnglish {
                student_id: mentee.student_id,
            });
        }
        Ok(Self { mentor, mentee })
    }

    pub fn mentor(&self) -> &Participant {
        &self.mentor
    }

    pub fn mentee(&self) -> &Participant {
        &self.mentee
    }

    /// `mentorStudentId-menteeStudentId`.
    pub fn key(&self) -> String {
        pair_key(&self.mentor.student_id, &self.mentee.student_id)
    }

    /// Whether the participant with `student_id` is on either side of this pair.
    pub fn involves(&self, student_id: &str) -> bool {
        self.mentor.student_id == student_id || self.mentee.student_id == student_id
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Mentor: {} ({}) - Mentee: {} ({})",
            self.mentor.name, self.mentor.language, self.mentee.name, self.mentee.language
        )
    }
}

pub fn pair_key(mentor_id: &str, mentee_id: &str) -> String {
    format!("{}-{}", mentor_id, mentee_id)
}
