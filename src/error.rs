//! Error types for program operations.
//!
//! Every domain error leaves the program state untouched. Only
//! [`ProgramError::Persistence`] involves the disk, and a failed save is rolled
//! back in memory before it is returned.

use thiserror::Error;

use crate::db::StoreError;

/// Bad field values at registration or when recording an activity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("{field} may only contain letters and single spaces")]
    InvalidText { field: &'static str },

    #[error("{field} must fit on one line without control characters")]
    ControlCharacter { field: &'static str },

    #[error("location must not contain '@': {0}")]
    LocationMarker(String),

    #[error("student id must contain only digits: {0}")]
    InvalidStudentId(String),

    #[error("language must be Korean or English, got '{0}'")]
    UnknownLanguage(String),

    #[error("grade must be between 1 and 4, got {0}")]
    GradeOutOfRange(i64),

    #[error("student id {0} is already registered")]
    DuplicateStudentId(String),
}

/// A pairing that breaks the mentor/mentee role rule.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoleConstraintError {
    #[error("mentor {student_id} must be a Korean speaker")]
    MentorNotKorean { student_id: String },

    #[error("mentee {student_id} must be an English speaker")]
    MenteeNotEnglish { student_id: String },
}

/// The operator did not pick a usable participant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no mentor selected")]
    MentorNotSelected,

    #[error("no mentee selected")]
    MenteeNotSelected,

    #[error("no participant with student id {0}")]
    UnknownParticipant(String),
}

/// Errors from the matching engine itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    RoleConstraint(#[from] RoleConstraintError),
}

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    RoleConstraint(#[from] RoleConstraintError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("participant {student_id} is already matched in pair {pair_key}")]
    AlreadyMatched {
        student_id: String,
        pair_key: String,
    },

    #[error("no pair with key {0}")]
    UnknownPair(String),

    #[error("pair {pair_key} has no activity #{index}")]
    ActivityNotFound { pair_key: String, index: usize },

    #[error("failed to persist program state: {0}")]
    Persistence(#[from] StoreError),
}

impl From<MatchError> for ProgramError {
    fn from(e: MatchError) -> Self {
        match e {
            MatchError::Selection(e) => Self::Selection(e),
            MatchError::RoleConstraint(e) => Self::RoleConstraint(e),
        }
    }
}
