use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lowest and highest grade a participant can be in.
pub const MIN_GRADE: u8 = 1;
pub const MAX_GRADE: u8 = 4;

/// A student taking part in the exchange program.
///
/// Participants are created once at registration and never change. Whether a
/// participant mentors or is mentored follows from [`Language`], so the role
/// is never stored separately.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub name: String,
    /// Unique key within the roster. Always a non-empty run of ASCII digits.
    pub student_id: String,
    pub major: String,
    pub language: Language,
    /// School year, between [`MIN_GRADE`] and [`MAX_GRADE`].
    pub grade: u8,
}

impl Participant {
    /// Validate raw registration input and build a participant from it.
    ///
    /// Surrounding whitespace is trimmed from every text field first.
    pub fn new(input: RegisterParticipantInput) -> Result<Self, ValidationError> {
        let name = input.name.trim();
        let student_id = input.student_id.trim();
        let major = input.major.trim();

        if name.is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        if student_id.is_empty() {
            return Err(ValidationError::EmptyField("student id"));
        }
        if major.is_empty() {
            return Err(ValidationError::EmptyField("major"));
        }
        if !is_word_text(name) {
            return Err(ValidationError::InvalidText { field: "name" });
        }
        if !is_word_text(major) {
            return Err(ValidationError::InvalidText { field: "major" });
        }
        if !student_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidStudentId(student_id.to_string()));
        }

        let language = input.language.parse::<Language>()?;

        let grade = u8::try_from(input.grade)
            .ok()
            .filter(|g| (MIN_GRADE..=MAX_GRADE).contains(g))
            .ok_or(ValidationError::GradeOutOfRange(input.grade))?;

        Ok(Self {
            name: name.to_string(),
            student_id: student_id.to_string(),
            major: major.to_string(),
            language,
            grade,
        })
    }

    pub fn is_mentor(&self) -> bool {
        self.language.is_mentor_language()
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) - {} - {}",
            self.name, self.student_id, self.language, self.major
        )
    }
}

/// Letters from any script, with single spaces between words.
fn is_word_text(s: &str) -> bool {
    !s.contains("  ")
        && s
            .split(' ')
            .all(|word| !word.is_empty() && word.chars().all(char::is_alphabetic))
}

/// The language a participant speaks natively.
///
/// - `Korean`: the participant mentors
/// - `English`: the participant is a mentee
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Language {
    Korean,
    English,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Korean => "Korean",
            Self::English => "English",
        }
    }

    pub fn is_mentor_language(&self) -> bool {
        matches!(self, Self::Korean)
    }
}

impl FromStr for Language {
    type Err = ValidationError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("korean") {
            Ok(Self::Korean)
        } else if trimmed.eq_ignore_ascii_case("english") {
            Ok(Self::English)
        } else {
            Err(ValidationError::UnknownLanguage(trimmed.to_string()))
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw registration input, exactly as entered by the operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterParticipantInput {
    pub name: String,
    pub student_id: String,
    pub major: String,
    pub language: String,
    pub grade: i64,
}
