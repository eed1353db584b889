use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Minute-precision, local-time format used wherever an activity is shown as text.
pub const ACTIVITY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_IN_PROGRESS: &str = "in-progress";

/// Something a mentor and mentee did together.
///
/// Activities live in the ledger under their pair's key, in the order they
/// were recorded. Everything except `completed` is fixed at creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Activity {
    pub timestamp: DateTime<Utc>,
    pub content: String,
    pub location: String,
    pub completed: bool,
}

impl Activity {
    /// A new, not yet completed activity.
    ///
    /// Content and location must be non-blank single lines. The location may
    /// not contain `@`, which separates it from the content in the text form.
    pub fn new(
        timestamp: DateTime<Utc>,
        content: impl Into<String>,
        location: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let content = content.into();
        let location = location.into();

        if content.trim().is_empty() {
            return Err(ValidationError::EmptyField("content"));
        }
        if location.trim().is_empty() {
            return Err(ValidationError::EmptyField("location"));
        }
        if content.chars().any(char::is_control) {
            return Err(ValidationError::ControlCharacter { field: "content" });
        }
        if location.chars().any(char::is_control) {
            return Err(ValidationError::ControlCharacter { field: "location" });
        }
        if location.contains('@') {
            return Err(ValidationError::LocationMarker(location));
        }

        Ok(Self {
            timestamp,
            content,
            location,
            completed: false,
        })
    }

    pub fn status_label(&self) -> &'static str {
        if self.completed {
            STATUS_COMPLETED
        } else {
            STATUS_IN_PROGRESS
        }
    }
}

/// `<date-time> | <content> @ <location> [<completed|in-progress>]`
impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} @ {} [{}]",
            self.timestamp
                .with_timezone(&Local)
                .format(ACTIVITY_TIME_FORMAT),
            self.content,
            self.location,
            self.status_label()
        )
    }
}

/// Input for recording an activity "now" on behalf of the operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordActivityInput {
    pub content: String,
    pub location: String,
}
