//! Plain-text export and import.
//!
//! These are operator-triggered side formats, separate from the full-state
//! store:
//!
//! ```text
//! participants.txt   Kim,1001,CS,Korean,2
//! matches.txt        Kim,1001,Lee,2002
//! activities.txt     [ Kim - Lee ]
//!                    - 2024-12-09 14:30 | Coffee chat @ Library [in-progress]
//!                    (blank line between pairs)
//! ```
//!
//! Fields are not escaped. Registration only accepts letters and spaces in
//! names and majors, so a comma can never end up inside a field.
//!
//! Parsing is line-oriented and lenient: each bad line becomes a
//! [`SkippedLine`] instead of failing the whole file.

use std::path::Path;

use chrono::{Local, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;

use crate::atomic_write::atomic_write;
use crate::models::*;

/// One parsed line: either a record or the reason it was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine<T> {
    /// 1-based line number in the source text.
    pub line: usize,
    pub record: Result<T, String>,
}

/// A line that an import did not apply, and why.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SkippedLine {
    pub line: usize,
    pub reason: String,
}

/// Outcome of applying an import to the program.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: Vec<SkippedLine>,
}

impl ImportReport {
    pub fn skip(&mut self, line: usize, reason: impl Into<String>) {
        self.skipped.push(SkippedLine {
            line,
            reason: reason.into(),
        });
    }
}

/// One line of `matches.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    pub mentor_name: String,
    pub mentor_id: String,
    pub mentee_name: String,
    pub mentee_id: String,
}

/// A `[ mentor - mentee ]` block from `activities.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityGroup {
    /// Line number of the header.
    pub line: usize,
    pub mentor_name: String,
    pub mentee_name: String,
    pub entries: Vec<ParsedLine<Activity>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedActivities {
    pub groups: Vec<ActivityGroup>,
    /// Lines that belong to no group or are not recognisable at all.
    pub stray: Vec<SkippedLine>,
}

// ============================================================
// Rendering
// ============================================================

pub fn render_participants(participants: &[Participant]) -> String {
    participants
        .iter()
        .map(|p| {
            format!(
                "{},{},{},{},{}\n",
                p.name, p.student_id, p.major, p.language, p.grade
            )
        })
        .collect()
}

pub fn render_matches<'a>(pairs: impl IntoIterator<Item = &'a Pair>) -> String {
    pairs
        .into_iter()
        .map(|pair| {
            format!(
                "{},{},{},{}\n",
                pair.mentor().name,
                pair.mentor().student_id,
                pair.mentee().name,
                pair.mentee().student_id
            )
        })
        .collect()
}

/// Grouped activity listing, one block per pair that has activities.
pub fn render_activities(state: &ProgramState) -> String {
    let mut out = String::new();
    for (pair, activities) in state.ledger() {
        out.push_str(&format!(
            "[ {} - {} ]\n",
            pair.mentor().name,
            pair.mentee().name
        ));
        for activity in activities {
            out.push_str("- ");
            out.push_str(&activity.to_string());
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

pub fn write_export(path: impl AsRef<Path>, contents: &str) -> std::io::Result<()> {
    atomic_write(path, contents.as_bytes())
}

// ============================================================
// Parsing
// ============================================================

/// Non-blank lines with their 1-based numbers, trailing whitespace removed.
fn numbered_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim_end()))
        .filter(|(_, line)| !line.trim().is_empty())
}

fn split_fields(line: &str, expected: usize) -> Result<Vec<&str>, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != expected {
        return Err(format!(
            "expected {} comma-separated fields, found {}",
            expected,
            fields.len()
        ));
    }
    Ok(fields)
}

/// Parse `name,studentId,major,language,grade` lines.
///
/// Only the shape is checked here; field rules are applied at registration.
pub fn parse_participants(text: &str) -> Vec<ParsedLine<RegisterParticipantInput>> {
    numbered_lines(text)
        .map(|(line, content)| ParsedLine {
            line,
            record: split_fields(content, 5).and_then(|f| {
                let grade = f[4]
                    .parse::<i64>()
                    .map_err(|_| format!("grade '{}' is not a number", f[4]))?;
                Ok(RegisterParticipantInput {
                    name: f[0].to_string(),
                    student_id: f[1].to_string(),
                    major: f[2].to_string(),
                    language: f[3].to_string(),
                    grade,
                })
            }),
        })
        .collect()
}

/// Parse `mentorName,mentorId,menteeName,menteeId` lines.
pub fn parse_matches(text: &str) -> Vec<ParsedLine<MatchRecord>> {
    numbered_lines(text)
        .map(|(line, content)| ParsedLine {
            line,
            record: split_fields(content, 4).map(|f| MatchRecord {
                mentor_name: f[0].to_string(),
                mentor_id: f[1].to_string(),
                mentee_name: f[2].to_string(),
                mentee_id: f[3].to_string(),
            }),
        })
        .collect()
}

/// Parse the grouped listing written by [`render_activities`].
pub fn parse_activities(text: &str) -> ParsedActivities {
    let mut parsed = ParsedActivities::default();

    for (line, content) in numbered_lines(text) {
        let trimmed = content.trim();
        if let Some(header) = parse_group_header(trimmed) {
            let (mentor_name, mentee_name) = header;
            parsed.groups.push(ActivityGroup {
                line,
                mentor_name,
                mentee_name,
                entries: Vec::new(),
            });
        } else if let Some(body) = trimmed.strip_prefix("- ") {
            match parsed.groups.last_mut() {
                Some(group) => group.entries.push(ParsedLine {
                    line,
                    record: parse_activity_line(body),
                }),
                None => parsed.stray.push(SkippedLine {
                    line,
                    reason: "activity line before any [ mentor - mentee ] header".to_string(),
                }),
            }
        } else {
            parsed.stray.push(SkippedLine {
                line,
                reason: "not a header or activity line".to_string(),
            });
        }
    }

    parsed
}

fn parse_group_header(line: &str) -> Option<(String, String)> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?.trim();
    let (mentor, mentee) = inner.split_once(" - ")?;
    let (mentor, mentee) = (mentor.trim(), mentee.trim());
    if mentor.is_empty() || mentee.is_empty() {
        return None;
    }
    Some((mentor.to_string(), mentee.to_string()))
}

/// Parse `<date-time> | <content> @ <location> [<status>]`.
///
/// The timestamp is read as local time with minute precision. Locations never
/// contain `@`, so the last ` @ ` separates the location from the content.
pub fn parse_activity_line(line: &str) -> Result<Activity, String> {
    let (when, rest) = line
        .split_once(" | ")
        .ok_or_else(|| "missing ' | ' after the date".to_string())?;

    let rest = rest
        .strip_suffix(']')
        .ok_or_else(|| "missing [status] suffix".to_string())?;
    let (body, status) = rest
        .rsplit_once(" [")
        .ok_or_else(|| "missing [status] suffix".to_string())?;
    let completed = match status {
        STATUS_COMPLETED => true,
        STATUS_IN_PROGRESS => false,
        other => return Err(format!("unknown status '{}'", other)),
    };

    let (content, location) = body
        .rsplit_once(" @ ")
        .ok_or_else(|| "missing ' @ ' before the location".to_string())?;

    let naive = NaiveDateTime::parse_from_str(when.trim(), ACTIVITY_TIME_FORMAT)
        .map_err(|e| format!("bad date '{}': {}", when.trim(), e))?;
    let timestamp = Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| format!("date '{}' does not exist in local time", when.trim()))?
        .with_timezone(&Utc);

    let mut activity = Activity::new(timestamp, content, location).map_err(|e| e.to_string())?;
    activity.completed = completed;
    Ok(activity)
}
