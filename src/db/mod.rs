//! Whole-state persistence.
//!
//! [`Store`] is the repository seam: [`crate::program::Program`] hands it the
//! complete [`ProgramState`] after every mutation and asks for it once at
//! startup. [`SqliteStore`] keeps the state in a single SQLite file;
//! [`MemoryStore`] keeps it in memory and counts saves.

mod schema;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OpenFlags};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::models::*;

/// Persistence failures. A store that simply has not been written yet is not
/// an error; [`Store::load`] returns `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("stored data is corrupt: {0}")]
    Corrupt(String),
}

pub trait Store {
    /// Read the last committed state. `Ok(None)` means nothing was ever saved.
    fn load(&self) -> Result<Option<ProgramState>, StoreError>;

    /// Replace the committed state with `state` as one unit.
    fn save(&mut self, state: &ProgramState) -> Result<(), StoreError>;
}

// ============================================================
// SQLite file store
// ============================================================

/// Keeps the program state in one SQLite database file.
///
/// Every save builds a complete new database in a temporary file next to the
/// target and renames it into place, so the previous file stays intact until
/// the new one is fully written.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl Store for SqliteStore {
    fn load(&self) -> Result<Option<ProgramState>, StoreError> {
        match fs::metadata(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No saved state at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
            Ok(_) => {}
        }

        let conn = Connection::open_with_flags(&self.path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        schema::check_current(&conn)?;
        let state = read_state(&conn)?;

        tracing::debug!(
            "Loaded {} participants, {} pairs from {}",
            state.participants().len(),
            state.pair_count(),
            self.path.display()
        );
        Ok(Some(state))
    }

    fn save(&mut self, state: &ProgramState) -> Result<(), StoreError> {
        let parent = self.parent_dir();
        fs::create_dir_all(parent)?;

        let tmp = NamedTempFile::new_in(parent)?;
        let mut conn = Connection::open(tmp.path())?;
        schema::run_migrations(&conn)?;
        write_state(&mut conn, state)?;
        conn.close().map_err(|(_, e)| e)?;

        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        tracing::debug!("Saved program state to {}", self.path.display());
        Ok(())
    }
}

fn write_state(conn: &mut Connection, state: &ProgramState) -> Result<(), StoreError> {
    let tx = conn.transaction()?;

    for (position, p) in state.participants().iter().enumerate() {
        tx.execute(
            "INSERT INTO participants (position, student_id, name, major, language, grade)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                position as i64,
                &p.student_id,
                &p.name,
                &p.major,
                p.language.as_str(),
                p.grade,
            ),
        )?;
    }

    for pair in state.pairs() {
        tx.execute(
            "INSERT INTO pairs (pair_key, mentor_id, mentee_id) VALUES (?, ?, ?)",
            (pair.key(), &pair.mentor().student_id, &pair.mentee().student_id),
        )?;
    }

    for (pair, activities) in state.ledger() {
        let key = pair.key();
        for (position, a) in activities.iter().enumerate() {
            tx.execute(
                "INSERT INTO activities (pair_key, position, timestamp, content, location, completed)
                 VALUES (?, ?, ?, ?, ?, ?)",
                (
                    &key,
                    position as i64,
                    a.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true),
                    &a.content,
                    &a.location,
                    a.completed,
                ),
            )?;
        }
    }

    tx.commit()?;
    Ok(())
}

fn read_state(conn: &Connection) -> Result<ProgramState, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name, student_id, major, language, grade
         FROM participants ORDER BY position",
    )?;
    let participants = stmt
        .query_map([], |row| {
            Ok(RegisterParticipantInput {
                name: row.get(0)?,
                student_id: row.get(1)?,
                major: row.get(2)?,
                language: row.get(3)?,
                grade: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|input| {
            let id = input.student_id.clone();
            Participant::new(input)
                .map_err(|e| StoreError::Corrupt(format!("participant {}: {}", id, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut stmt = conn.prepare("SELECT pair_key, mentor_id, mentee_id FROM pairs ORDER BY pair_key")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let lookup = |id: &str, key: &str| {
        participants
            .iter()
            .find(|p| p.student_id == id)
            .cloned()
            .ok_or_else(|| {
                StoreError::Corrupt(format!("pair {} references unknown participant {}", key, id))
            })
    };

    let mut pairs = Vec::with_capacity(rows.len());
    for (key, mentor_id, mentee_id) in rows {
        let pair = Pair::new(lookup(&mentor_id, &key)?, lookup(&mentee_id, &key)?)
            .map_err(|e| StoreError::Corrupt(format!("pair {}: {}", key, e)))?;
        if pair.key() != key {
            return Err(StoreError::Corrupt(format!(
                "pair stored under {} but its members give {}",
                key,
                pair.key()
            )));
        }
        pairs.push(pair);
    }

    let mut stmt = conn.prepare(
        "SELECT pair_key, timestamp, content, location, completed
         FROM activities ORDER BY pair_key, position",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, bool>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut activities: BTreeMap<String, Vec<Activity>> = BTreeMap::new();
    for (key, timestamp, content, location, completed) in rows {
        let timestamp = parse_timestamp(&timestamp)?;
        activities.entry(key).or_default().push(Activity {
            timestamp,
            content,
            location,
            completed,
        });
    }

    ProgramState::from_parts(participants, pairs, activities).map_err(StoreError::Corrupt)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad activity timestamp '{}': {}", s, e)))
}

// ============================================================
// In-memory store
// ============================================================

#[derive(Debug, Default)]
struct MemoryInner {
    snapshot: Option<ProgramState>,
    save_count: usize,
    fail_next_save: bool,
}

/// Keeps the last saved state in memory.
///
/// Clones share the same underlying snapshot, so a test can hand one clone to
/// a [`crate::program::Program`] and inspect saves through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Rc<RefCell<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds a committed state.
    pub fn with_state(state: ProgramState) -> Self {
        let store = Self::new();
        store.inner.borrow_mut().snapshot = Some(state);
        store
    }

    pub fn save_count(&self) -> usize {
        self.inner.borrow().save_count
    }

    pub fn snapshot(&self) -> Option<ProgramState> {
        self.inner.borrow().snapshot.clone()
    }

    /// Make the next call to [`Store::save`] fail without changing the snapshot.
    pub fn fail_next_save(&self) {
        self.inner.borrow_mut().fail_next_save = true;
    }
}

impl Store for MemoryStore {
    fn load(&self) -> Result<Option<ProgramState>, StoreError> {
        Ok(self.inner.borrow().snapshot.clone())
    }

    fn save(&mut self, state: &ProgramState) -> Result<(), StoreError> {
        let mut inner = self.inner.borrow_mut();
        if inner.fail_next_save {
            inner.fail_next_save = false;
            return Err(StoreError::Io(io::Error::other("simulated save failure")));
        }
        inner.snapshot = Some(state.clone());
        inner.save_count += 1;
        Ok(())
    }
}
