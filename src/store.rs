//! Entity store over redb.
//!
//! redb is the system of record: one table per collection, postcard-encoded
//! values keyed by uuid bytes (sessions are keyed by their opaque token).
//! List queries are linear scans filtered and sorted in Rust — fine for one
//! person's notes and tasks.

use crate::models::{Note, Session, Tag, Task, User};
use crate::settings::Settings;
use chrono::{Duration, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use std::sync::Arc;
use uuid::Uuid;

const USERS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("users");
const USERNAME_INDEX: TableDefinition<&str, &[u8]> = TableDefinition::new("username_index");
const SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");
const NOTES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("notes");
const TASKS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("tasks");
const TAGS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("tags");

/// How long a session stays valid after login.
const SESSION_TTL_DAYS: i64 = 7;

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    postcard::to_allocvec(value).map_err(|e| StoreError::Encode(e.to_string()))
}

fn decode<T: for<'de> serde::Deserialize<'de>>(bytes: &[u8]) -> Result<T, StoreError> {
    postcard::from_bytes(bytes).map_err(|e| StoreError::Decode(e.to_string()))
}

/// Thin handle to the redb file. Cloneable (Arc inside).
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
}

impl Store {
    /// Open (or create) the store at the given path.
    /// Creates tables if they don't exist.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let db = Database::create(path)?;

        // Ensure tables exist
        let txn = db.begin_write()?;
        {
            let _ = txn.open_table(USERS)?;
            let _ = txn.open_table(USERNAME_INDEX)?;
            let _ = txn.open_table(SESSIONS)?;
            let _ = txn.open_table(NOTES)?;
            let _ = txn.open_table(TASKS)?;
            let _ = txn.open_table(TAGS)?;
        }
        txn.commit()?;

        Ok(Store { db: Arc::new(db) })
    }

    // ── Users ──────────────────────────────────────────────────

    pub fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut users = txn.open_table(USERS)?;
            let mut by_name = txn.open_table(USERNAME_INDEX)?;
            users.insert(user.id.as_bytes().as_slice(), encode(user)?.as_slice())?;
            by_name.insert(user.username.as_str(), user.id.as_bytes().as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let txn = self.db.begin_read()?;
        let users = txn.open_table(USERS)?;
        match users.get(id.as_bytes().as_slice())? {
            Some(raw) => Ok(Some(decode(raw.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let txn = self.db.begin_read()?;
        let by_name = txn.open_table(USERNAME_INDEX)?;

        let id = match by_name.get(username)? {
            Some(raw) => {
                Uuid::from_slice(raw.value()).map_err(|e| StoreError::Decode(e.to_string()))?
            }
            None => return Ok(None),
        };

        let users = txn.open_table(USERS)?;
        match users.get(id.as_bytes().as_slice())? {
            Some(raw) => Ok(Some(decode(raw.value())?)),
            None => Ok(None),
        }
    }

    pub fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let txn = self.db.begin_read()?;
        let users = txn.open_table(USERS)?;

        let mut out = Vec::new();
        for entry in users.iter()? {
            let (_, raw) = entry?;
            out.push(decode(raw.value())?);
        }
        Ok(out)
    }

    /// Seed the default user if the store has none. Returns true if created.
    /// Sign-up lives outside this codebase; this is how a fresh install gets
    /// its first account.
    pub fn ensure_default_user(&self, settings: &Settings) -> Result<bool, StoreError> {
        if !self.list_users()?.is_empty() {
            return Ok(false);
        }

        use argon2::{
            password_hash::{rand_core::OsRng, SaltString},
            Argon2, PasswordHasher,
        };

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(settings.default_user_password.as_bytes(), &salt)
            .unwrap()
            .to_string();

        let user = User {
            id: Uuid::new_v4(),
            username: settings.default_user_name.clone(),
            email: settings.default_user_email.clone(),
            display_name: settings.default_user_display_name.clone(),
            password_hash,
            created_at: Utc::now(),
        };

        self.create_user(&user)?;
        Ok(true)
    }

    // ── Sessions ───────────────────────────────────────────────

    /// Issue a fresh opaque session for a user.
    pub fn create_session(&self, user_id: Uuid) -> Result<Session, StoreError> {
        let now = Utc::now();
        let session = Session {
            token: Uuid::new_v4().simple().to_string(),
            user_id,
            created_at: now,
            expires_at: now + Duration::days(SESSION_TTL_DAYS),
        };
        self.put_session(&session)?;
        Ok(session)
    }

    pub fn put_session(&self, session: &Session) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut sessions = txn.open_table(SESSIONS)?;
            sessions.insert(session.token.as_str(), encode(session)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Resolve a token to a live session. An expired session reads as absent.
    pub fn get_session(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let txn = self.db.begin_read()?;
        let sessions = txn.open_table(SESSIONS)?;

        let session: Session = match sessions.get(token)? {
            Some(raw) => decode(raw.value())?,
            None => return Ok(None),
        };

        if session.expires_at <= Utc::now() {
            return Ok(None);
        }
        Ok(Some(session))
    }

    pub fn delete_session(&self, token: &str) -> Result<bool, StoreError> {
        let txn = self.db.begin_write()?;
        let deleted;
        {
            let mut sessions = txn.open_table(SESSIONS)?;
            deleted = sessions.remove(token)?.is_some();
        }
        txn.commit()?;
        Ok(deleted)
    }

    // ── Notes ──────────────────────────────────────────────────

    pub fn create_note(&self, note: &Note) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut notes = txn.open_table(NOTES)?;
            notes.insert(note.id.as_bytes().as_slice(), encode(note)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_note(&self, id: Uuid) -> Result<Option<Note>, StoreError> {
        let txn = self.db.begin_read()?;
        let notes = txn.open_table(NOTES)?;
        match notes.get(id.as_bytes().as_slice())? {
            Some(raw) => Ok(Some(decode(raw.value())?)),
            None => Ok(None),
        }
    }

    /// One user's notes, newest update first. `inbox_only` narrows to
    /// inbox-flagged notes; false applies no inbox filter at all. False is
    /// not a filter value on this surface.
    pub fn list_notes(&self, user_id: Uuid, inbox_only: bool) -> Result<Vec<Note>, StoreError> {
        let txn = self.db.begin_read()?;
        let notes = txn.open_table(NOTES)?;

        let mut out: Vec<Note> = Vec::new();
        for entry in notes.iter()? {
            let (_, raw) = entry?;
            let note: Note = decode(raw.value())?;
            if note.user_id != user_id {
                continue;
            }
            if inbox_only && !note.inbox {
                continue;
            }
            out.push(note);
        }

        // Newest update first; ties fall back to scan order, which redb
        // keeps stable between reads.
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(out)
    }

    pub fn count_inbox_notes(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let txn = self.db.begin_read()?;
        let notes = txn.open_table(NOTES)?;

        let mut count = 0;
        for entry in notes.iter()? {
            let (_, raw) = entry?;
            let note: Note = decode(raw.value())?;
            if note.user_id == user_id && note.inbox {
                count += 1;
            }
        }
        Ok(count)
    }

    // ── Tasks ──────────────────────────────────────────────────

    pub fn create_task(&self, task: &Task) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut tasks = txn.open_table(TASKS)?;
            tasks.insert(task.id.as_bytes().as_slice(), encode(task)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let txn = self.db.begin_read()?;
        let tasks = txn.open_table(TASKS)?;
        match tasks.get(id.as_bytes().as_slice())? {
            Some(raw) => Ok(Some(decode(raw.value())?)),
            None => Ok(None),
        }
    }

    /// One user's tasks matching `completed` exactly, newest first. The
    /// completed flag is always part of the filter; `habit_only` narrows to
    /// habit tasks and false applies no habit filter.
    pub fn list_tasks(
        &self,
        user_id: Uuid,
        completed: bool,
        habit_only: bool,
    ) -> Result<Vec<Task>, StoreError> {
        let txn = self.db.begin_read()?;
        let tasks = txn.open_table(TASKS)?;

        let mut out: Vec<Task> = Vec::new();
        for entry in tasks.iter()? {
            let (_, raw) = entry?;
            let task: Task = decode(raw.value())?;
            if task.user_id != user_id || task.completed != completed {
                continue;
            }
            if habit_only && !task.habit {
                continue;
            }
            out.push(task);
        }

        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    pub fn count_active_tasks(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let txn = self.db.begin_read()?;
        let tasks = txn.open_table(TASKS)?;

        let mut count = 0;
        for entry in tasks.iter()? {
            let (_, raw) = entry?;
            let task: Task = decode(raw.value())?;
            if task.user_id == user_id && !task.completed {
                count += 1;
            }
        }
        Ok(count)
    }

    // ── Tags ───────────────────────────────────────────────────
    // Tags are read-only on the HTTP surface; the organize flows that name
    // and assign them live elsewhere. The store still knows how to attach
    // them so list responses can embed them.

    pub fn create_tag(&self, tag: &Tag) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut tags = txn.open_table(TAGS)?;
            tags.insert(tag.id.as_bytes().as_slice(), encode(tag)?.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Resolve tag ids to tags. Dangling ids are skipped, not errors.
    pub fn get_tags(&self, ids: &[Uuid]) -> Result<Vec<Tag>, StoreError> {
        let txn = self.db.begin_read()?;
        let tags = txn.open_table(TAGS)?;

        let mut out = Vec::new();
        for id in ids {
            if let Some(raw) = tags.get(id.as_bytes().as_slice())? {
                out.push(decode(raw.value())?);
            }
        }
        Ok(out)
    }

    /// Attach a tag to a note. Returns false if the note doesn't exist.
    pub fn tag_note(&self, note_id: Uuid, tag_id: Uuid) -> Result<bool, StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut notes = txn.open_table(NOTES)?;
            let mut note: Note = match notes.get(note_id.as_bytes().as_slice())? {
                Some(raw) => decode(raw.value())?,
                None => return Ok(false),
            };
            if !note.tag_ids.contains(&tag_id) {
                note.tag_ids.push(tag_id);
                notes.insert(note_id.as_bytes().as_slice(), encode(&note)?.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(true)
    }

    /// Attach a tag to a task. Returns false if the task doesn't exist.
    pub fn tag_task(&self, task_id: Uuid, tag_id: Uuid) -> Result<bool, StoreError> {
        let txn = self.db.begin_write()?;
        {
            let mut tasks = txn.open_table(TASKS)?;
            let mut task: Task = match tasks.get(task_id.as_bytes().as_slice())? {
                Some(raw) => decode(raw.value())?,
                None => return Ok(false),
            };
            if !task.tag_ids.contains(&tag_id) {
                task.tag_ids.push(tag_id);
                tasks.insert(task_id.as_bytes().as_slice(), encode(&task)?.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(true)
    }
}

// ── Errors ─────────────────────────────────────────────────────

#[derive(Debug)]
pub enum StoreError {
    Redb(String),
    Decode(String),
    Encode(String),
}

// redb 2.x has many error types. Blanket them all into StoreError::Redb.
macro_rules! from_redb {
    ($($t:ty),*) => {
        $(impl From<$t> for StoreError {
            fn from(e: $t) -> Self { StoreError::Redb(e.to_string()) }
        })*
    };
}

from_redb!(
    redb::Error,
    redb::DatabaseError,
    redb::TableError,
    redb::TransactionError,
    redb::StorageError,
    redb::CommitError
);

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Redb(e) => write!(f, "redb: {e}"),
            StoreError::Decode(e) => write!(f, "decode: {e}"),
            StoreError::Encode(e) => write!(f, "encode: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

// ── Tests ──────────────────────────────────────────────────────
