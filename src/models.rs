use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Entity types ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Server-side proof of identity. The token is opaque: a random value the
/// client replays and the server resolves against the sessions table on
/// every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

/// A note — the unit of captured knowledge.
///
/// `inbox` flags it for later triage rather than filed. Ownership is fixed
/// at creation: `user_id` always comes from the session, never the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub title: Option<String>,
    pub content: String,
    pub inbox: bool,
    pub tag_ids: Vec<Uuid>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task. `habit` marks it as recurring rather than one-off. `completed`
/// always starts false; the create endpoint does not accept it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub habit: bool,
    pub completed: bool,
    pub tag_ids: Vec<Uuid>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// ── API request/response types ────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            name: user.display_name,
            email: user.email,
        }
    }
}

/// Wire form is camelCase throughout; that is the contract existing
/// clients speak. Unknown fields (a client-supplied ownerId, say) are
/// silently ignored.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    pub title: Option<String>,
    /// Required, but validated in the handler so an absent field yields the
    /// fixed 400 payload rather than a deserialization error.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub inbox: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    /// ISO-8601 string; parsed and validated in the handler.
    pub due_date: Option<String>,
    #[serde(default)]
    pub habit: bool,
}

/// Raw list-query flags. The filter semantics are value-sensitive (only the
/// literal string "true" has any effect), so these stay strings instead of
/// booleans.
#[derive(Debug, Default, Deserialize)]
pub struct ListNotesQuery {
    pub inbox: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    pub completed: Option<String>,
    pub habit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: String,
    pub inbox: bool,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    pub habit: bool,
    pub completed: bool,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub recent_notes: Vec<NoteResponse>,
    pub recent_tasks: Vec<TaskResponse>,
    pub inbox_count: u64,
    /// True count of incomplete tasks, not the length of `recent_tasks`
    /// (which is capped at the page size).
    pub active_task_count: u64,
}
