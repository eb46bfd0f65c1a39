use crate::auth::SharedState;
use crate::error::AppError;
use crate::models::{
    CreateNoteRequest, CreateTaskRequest, DashboardResponse, ListNotesQuery, ListTasksQuery, Note,
    NoteResponse, Task, TaskResponse, User,
};
use crate::store::{Store, StoreError};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Fixed page size for the dashboard lists.
const DASHBOARD_PAGE: usize = 5;

// ── Helpers ────────────────────────────────────────────────────

/// A list-query flag narrows only on the literal value "true". "false",
/// absence, or anything else reads as false; that is the caller-observable
/// contract existing clients depend on.
fn flag(value: &Option<String>) -> bool {
    value.as_deref() == Some("true")
}

/// Accepts RFC 3339 or a bare YYYY-MM-DD date (taken as midnight UTC).
fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn note_to_response(store: &Store, note: Note) -> Result<NoteResponse, AppError> {
    let tags = store.get_tags(&note.tag_ids)?;
    Ok(NoteResponse {
        id: note.id,
        title: note.title,
        content: note.content,
        inbox: note.inbox,
        tags,
        user_id: note.user_id,
        created_at: note.created_at,
        updated_at: note.updated_at,
    })
}

fn task_to_response(store: &Store, task: Task) -> Result<TaskResponse, AppError> {
    let tags = store.get_tags(&task.tag_ids)?;
    Ok(TaskResponse {
        id: task.id,
        title: task.title,
        description: task.description,
        due_date: task.due_date,
        habit: task.habit,
        completed: task.completed,
        tags,
        user_id: task.user_id,
        created_at: task.created_at,
    })
}

// ── Notes ──────────────────────────────────────────────────────

// POST /api/notes
pub async fn create_note(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<NoteResponse>), AppError> {
    if payload.content.is_empty() {
        return Err(AppError::Validation("Content is required"));
    }

    let now = Utc::now();
    let note = Note {
        id: Uuid::new_v4(),
        title: payload.title,
        content: payload.content,
        inbox: payload.inbox,
        tag_ids: Vec::new(),
        user_id: user.id,
        created_at: now,
        updated_at: now,
    };

    state.store.create_note(&note)?;
    tracing::debug!(note = %note.id, user = %user.id, "note created");

    let response = note_to_response(&state.store, note)?;
    Ok((StatusCode::CREATED, Json(response)))
}

// GET /api/notes?inbox=true|false
pub async fn list_notes(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Query(query): Query<ListNotesQuery>,
) -> Result<Json<Vec<NoteResponse>>, AppError> {
    let notes = state.store.list_notes(user.id, flag(&query.inbox))?;

    let mut responses = Vec::with_capacity(notes.len());
    for note in notes {
        responses.push(note_to_response(&state.store, note)?);
    }
    Ok(Json(responses))
}

// ── Tasks ──────────────────────────────────────────────────────

// POST /api/tasks
pub async fn create_task(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), AppError> {
    if payload.title.is_empty() {
        return Err(AppError::Validation("Title is required"));
    }

    // A due date that doesn't parse is rejected, not stored as a sentinel.
    let due_date = match payload.due_date.as_deref() {
        Some(raw) => Some(parse_due_date(raw).ok_or(AppError::Validation("Invalid due date"))?),
        None => None,
    };

    let task = Task {
        id: Uuid::new_v4(),
        title: payload.title,
        description: payload.description,
        due_date,
        habit: payload.habit,
        completed: false,
        tag_ids: Vec::new(),
        user_id: user.id,
        created_at: Utc::now(),
    };

    state.store.create_task(&task)?;
    tracing::debug!(task = %task.id, user = %user.id, "task created");

    let response = task_to_response(&state.store, task)?;
    Ok((StatusCode::CREATED, Json(response)))
}

// GET /api/tasks?completed=true|false&habit=true|false
pub async fn list_tasks(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Vec<TaskResponse>>, AppError> {
    // The completed flag is always applied: an absent parameter is
    // indistinguishable from completed=false.
    let tasks = state
        .store
        .list_tasks(user.id, flag(&query.completed), flag(&query.habit))?;

    let mut responses = Vec::with_capacity(tasks.len());
    for task in tasks {
        responses.push(task_to_response(&state.store, task)?);
    }
    Ok(Json(responses))
}

// ── Dashboard ──────────────────────────────────────────────────

// GET /api/dashboard
pub async fn dashboard(
    State(state): State<SharedState>,
    Extension(user): Extension<User>,
) -> Result<Json<DashboardResponse>, AppError> {
    // Three independent reads, fanned out and joined. The counts are
    // dedicated queries: the task page is capped at 5, so its length cannot
    // stand in for the active-task count.
    let notes_store = state.store.clone();
    let tasks_store = state.store.clone();
    let counts_store = state.store.clone();
    let user_id = user.id;

    let (notes, tasks, counts) = tokio::join!(
        tokio::task::spawn_blocking(move || notes_store.list_notes(user_id, false)),
        tokio::task::spawn_blocking(move || tasks_store.list_tasks(user_id, false, false)),
        tokio::task::spawn_blocking(move || {
            let inbox = counts_store.count_inbox_notes(user_id)?;
            let active = counts_store.count_active_tasks(user_id)?;
            Ok::<_, StoreError>((inbox, active))
        }),
    );

    let mut notes = notes.map_err(|e| AppError::Internal(e.to_string()))??;
    let mut tasks = tasks.map_err(|e| AppError::Internal(e.to_string()))??;
    let (inbox_count, active_task_count) = counts.map_err(|e| AppError::Internal(e.to_string()))??;

    notes.truncate(DASHBOARD_PAGE);
    tasks.truncate(DASHBOARD_PAGE);

    let mut recent_notes = Vec::with_capacity(notes.len());
    for note in notes {
        recent_notes.push(note_to_response(&state.store, note)?);
    }
    let mut recent_tasks = Vec::with_capacity(tasks.len());
    for task in tasks {
        recent_tasks.push(task_to_response(&state.store, task)?);
    }

    Ok(Json(DashboardResponse {
        recent_notes,
        recent_tasks,
        inbox_count,
        active_task_count,
    }))
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AppState;
    use crate::models::Tag;
    use std::fs;
    use std::sync::Arc;

    fn temp_state(name: &str) -> (SharedState, String) {
        let path = format!("/tmp/brain_api_{name}_{}.redb", std::process::id());
        let _ = fs::remove_file(&path);
        let store = Store::open(&path).unwrap();
        (Arc::new(AppState { store }), path)
    }

    fn cleanup(path: &str) {
        let _ = fs::remove_file(path);
    }

    fn caller(name: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: name.to_string(),
            email: format!("{name}@example.com"),
            display_name: name.to_string(),
            password_hash: "unused".to_string(),
            created_at: Utc::now(),
        }
    }

    fn note_body(content: &str, inbox: bool) -> CreateNoteRequest {
        CreateNoteRequest {
            title: None,
            content: content.to_string(),
            inbox,
        }
    }

    fn task_body(title: &str) -> CreateTaskRequest {
        CreateTaskRequest {
            title: title.to_string(),
            description: None,
            due_date: None,
            habit: false,
        }
    }

    fn notes_query(inbox: Option<&str>) -> Query<ListNotesQuery> {
        Query(ListNotesQuery {
            inbox: inbox.map(str::to_string),
        })
    }

    fn tasks_query(completed: Option<&str>, habit: Option<&str>) -> Query<ListTasksQuery> {
        Query(ListTasksQuery {
            completed: completed.map(str::to_string),
            habit: habit.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn create_note_is_owned_by_the_caller() {
        let (state, path) = temp_state("note_owner");
        let user = caller("alice");

        let (status, Json(created)) = create_note(
            State(state.clone()),
            Extension(user.clone()),
            Json(note_body("remember this", true)),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.user_id, user.id);
        assert!(created.inbox);

        let stored = state.store.get_note(created.id).unwrap().unwrap();
        assert_eq!(stored.user_id, user.id);
        assert_eq!(stored.content, "remember this");

        cleanup(&path);
    }

    #[tokio::test]
    async fn create_note_rejects_empty_content_before_storage() {
        let (state, path) = temp_state("note_content");
        let user = caller("alice");

        let err = create_note(
            State(state.clone()),
            Extension(user.clone()),
            Json(note_body("", true)),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Validation("Content is required")));
        assert!(state.store.list_notes(user.id, false).unwrap().is_empty());

        cleanup(&path);
    }

    #[tokio::test]
    async fn create_task_rejects_empty_title_before_storage() {
        let (state, path) = temp_state("task_title");
        let user = caller("alice");

        let err = create_task(
            State(state.clone()),
            Extension(user.clone()),
            Json(task_body("")),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Validation("Title is required")));
        assert!(state
            .store
            .list_tasks(user.id, false, false)
            .unwrap()
            .is_empty());

        cleanup(&path);
    }

    #[tokio::test]
    async fn task_due_date_is_parsed_or_rejected() {
        let (state, path) = temp_state("task_due");
        let user = caller("alice");

        let mut body = task_body("pay rent");
        body.due_date = Some("2026-09-01".to_string());
        let (_, Json(created)) = create_task(
            State(state.clone()),
            Extension(user.clone()),
            Json(body),
        )
        .await
        .unwrap();
        assert_eq!(
            created.due_date.unwrap().to_rfc3339(),
            "2026-09-01T00:00:00+00:00"
        );

        let mut body = task_body("timestamped");
        body.due_date = Some("2026-09-01T12:30:00Z".to_string());
        assert!(create_task(
            State(state.clone()),
            Extension(user.clone()),
            Json(body),
        )
        .await
        .is_ok());

        let mut body = task_body("bad date");
        body.due_date = Some("not-a-date".to_string());
        let err = create_task(
            State(state.clone()),
            Extension(user.clone()),
            Json(body),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation("Invalid due date")));
        assert_eq!(state.store.list_tasks(user.id, false, false).unwrap().len(), 2);

        cleanup(&path);
    }

    #[tokio::test]
    async fn inbox_filter_only_narrows_on_true() {
        let (state, path) = temp_state("inbox_asym");
        let user = caller("alice");

        for (content, inbox) in [("triage me", true), ("filed", false)] {
            create_note(
                State(state.clone()),
                Extension(user.clone()),
                Json(note_body(content, inbox)),
            )
            .await
            .unwrap();
        }

        let Json(inbox_true) = list_notes(
            State(state.clone()),
            Extension(user.clone()),
            notes_query(Some("true")),
        )
        .await
        .unwrap();
        assert_eq!(inbox_true.len(), 1);
        assert!(inbox_true[0].inbox);

        // inbox=false and no parameter both return everything
        for query in [notes_query(Some("false")), notes_query(None)] {
            let Json(all) = list_notes(State(state.clone()), Extension(user.clone()), query)
                .await
                .unwrap();
            assert_eq!(all.len(), 2);
        }

        cleanup(&path);
    }

    #[tokio::test]
    async fn task_list_always_applies_the_completed_filter() {
        let (state, path) = temp_state("task_completed");
        let user = caller("alice");

        create_task(
            State(state.clone()),
            Extension(user.clone()),
            Json(task_body("open")),
        )
        .await
        .unwrap();

        // Completion isn't settable through the API; write one directly.
        let done = Task {
            id: Uuid::new_v4(),
            title: "done".to_string(),
            description: None,
            due_date: None,
            habit: false,
            completed: true,
            tag_ids: Vec::new(),
            user_id: user.id,
            created_at: Utc::now(),
        };
        state.store.create_task(&done).unwrap();

        // absent parameter behaves exactly like completed=false
        for query in [tasks_query(None, None), tasks_query(Some("false"), None)] {
            let Json(open) = list_tasks(State(state.clone()), Extension(user.clone()), query)
                .await
                .unwrap();
            assert_eq!(open.len(), 1);
            assert_eq!(open[0].title, "open");
        }

        let Json(completed) = list_tasks(
            State(state.clone()),
            Extension(user.clone()),
            tasks_query(Some("true"), None),
        )
        .await
        .unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].title, "done");

        cleanup(&path);
    }

    #[tokio::test]
    async fn habit_filter_only_narrows_on_true() {
        let (state, path) = temp_state("habit_asym");
        let user = caller("alice");

        let mut habit = task_body("daily run");
        habit.habit = true;
        create_task(State(state.clone()), Extension(user.clone()), Json(habit))
            .await
            .unwrap();
        create_task(
            State(state.clone()),
            Extension(user.clone()),
            Json(task_body("one-off")),
        )
        .await
        .unwrap();

        let Json(habits) = list_tasks(
            State(state.clone()),
            Extension(user.clone()),
            tasks_query(None, Some("true")),
        )
        .await
        .unwrap();
        assert_eq!(habits.len(), 1);
        assert!(habits[0].habit);

        let Json(all) = list_tasks(
            State(state.clone()),
            Extension(user.clone()),
            tasks_query(None, Some("false")),
        )
        .await
        .unwrap();
        assert_eq!(all.len(), 2);

        cleanup(&path);
    }

    #[tokio::test]
    async fn listing_is_scoped_to_the_caller() {
        let (state, path) = temp_state("scope");
        let alice = caller("alice");
        let bob = caller("bob");

        create_note(
            State(state.clone()),
            Extension(alice.clone()),
            Json(note_body("alice's idea", true)),
        )
        .await
        .unwrap();

        let Json(bobs_inbox) = list_notes(
            State(state.clone()),
            Extension(bob.clone()),
            notes_query(Some("true")),
        )
        .await
        .unwrap();
        assert!(bobs_inbox.is_empty());

        cleanup(&path);
    }

    #[tokio::test]
    async fn repeated_lists_are_identical() {
        let (state, path) = temp_state("stable");
        let user = caller("alice");

        for i in 0..4 {
            create_note(
                State(state.clone()),
                Extension(user.clone()),
                Json(note_body(&format!("note {i}"), false)),
            )
            .await
            .unwrap();
        }

        let Json(first) = list_notes(
            State(state.clone()),
            Extension(user.clone()),
            notes_query(None),
        )
        .await
        .unwrap();
        let Json(second) = list_notes(
            State(state.clone()),
            Extension(user.clone()),
            notes_query(None),
        )
        .await
        .unwrap();

        let first_ids: Vec<Uuid> = first.iter().map(|n| n.id).collect();
        let second_ids: Vec<Uuid> = second.iter().map(|n| n.id).collect();
        assert_eq!(first_ids, second_ids);

        cleanup(&path);
    }

    #[tokio::test]
    async fn dashboard_caps_the_page_but_counts_the_truth() {
        let (state, path) = temp_state("dashboard");
        let user = caller("alice");

        for i in 0..6 {
            create_task(
                State(state.clone()),
                Extension(user.clone()),
                Json(task_body(&format!("task {i}"))),
            )
            .await
            .unwrap();
        }
        for i in 0..2 {
            create_note(
                State(state.clone()),
                Extension(user.clone()),
                Json(note_body(&format!("note {i}"), true)),
            )
            .await
            .unwrap();
        }

        let Json(summary) = dashboard(State(state.clone()), Extension(user.clone()))
            .await
            .unwrap();

        // the page undercounts past 5; the dedicated count doesn't
        assert_eq!(summary.recent_tasks.len(), 5);
        assert_eq!(summary.active_task_count, 6);
        assert_eq!(summary.recent_notes.len(), 2);
        assert_eq!(summary.inbox_count, 2);

        cleanup(&path);
    }

    #[tokio::test]
    async fn list_responses_embed_tags() {
        let (state, path) = temp_state("tags");
        let user = caller("alice");

        let (_, Json(created)) = create_note(
            State(state.clone()),
            Extension(user.clone()),
            Json(note_body("tagged", false)),
        )
        .await
        .unwrap();

        let tag = Tag {
            id: Uuid::new_v4(),
            name: "reading".to_string(),
        };
        state.store.create_tag(&tag).unwrap();
        state.store.tag_note(created.id, tag.id).unwrap();

        let Json(notes) = list_notes(
            State(state.clone()),
            Extension(user.clone()),
            notes_query(None),
        )
        .await
        .unwrap();
        assert_eq!(notes[0].tags, vec![tag]);

        cleanup(&path);
    }
}
