use crate::error::AppError;
use crate::models::{LoginRequest, LoginResponse, Session, User};
use crate::store::Store;
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
    Extension, Json,
};
use std::sync::Arc;

// ── Shared state ───────────────────────────────────────────────

pub struct AppState {
    pub store: Store,
}

pub type SharedState = Arc<AppState>;

// ── Helpers ────────────────────────────────────────────────────

fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Resolve an Authorization header value to the caller's session and user.
///
/// Missing header, malformed header, unknown or expired token, and a
/// dangling user id all read the same from outside: Unauthorized, with the
/// fixed payload and no further detail.
pub fn resolve_bearer(
    store: &Store,
    auth_header: Option<&str>,
) -> Result<(Session, User), AppError> {
    let token = match auth_header {
        Some(h) if h.starts_with("Bearer ") => &h[7..],
        _ => return Err(AppError::Unauthorized),
    };

    let session = store.get_session(token)?.ok_or(AppError::Unauthorized)?;
    let user = store
        .get_user(session.user_id)?
        .ok_or(AppError::Unauthorized)?;

    Ok((session, user))
}

// ── Session guard ──────────────────────────────────────────────

/// Router-level session guard. Applied once to the whole data route table;
/// handlers never re-check, they just pick the user out of extensions.
pub async fn session_guard(
    State(state): State<SharedState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let (session, user) = resolve_bearer(&state.store, auth_header)?;

    request.extensions_mut().insert(session);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

// ── Handlers ───────────────────────────────────────────────────

pub async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    // Unknown username and wrong password produce the same response.
    let user = state
        .store
        .get_user_by_username(&payload.username)?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&payload.password, &user.password_hash) {
        return Err(AppError::Unauthorized);
    }

    let session = state.store.create_session(user.id)?;
    tracing::info!(user = %user.username, "logged in");

    Ok(Json(LoginResponse {
        token: session.token,
        user: user.into(),
    }))
}

pub async fn logout(
    State(state): State<SharedState>,
    Extension(session): Extension<Session>,
) -> Result<StatusCode, AppError> {
    state.store.delete_session(&session.token)?;
    Ok(StatusCode::OK)
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::fs;
    use uuid::Uuid;

    fn temp_state(name: &str) -> (SharedState, String) {
        let path = format!("/tmp/brain_auth_{name}_{}.redb", std::process::id());
        let _ = fs::remove_file(&path);
        let store = Store::open(&path).unwrap();
        (Arc::new(AppState { store }), path)
    }

    fn cleanup(path: &str) {
        let _ = fs::remove_file(path);
    }

    fn seed_user(store: &Store, username: &str, password: &str) -> User {
        use argon2::{
            password_hash::{rand_core::OsRng, SaltString},
            PasswordHasher,
        };

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .unwrap()
            .to_string();

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            display_name: username.to_string(),
            password_hash,
            created_at: Utc::now(),
        };
        store.create_user(&user).unwrap();
        user
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    #[tokio::test]
    async fn login_issues_a_working_session() {
        let (state, path) = temp_state("login_ok");
        let user = seed_user(&state.store, "alice", "correct horse");

        let response = login(
            State(state.clone()),
            Json(LoginRequest {
                username: "alice".to_string(),
                password: "correct horse".to_string(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.user.id, user.id);
        assert_eq!(response.user.name, "alice");

        let (session, resolved) =
            resolve_bearer(&state.store, Some(&bearer(&response.token))).unwrap();
        assert_eq!(session.user_id, user.id);
        assert_eq!(resolved.id, user.id);

        cleanup(&path);
    }

    #[tokio::test]
    async fn bad_password_and_unknown_user_look_identical() {
        let (state, path) = temp_state("login_bad");
        seed_user(&state.store, "alice", "correct horse");

        let wrong_password = login(
            State(state.clone()),
            Json(LoginRequest {
                username: "alice".to_string(),
                password: "battery staple".to_string(),
            }),
        )
        .await
        .unwrap_err();

        let unknown_user = login(
            State(state.clone()),
            Json(LoginRequest {
                username: "mallory".to_string(),
                password: "whatever".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert!(matches!(wrong_password, AppError::Unauthorized));
        assert!(matches!(unknown_user, AppError::Unauthorized));

        cleanup(&path);
    }

    #[test]
    fn resolve_bearer_rejects_everything_but_a_live_token() {
        let (state, path) = temp_state("resolve");
        let user = seed_user(&state.store, "alice", "pw");
        let session = state.store.create_session(user.id).unwrap();

        // the happy path works
        assert!(resolve_bearer(&state.store, Some(&bearer(&session.token))).is_ok());

        // everything else is the same Unauthorized
        for header in [
            None,
            Some("Bearer "),
            Some("Bearer no-such-token"),
            Some("Basic abc"),
            Some(session.token.as_str()), // token without the scheme
        ] {
            let err = resolve_bearer(&state.store, header).unwrap_err();
            assert!(matches!(err, AppError::Unauthorized), "header {header:?}");
        }

        cleanup(&path);
    }

    #[test]
    fn expired_session_is_unauthorized() {
        let (state, path) = temp_state("expired");
        let user = seed_user(&state.store, "alice", "pw");

        let session = Session {
            token: "stale".to_string(),
            user_id: user.id,
            created_at: Utc::now() - chrono::Duration::days(30),
            expires_at: Utc::now() - chrono::Duration::days(23),
        };
        state.store.put_session(&session).unwrap();

        let err = resolve_bearer(&state.store, Some(&bearer("stale"))).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));

        cleanup(&path);
    }

    #[tokio::test]
    async fn logout_invalidates_the_session() {
        let (state, path) = temp_state("logout");
        let user = seed_user(&state.store, "alice", "pw");
        let session = state.store.create_session(user.id).unwrap();

        let status = logout(State(state.clone()), Extension(session.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);

        let err = resolve_bearer(&state.store, Some(&bearer(&session.token))).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));

        cleanup(&path);
    }
}
