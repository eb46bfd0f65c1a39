//! HTTP client for the quick-capture flow.
//!
//! The capture UI collapses every failure into one generic line, but the
//! client keeps the server's error contract intact: kind and message
//! survive to the caller, and display policy stays in the bin.

use crate::models::{
    CreateNoteRequest, CreateTaskRequest, LoginRequest, LoginResponse, NoteResponse, TaskResponse,
};
use reqwest::StatusCode;
use serde::Deserialize;

/// What went wrong, as the server reported it.
#[derive(Debug)]
pub enum CaptureError {
    Unauthorized(String),
    Validation(String),
    Server(String),
    /// The request never produced a server response.
    Transport(String),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::Unauthorized(m) => write!(f, "unauthorized: {m}"),
            CaptureError::Validation(m) => write!(f, "validation: {m}"),
            CaptureError::Server(m) => write!(f, "server: {m}"),
            CaptureError::Transport(m) => write!(f, "transport: {m}"),
        }
    }
}

impl std::error::Error for CaptureError {}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct CaptureClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl CaptureClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        CaptureClient {
            base_url: base_url.into(),
            token: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), CaptureError> {
        let response = self
            .http
            .post(format!("{}/api/auth/login", self.base_url))
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await
            .map_err(|e| CaptureError::Transport(e.to_string()))?;

        let login: LoginResponse = read(response).await?;
        self.token = Some(login.token);
        Ok(())
    }

    /// Quick-capture a note. Always lands in the inbox; an empty title
    /// becomes "Quick Note" (both exactly what the capture form sends).
    pub async fn capture_note(
        &self,
        title: &str,
        content: &str,
    ) -> Result<NoteResponse, CaptureError> {
        let title = if title.is_empty() { "Quick Note" } else { title };
        let body = CreateNoteRequest {
            title: Some(title.to_string()),
            content: content.to_string(),
            inbox: true,
        };
        self.post_json("/api/notes", &body).await
    }

    /// Quick-capture a task. Due date and habit flag are not part of the
    /// quick flow; the server defaults apply.
    pub async fn capture_task(
        &self,
        title: &str,
        description: &str,
    ) -> Result<TaskResponse, CaptureError> {
        let body = CreateTaskRequest {
            title: title.to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            due_date: None,
            habit: false,
        };
        self.post_json("/api/tasks", &body).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, CaptureError>
    where
        B: serde::Serialize,
        T: serde::de::DeserializeOwned,
    {
        let mut request = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CaptureError::Transport(e.to_string()))?;
        read(response).await
    }
}

async fn read<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, CaptureError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| CaptureError::Transport(e.to_string()));
    }

    let message = response
        .json::<ErrorBody>()
        .await
        .map(|body| body.error)
        .unwrap_or_else(|_| status.to_string());

    Err(match status {
        StatusCode::UNAUTHORIZED => CaptureError::Unauthorized(message),
        StatusCode::BAD_REQUEST => CaptureError::Validation(message),
        _ => CaptureError::Server(message),
    })
}
