//! Quick-capture CLI: the note/task capture flow against a running server.
//!
//! Usage:
//!   capture note [--title <title>] <content>...
//!   capture task <title> [description]...
//!
//! Server and credentials come from the environment:
//!   BRAIN_URL       server base url (default http://localhost:3000)
//!   BRAIN_TOKEN     existing session token, or
//!   BRAIN_USER + BRAIN_PASSWORD to log in first

use brain_server::client::{CaptureClient, CaptureError};
use std::env;
use std::process::ExitCode;

const USAGE: &str = "usage: capture note [--title <title>] <content>...\n       capture task <title> [description]...";

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    let base_url =
        env::var("BRAIN_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let client = match authenticate(base_url).await {
        Ok(client) => client,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    let result = match args.first().map(String::as_str) {
        Some("note") => {
            let (title, content) = match parse_note_args(&args[1..]) {
                Some(parsed) => parsed,
                None => {
                    eprintln!("{USAGE}");
                    return ExitCode::from(2);
                }
            };
            capture_note(&client, &title, &content).await
        }
        Some("task") => {
            let Some(title) = args.get(1) else {
                eprintln!("{USAGE}");
                return ExitCode::from(2);
            };
            let description = args[2..].join(" ");
            capture_task(&client, title, &description).await
        }
        _ => {
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(()) => ExitCode::FAILURE,
    }
}

async fn authenticate(base_url: String) -> Result<CaptureClient, String> {
    if let Ok(token) = env::var("BRAIN_TOKEN") {
        return Ok(CaptureClient::new(base_url).with_token(token));
    }

    match (env::var("BRAIN_USER"), env::var("BRAIN_PASSWORD")) {
        (Ok(user), Ok(password)) => {
            let mut client = CaptureClient::new(base_url);
            client
                .login(&user, &password)
                .await
                .map_err(|e| generic(&e, "Sign in failed").to_string())?;
            Ok(client)
        }
        _ => Err("set BRAIN_TOKEN, or BRAIN_USER and BRAIN_PASSWORD".to_string()),
    }
}

/// `note [--title <title>] <content>...`; content words are joined.
fn parse_note_args(args: &[String]) -> Option<(String, String)> {
    let (title, rest) = match args.first().map(String::as_str) {
        Some("--title") => (args.get(1)?.clone(), &args[2..]),
        _ => (String::new(), args),
    };

    if rest.is_empty() {
        return None;
    }
    Some((title, rest.join(" ")))
}

async fn capture_note(client: &CaptureClient, title: &str, content: &str) -> Result<(), ()> {
    match client.capture_note(title, content).await {
        Ok(note) => {
            println!("Saved to inbox ({})", note.id);
            Ok(())
        }
        Err(e) => {
            // One generic line, like the capture form; the structured
            // detail stays on the error for anyone who asks for it.
            eprintln!("{}", generic(&e, "Failed to create note"));
            tracing::debug!(error = %e, "capture failed");
            Err(())
        }
    }
}

async fn capture_task(client: &CaptureClient, title: &str, description: &str) -> Result<(), ()> {
    match client.capture_task(title, description).await {
        Ok(task) => {
            println!("Task created ({})", task.id);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", generic(&e, "Failed to create task"));
            tracing::debug!(error = %e, "capture failed");
            Err(())
        }
    }
}

fn generic<'a>(error: &CaptureError, fallback: &'a str) -> &'a str {
    match error {
        CaptureError::Transport(_) => "Something went wrong",
        _ => fallback,
    }
}
