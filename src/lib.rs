pub mod api;
pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod settings;
pub mod store;

pub use auth::{AppState, SharedState};
pub use error::AppError;
pub use store::Store;
