use serde::Deserialize;
use std::{error::Error, fs, io::ErrorKind};

const SETTINGS_FILENAME: &str = "settings.json";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub bind_addr: String,
    pub db_path: String,
    pub default_user_name: String,
    pub default_user_password: String,
    pub default_user_email: String,
    pub default_user_display_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            bind_addr: "0.0.0.0:3000".to_string(),
            db_path: "brain.redb".to_string(),
            default_user_name: "admin".to_string(),
            default_user_password: "admin".to_string(),
            default_user_email: "admin@localhost".to_string(),
            default_user_display_name: "Admin".to_string(),
        }
    }
}

impl Settings {
    /// Load settings.json from the working directory. A missing file means
    /// defaults; a malformed file is an error, not a silent fallback.
    pub fn load() -> Result<Settings, Box<dyn Error>> {
        let content = match fs::read_to_string(SETTINGS_FILENAME) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Settings::default()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_in_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "bind_addr": "127.0.0.1:8080" }"#).unwrap();
        assert_eq!(settings.bind_addr, "127.0.0.1:8080");
        assert_eq!(settings.db_path, "brain.redb");
        assert_eq!(settings.default_user_name, "admin");
    }
}
