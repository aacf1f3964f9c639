// Configuration loading and parsing (config/draftroom.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::draft::turn::DraftType;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// draftroom.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire draftroom.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    draft: DraftSection,
    server: ServerSection,
    queue: QueueSection,
    submission: SubmissionSection,
    database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize)]
struct DraftSection {
    draft_id: String,
    my_team_id: String,
    draft_type: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ServerSection {
    base_url: String,
    ws_url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct QueueSection {
    cap: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct SubmissionSection {
    timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

// ---------------------------------------------------------------------------
// Assembled Config
// ---------------------------------------------------------------------------

/// The validated application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server-assigned identifier of the draft to join.
    pub draft_id: String,
    /// The local user's team identifier within that draft.
    pub my_team_id: String,
    pub draft_type: DraftType,
    /// REST base URL for snapshot fetches.
    pub base_url: String,
    /// WebSocket URL of the draft-room push channel.
    pub ws_url: String,
    pub queue_cap: usize,
    /// How long a pick submission waits for its broadcast confirmation.
    pub pick_timeout: Duration,
    pub db_path: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/draftroom.toml` relative to
/// the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy
/// defaults. Prefer `load_config()` which handles default initialization.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("draftroom.toml");
    let text = read_file(&path)?;
    let file: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let draft_type =
        DraftType::from_str_type(&file.draft.draft_type).ok_or(ConfigError::ValidationError {
            field: "draft.draft_type".into(),
            message: format!(
                "unknown draft type `{}` (expected \"snake\" or \"linear\")",
                file.draft.draft_type
            ),
        })?;

    let config = Config {
        draft_id: file.draft.draft_id,
        my_team_id: file.draft.my_team_id,
        draft_type,
        base_url: file.server.base_url,
        ws_url: file.server.ws_url,
        queue_cap: file.queue.cap,
        pick_timeout: Duration::from_secs(file.submission.timeout_secs),
        db_path: file.database.path,
    };

    validate(&config)?;
    Ok(config)
}

/// Ensure the config file exists by copying it from `defaults/` when
/// missing. Returns the list of files that were copied.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();
    let source = defaults_dir.join("draftroom.toml");
    let target = config_dir.join("draftroom.toml");

    if source.is_file() && !target.exists() {
        std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to copy {}: {e}", source.display()),
        })?;
        copied.push(target);
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working
/// directory. Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.draft_id.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "draft.draft_id".into(),
            message: "must not be empty".into(),
        });
    }
    if config.my_team_id.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "draft.my_team_id".into(),
            message: "must not be empty".into(),
        });
    }
    if config.base_url.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "server.base_url".into(),
            message: "must not be empty".into(),
        });
    }
    if !config.ws_url.starts_with("ws://") && !config.ws_url.starts_with("wss://") {
        return Err(ConfigError::ValidationError {
            field: "server.ws_url".into(),
            message: format!("must be a ws:// or wss:// URL, got `{}`", config.ws_url),
        });
    }
    if config.queue_cap == 0 {
        return Err(ConfigError::ValidationError {
            field: "queue.cap".into(),
            message: "must be greater than 0".into(),
        });
    }
    if config.pick_timeout.is_zero() {
        return Err(ConfigError::ValidationError {
            field: "submission.timeout_secs".into(),
            message: "must be greater than 0".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const VALID_TOML: &str = r#"
[draft]
draft_id = "league42-2026"
my_team_id = "team_4"
draft_type = "snake"

[server]
base_url = "http://localhost:8000/api"
ws_url = "ws://localhost:8000/draft"

[queue]
cap = 25

[submission]
timeout_secs = 10

[database]
path = "draftroom.db"
"#;

    /// Write `text` as config/draftroom.toml under a fresh temp dir.
    fn write_config(dir_name: &str, text: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(dir_name);
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("draftroom.toml"), text).unwrap();
        tmp
    }

    #[test]
    fn load_valid_config() {
        let tmp = write_config("draftroom_config_valid", VALID_TOML);
        let config = load_config_from(&tmp).expect("should load valid config");

        assert_eq!(config.draft_id, "league42-2026");
        assert_eq!(config.my_team_id, "team_4");
        assert_eq!(config.draft_type, DraftType::Snake);
        assert_eq!(config.base_url, "http://localhost:8000/api");
        assert_eq!(config.ws_url, "ws://localhost:8000/draft");
        assert_eq!(config.queue_cap, 25);
        assert_eq!(config.pick_timeout, Duration::from_secs(10));
        assert_eq!(config.db_path, "draftroom.db");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_file_reports_path() {
        let tmp = std::env::temp_dir().join("draftroom_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_unknown_draft_type() {
        let text = VALID_TOML.replace("\"snake\"", "\"auction\"");
        let tmp = write_config("draftroom_config_bad_type", &text);

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, message } => {
                assert_eq!(field, "draft.draft_type");
                assert!(message.contains("auction"));
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_queue_cap() {
        let text = VALID_TOML.replace("cap = 25", "cap = 0");
        let tmp = write_config("draftroom_config_zero_cap", &text);

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "queue.cap"),
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_timeout() {
        let text = VALID_TOML.replace("timeout_secs = 10", "timeout_secs = 0");
        let tmp = write_config("draftroom_config_zero_timeout", &text);

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "submission.timeout_secs");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_non_websocket_url() {
        let text = VALID_TOML.replace("ws://localhost:8000/draft", "http://localhost:8000");
        let tmp = write_config("draftroom_config_bad_ws", &text);

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "server.ws_url"),
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn linear_draft_type_accepted() {
        let text = VALID_TOML.replace("\"snake\"", "\"linear\"");
        let tmp = write_config("draftroom_config_linear", &text);
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.draft_type, DraftType::Linear);
        let _ = fs::remove_dir_all(&tmp);
    }
}
