use std::env;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display};
use std::path::PathBuf;

use diary_core::{SessionConfig, SessionConfigBuilder};
use diary_drive_store::{DriveConfig, DriveConfigBuilder};
use diary_gemini_model::{GeminiConfig, GeminiConfigBuilder};

const DEFAULT_TTS_LANGUAGE: &str = "pl";

/// Where the diary is archived.
#[derive(Clone, PartialEq, Eq)]
pub enum Storage {
    /// Google Drive, authorized with an OAuth access token.
    Drive {
        /// The bearer token.
        access_token: String,
    },
    /// A local directory.
    LocalDir(PathBuf),
}

impl Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drive { .. } => f
                .debug_struct("Drive")
                .field("access_token", &"<deducted>")
                .finish(),
            Self::LocalDir(dir) => {
                f.debug_tuple("LocalDir").field(dir).finish()
            }
        }
    }
}

/// Settings of the CLI, read from the environment.
///
/// | variable                | meaning                                      |
/// |-------------------------|----------------------------------------------|
/// | `GEMINI_API_KEY`        | required                                     |
/// | `GEMINI_MODEL`          | model name                                   |
/// | `GEMINI_BASE_URL`       | API base URL                                 |
/// | `DIARY_DRIVE_TOKEN`     | archive on Google Drive                      |
/// | `DIARY_DATA_DIR`        | archive in a local directory                 |
/// | `DIARY_HISTORY_FILE`    | name of the conversation file                |
/// | `DIARY_NOTES_FILE`      | name of the notes file                       |
/// | `DIARY_GROUND_IN_NOTES` | `1` or `true` to answer from the notes       |
/// | `DIARY_TTS_DIR`         | directory voiced replies are written to      |
/// | `DIARY_TTS_LANG`        | language of voiced replies, `pl` by default  |
///
/// One of `DIARY_DRIVE_TOKEN` and `DIARY_DATA_DIR` must be set; Drive wins
/// if both are.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    gemini_api_key: String,
    gemini_model: Option<String>,
    gemini_base_url: Option<String>,
    storage: Storage,
    history_file: Option<String>,
    notes_file: Option<String>,
    ground_in_notes: bool,
    tts_dir: Option<PathBuf>,
    tts_language: String,
}

impl Settings {
    /// Reads the settings from the process environment.
    #[inline]
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the settings through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let gemini_api_key = var("GEMINI_API_KEY")
            .ok_or(SettingsError::Missing("GEMINI_API_KEY"))?;
        let storage = match (var("DIARY_DRIVE_TOKEN"), var("DIARY_DATA_DIR")) {
            (Some(access_token), _) => Storage::Drive { access_token },
            (None, Some(dir)) => Storage::LocalDir(dir.into()),
            (None, None) => return Err(SettingsError::NoStorage),
        };
        let ground_in_notes =
            var("DIARY_GROUND_IN_NOTES").is_some_and(|value| {
                value == "1" || value.eq_ignore_ascii_case("true")
            });

        Ok(Self {
            gemini_api_key,
            gemini_model: var("GEMINI_MODEL"),
            gemini_base_url: var("GEMINI_BASE_URL"),
            storage,
            history_file: var("DIARY_HISTORY_FILE"),
            notes_file: var("DIARY_NOTES_FILE"),
            ground_in_notes,
            tts_dir: var("DIARY_TTS_DIR").map(PathBuf::from),
            tts_language: var("DIARY_TTS_LANG")
                .unwrap_or_else(|| DEFAULT_TTS_LANGUAGE.to_owned()),
        })
    }

    /// Returns where the diary is archived.
    #[inline]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Returns the directory voiced replies go to, if voicing is enabled.
    #[inline]
    pub fn tts_dir(&self) -> Option<&PathBuf> {
        self.tts_dir.as_ref()
    }

    /// Returns the language replies are voiced in.
    #[inline]
    pub fn tts_language(&self) -> &str {
        &self.tts_language
    }

    /// Builds the model configuration.
    pub fn gemini_config(&self) -> GeminiConfig {
        let mut builder =
            GeminiConfigBuilder::with_api_key(&self.gemini_api_key);
        if let Some(model) = &self.gemini_model {
            builder = builder.with_model(model);
        }
        if let Some(base_url) = &self.gemini_base_url {
            builder = builder.with_base_url(base_url);
        }
        builder.build()
    }

    /// Builds the Drive configuration, if the archive is on Drive.
    pub fn drive_config(&self) -> Option<DriveConfig> {
        match &self.storage {
            Storage::Drive { access_token } => Some(
                DriveConfigBuilder::with_access_token(access_token).build(),
            ),
            Storage::LocalDir(_) => None,
        }
    }

    /// Builds the session configuration around a system prompt.
    pub fn session_config<S: Into<String>>(
        &self,
        system_prompt: S,
    ) -> SessionConfig {
        let mut builder = SessionConfigBuilder::new()
            .with_system_prompt(system_prompt)
            .ground_in_notes(self.ground_in_notes);
        if let Some(name) = &self.history_file {
            builder = builder.with_history_file_name(name);
        }
        if let Some(name) = &self.notes_file {
            builder = builder.with_notes_file_name(name);
        }
        builder.build()
    }
}

impl Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("gemini_api_key", &"<deducted>")
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("storage", &self.storage)
            .field("history_file", &self.history_file)
            .field("notes_file", &self.notes_file)
            .field("ground_in_notes", &self.ground_in_notes)
            .field("tts_dir", &self.tts_dir)
            .field("tts_language", &self.tts_language)
            .finish()
    }
}

/// The error type returned when the settings are incomplete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettingsError {
    /// A required variable is not set.
    Missing(&'static str),
    /// Neither `DIARY_DRIVE_TOKEN` nor `DIARY_DATA_DIR` is set.
    NoStorage,
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(key) => {
                write!(f, "{key} environment variable is not set")
            }
            Self::NoStorage => f.write_str(
                "either DIARY_DRIVE_TOKEN or DIARY_DATA_DIR must be set",
            ),
        }
    }
}

impl StdError for SettingsError {}
