use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::PreferencesError;

/// Key the language is stored under.
pub const LANGUAGE_KEY: &str = "eventease-language";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
    Fr,
    De,
}

impl Language {
    pub const ALL: [Language; 4] = [Self::En, Self::Es, Self::Fr, Self::De];

    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
            Self::Fr => "fr",
            Self::De => "de",
        }
    }

    /// Native name, as shown in the language picker.
    pub fn name(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Es => "Español",
            Self::Fr => "Français",
            Self::De => "Deutsch",
        }
    }

    /// Unknown codes fall back to English.
    pub fn from_code(code: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|l| l.code().eq_ignore_ascii_case(code.trim()))
            .unwrap_or_default()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Client-local preferences persisted as a JSON object in one file.
pub struct Preferences {
    path: PathBuf,
    tx: watch::Sender<Language>,
}

impl Preferences {
    /// Read the stored language. A missing or unreadable file means English.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let language = match read_entries(&path) {
            Ok(entries) => entries
                .get(LANGUAGE_KEY)
                .and_then(Json::as_str)
                .map(Language::from_code)
                .unwrap_or_default(),
            Err(PreferencesError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No preferences at {}", path.display());
                Language::default()
            }
            Err(e) => {
                warn!("Ignoring preferences at {}: {}", path.display(), e);
                Language::default()
            }
        };

        let (tx, _) = watch::channel(language);
        Self { path, tx }
    }

    pub fn language(&self) -> Language {
        *self.tx.borrow()
    }

    /// Persist a new language and notify subscribers. Other keys in the file
    /// are kept.
    pub fn set_language(&self, language: Language) -> Result<(), PreferencesError> {
        let mut entries = match read_entries(&self.path) {
            Ok(entries) => entries,
            Err(PreferencesError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                warn!("Overwriting unreadable preferences at {}: {}", self.path.display(), e);
                Map::new()
            }
        };
        entries.insert(LANGUAGE_KEY.to_string(), Json::from(language.code()));

        let json = serde_json::to_string_pretty(&entries)?;
        std::fs::write(&self.path, json)?;

        info!("Language set to {}", language.code());
        self.tx.send_replace(language);
        Ok(())
    }

    pub fn subscribe(&self) -> watch::Receiver<Language> {
        self.tx.subscribe()
    }
}

fn read_entries(path: &Path) -> Result<Map<String, Json>, PreferencesError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_means_english() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = Preferences::load(dir.path().join("prefs.json"));
        assert_eq!(prefs.language(), Language::En);
    }

    #[test]
    fn language_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        let prefs = Preferences::load(&path);
        let mut rx = prefs.subscribe();
        prefs.set_language(Language::Fr).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), Language::Fr);

        let text = std::fs::read_to_string(&path).unwrap();
        let json: Json = serde_json::from_str(&text).unwrap();
        assert_eq!(json[LANGUAGE_KEY], "fr");

        assert_eq!(Preferences::load(&path).language(), Language::Fr);
    }

    #[test]
    fn unknown_or_corrupt_values_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        std::fs::write(&path, r#"{"eventease-language":"pt","theme":"dark"}"#).unwrap();
        let prefs = Preferences::load(&path);
        assert_eq!(prefs.language(), Language::En);

        prefs.set_language(Language::De).unwrap();
        let json: Json = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["theme"], "dark");

        std::fs::write(&path, "not json").unwrap();
        assert_eq!(Preferences::load(&path).language(), Language::En);
    }

    #[test]
    fn codes_are_case_insensitive() {
        assert_eq!(Language::from_code("ES"), Language::Es);
        assert_eq!(Language::from_code(""), Language::En);
        assert_eq!(Language::De.to_string(), "Deutsch");
    }
}
