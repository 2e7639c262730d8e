use std::path::PathBuf;

/// Account the dashboard signs in as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    /// Set to create the account when it does not exist yet.
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub prefs_path: PathBuf,
    pub credentials: Option<Credentials>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let credentials = match (non_empty("EVENTEASE_EMAIL"), non_empty("EVENTEASE_PASSWORD")) {
            (Some(email), Some(password)) => Some(Credentials {
                email,
                password,
                full_name: non_empty("EVENTEASE_FULL_NAME"),
            }),
            _ => None,
        };

        Self {
            db_path: non_empty("EVENTEASE_DB_PATH")
                .unwrap_or_else(|| "eventease.db".into())
                .into(),
            jwt_secret: non_empty("EVENTEASE_JWT_SECRET")
                .unwrap_or_else(|| "dev-secret-change-me".into()),
            prefs_path: non_empty("EVENTEASE_PREFS_PATH")
                .unwrap_or_else(|| "eventease-prefs.json".into())
                .into(),
            credentials,
        }
    }
}
