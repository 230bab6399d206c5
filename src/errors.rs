use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebScoutError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid start URL: {0}")]
    InvalidUrl(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Session {id} is not runnable (status: {status})")]
    SessionNotRunnable { id: String, status: String },

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Session stopped")]
    Cancelled,
}

impl serde::Serialize for WebScoutError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type WebScoutResult<T> = Result<T, WebScoutError>;
