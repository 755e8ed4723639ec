use thiserror::Error;

/// The token source could not produce its next token.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("failed to read markup stream: {0}")]
    Read(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid settings: {0}")]
    Config(#[from] config::ConfigError),

    #[error("no source titled '{0}'")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("source store lock poisoned")]
    StorePoisoned,

    #[error("extraction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl Error {
    /// True for failures that happened while retrieving the remote page.
    pub fn is_fetch(&self) -> bool {
        matches!(self, Error::Fetch { .. } | Error::Status { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
