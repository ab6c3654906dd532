use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("cannot open store at {path}: {source}")]
    StorageUnavailable {
        path: String,
        #[source]
        source: tokio_rusqlite::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to fetch {url}: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("invalid url {0}")]
    InvalidUrl(String),

    #[error("scrape task failed: {0}")]
    Task(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("column {0:?} not found in csv header")]
    MissingColumn(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
