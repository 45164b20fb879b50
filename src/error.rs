use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("instance not found: {0}")]
    InstanceNotFound(String),
    #[error("invalid scrape config: {0}")]
    InvalidConfig(String),
    #[error("target has no address label: {0}")]
    NoAddress(String),
    #[error("scrape timed out: {0}")]
    Timeout(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("append failed: {0}")]
    Append(String),
    #[error("appender closed")]
    Closed,
    #[error("scrape canceled")]
    Canceled,
    #[error("failed to apply {} scrape config(s): {}", .0.len(), join_errors(.0))]
    Apply(Vec<Error>),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Fetch(err.to_string())
    }
}

fn join_errors(errs: &[Error]) -> String {
    errs.iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
