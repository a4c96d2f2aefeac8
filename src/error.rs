use thiserror::Error;

/// Catalog fetch or decode failure. Aborts the current cycle before any
/// state is touched; the next cycle retries from scratch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("catalog request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("catalog returned http {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("catalog payload missing {0}")]
    Shape(&'static str),
}

/// Chat delivery failure. Swallowed by callers after dedup state has been
/// recorded: delivery is best-effort, the notified-marker is not.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("telegram request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("telegram api rejected the call: http {0}")]
    HttpStatus(u16),
}

/// Persisted store failure. Reads fall back to empty defaults; writes
/// degrade the cycle that attempted them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("persisted store unavailable: {0}")]
    Sqlx(#[from] sqlx::Error),
}
