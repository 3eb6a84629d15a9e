use std::io;

/// Errors surfaced by lambda-json-log.
///
/// Almost nothing in this crate returns an error: logging absorbs its own
/// failures. The exceptions are flushing at shutdown, reading the X-Ray
/// configuration and installing the `tracing` subscriber.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to flush log output: {0}")]
    Flush(#[source] io::Error),

    #[error("invalid X-Ray daemon address: {0:?}")]
    InvalidDaemonAddress(String),

    #[error("invalid X-Ray context missing strategy: {0:?}")]
    InvalidContextMissingStrategy(String),

    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}
