/// Errors raised by the producer side of a byte source.
///
/// ```text
///   SourceError
///   ├── Ended              ← push() after end() was signalled
///   └── Io(std::io::Error) ← from the AsyncRead driven by pump()
/// ```
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source has already ended")]
    Ended,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
