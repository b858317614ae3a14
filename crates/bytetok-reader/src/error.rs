/// Errors returned by [`StreamReader`](crate::StreamReader) reads.
///
/// Every error aborts the read in progress; bytes already accumulated for
/// that token are dropped, and the next read starts from whatever the
/// source holds now.
///
/// ```text
///   ReadError
///   ├── WaitPending    ← a second wait was registered (caller bug)
///   ├── Eof            ← source ended before the read could finish
///   ├── InvalidNumber  ← token is not a non-negative number
///   ├── TokenTooLong   ← delimiter not seen within max_token_len bytes
///   └── Config         ← ReaderConfig failed validation
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// A wait was registered while another one was still outstanding.
    ///
    /// This is a programming error, never a transient condition: either
    /// two reads were driven concurrently against one reader, or a read
    /// future was dropped mid-wait and its registration is still parked
    /// in the slot. Do not retry.
    #[error("wait already pending")]
    WaitPending,

    /// The source ended with no bytes left for the requested read.
    #[error("EOF reached")]
    Eof,

    /// A numeric token did not parse, or parsed to a negative value.
    ///
    /// `raw` is the decoded token exactly as read, without the delimiter.
    #[error("invalid number: {raw:?}")]
    InvalidNumber { raw: String },

    /// A delimited token grew past the configured limit.
    #[error("token exceeds {limit} bytes without a delimiter")]
    TokenTooLong { limit: usize },

    /// The reader configuration was rejected.
    #[error("invalid reader configuration: {0}")]
    Config(String),
}

impl ReadError {
    /// Whether this error indicates a bug in the caller rather than a
    /// property of the input.
    #[must_use]
    pub fn is_misuse(&self) -> bool {
        matches!(self, Self::WaitPending | Self::Config(_))
    }
}
