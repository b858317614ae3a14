#![warn(clippy::pedantic)]

pub mod chunked;
pub mod error;
pub mod pump;
pub mod source;

pub use chunked::ChunkedSource;
pub use error::SourceError;
pub use pump::{DEFAULT_CHUNK_SIZE, pump};
pub use source::{ByteSource, ReadableListener};
