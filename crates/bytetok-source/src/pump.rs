use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::chunked::ChunkedSource;
use crate::error::SourceError;

/// Default upper bound on the size of each chunk pushed by [`pump`].
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

/// Drive an async reader into a [`ChunkedSource`] until EOF.
///
/// Each successful read becomes one chunk of at most `chunk_size` bytes,
/// so the reader on the other side sees the same arbitrary chunking the
/// underlying file, pipe or socket produces. The source is ended when the
/// reader reports EOF, and also when it fails, so a token reader parked on
/// the source wakes up instead of hanging.
///
/// Returns the total number of bytes pumped.
///
/// # Errors
///
/// - [`SourceError::Io`] if the underlying reader fails.
/// - [`SourceError::Ended`] if someone else ended `source` first.
///
/// # Example
///
/// ```rust,no_run
/// use bytetok_source::{ChunkedSource, pump, DEFAULT_CHUNK_SIZE};
///
/// async fn feed_from_stdin(source: ChunkedSource) {
///     let total = pump(tokio::io::stdin(), &source, DEFAULT_CHUNK_SIZE)
///         .await
///         .unwrap();
///     println!("pumped {total} bytes");
/// }
/// ```
pub async fn pump<R>(
    mut reader: R,
    source: &ChunkedSource,
    chunk_size: usize,
) -> Result<u64, SourceError>
where
    R: AsyncRead + Unpin,
{
    let chunk_size = chunk_size.max(1);
    let mut total: u64 = 0;

    let mut buf = vec![0u8; chunk_size];

    let result = loop {
        match reader.read(&mut buf).await {
            Ok(0) => break Ok(total),
            Ok(n) => {
                total += n as u64;
                if let Err(e) = source.push(Bytes::copy_from_slice(&buf[..n])) {
                    break Err(e);
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, pumped = total, "reader failed, ending source");
                break Err(SourceError::Io(e));
            }
        }
    };

    source.end();
    result
}
