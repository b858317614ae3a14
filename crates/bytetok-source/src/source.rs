use std::sync::Arc;

use bytes::Bytes;

/// Callback invoked by a source whenever it may have become readable.
///
/// The argument is the number of bytes buffered at the moment the event
/// fired. By the time a listener acts on it the count may be stale. A value
/// of `0` is how a source says "nothing left to read": it fires that way
/// once its buffer is drained and it has ended.
///
/// The return value says whether the listener wants further events. A
/// source drops listeners that return `false`.
pub type ReadableListener = Arc<dyn Fn(usize) -> bool + Send + Sync>;

/// The capability set a token reader needs from a byte producer.
///
/// A source owns its buffer exclusively. Readers only query how much is
/// buffered, consume exact counts, and subscribe to readability events.
/// Bytes are appended by whatever producer feeds the source (a socket,
/// a file, a subprocess pipe); that side is not part of this trait.
///
/// ```text
///   producer ──push(chunk)──▶ [ source buffer ] ──read(n)──▶ reader
///                                   │
///                                   └──readable(len)──▶ listener
/// ```
///
/// All methods take `&self`; implementations use interior mutability so
/// that the producer and the reader can share one source.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a producer task and a reader
/// task can live on different workers of a multi-threaded runtime.
pub trait ByteSource: Send + Sync {
    /// Number of bytes currently buffered. Never blocks.
    fn readable_len(&self) -> usize;

    /// Consume up to `n` buffered bytes, returned in arrival order.
    ///
    /// Callers are expected to check [`readable_len`](Self::readable_len)
    /// first. Asking for more than is buffered returns whatever is there,
    /// possibly nothing.
    fn read(&self, n: usize) -> Bytes;

    /// Register a readability listener.
    ///
    /// Listeners must be invoked without holding any lock the listener
    /// could need, so a listener may call back into the source. A listener
    /// that returns `false` is removed; sources must not keep calling it.
    fn subscribe(&self, listener: ReadableListener);

    /// Whether the producer has signalled end-of-data.
    ///
    /// Sources that cannot tell return `false`; readers then infer the
    /// end from a zero-length readability event.
    fn is_ended(&self) -> bool {
        false
    }
}
