use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};

use bytes::{Bytes, BytesMut};

use crate::error::SourceError;
use crate::source::{ByteSource, ReadableListener};

/// In-memory byte channel fed in arbitrarily sized chunks.
///
/// `ChunkedSource` is a cheaply cloneable handle: every clone refers to the
/// same buffer, so the producer keeps one handle and hands another to the
/// reader. Chunks are stored as received (no copy on `push`) and are only
/// split or concatenated when a read crosses a chunk boundary.
///
/// ```text
///   push(b"he") push(b"llo\n") end()
///        │            │          │
///        ▼            ▼          ▼
///   [ "he" | "llo\n" ]  len=6   ended=true
///        │
///        └─ read(3) → "hel"   leaves [ "lo\n" ]  len=3
/// ```
///
/// Listeners are notified after every non-empty `push` and once on `end`,
/// always with the internal lock released. A zero-length event therefore
/// only ever means the source has ended and is drained. Listeners that
/// return `false` are pruned on the next notification.
///
/// # Example
///
/// ```rust
/// use bytetok_source::{ByteSource, ChunkedSource};
///
/// let source = ChunkedSource::new();
/// source.push(&b"ab"[..]).unwrap();
/// source.push(&b"c"[..]).unwrap();
/// assert_eq!(source.readable_len(), 3);
/// assert_eq!(&source.read(2)[..], b"ab");
/// source.end();
/// assert!(source.is_ended());
/// ```
#[derive(Clone, Default)]
pub struct ChunkedSource {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    buffer: Mutex<Buffer>,
    listeners: RwLock<Vec<ReadableListener>>,
}

#[derive(Default)]
struct Buffer {
    chunks: VecDeque<Bytes>,
    len: usize,
    ended: bool,
}

impl ChunkedSource {
    /// Create an empty, open source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source that already holds `chunks` and has ended.
    ///
    /// Handy for tests and for replaying a captured stream.
    #[must_use]
    pub fn from_chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let source = Self::new();
        {
            let mut buffer = source.lock();
            for chunk in chunks {
                let chunk = chunk.into();
                buffer.len += chunk.len();
                if !chunk.is_empty() {
                    buffer.chunks.push_back(chunk);
                }
            }
            buffer.ended = true;
        }
        source
    }

    /// Append a chunk and notify listeners.
    ///
    /// Empty chunks are accepted but do not notify: a zero-length event
    /// would read as end-of-data to a waiting reader.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Ended`] if [`end`](Self::end) was already
    /// called.
    pub fn push(&self, chunk: impl Into<Bytes>) -> Result<(), SourceError> {
        let chunk = chunk.into();
        let len = {
            let mut buffer = self.lock();
            if buffer.ended {
                return Err(SourceError::Ended);
            }
            if chunk.is_empty() {
                return Ok(());
            }
            buffer.len += chunk.len();
            buffer.chunks.push_back(chunk);
            buffer.len
        };
        tracing::trace!(buffered = len, "chunk pushed");
        self.notify(len);
        Ok(())
    }

    /// Signal end-of-data and notify listeners.
    ///
    /// Buffered bytes stay readable. Calling `end` twice is a no-op.
    pub fn end(&self) {
        let len = {
            let mut buffer = self.lock();
            if buffer.ended {
                return;
            }
            buffer.ended = true;
            buffer.len
        };
        tracing::trace!(buffered = len, "source ended");
        self.notify(len);
    }

    fn notify(&self, len: usize) {
        let listeners = self
            .inner
            .listeners
            .read()
            .expect("listener lock poisoned")
            .clone();
        let dead: Vec<ReadableListener> = listeners
            .into_iter()
            .filter(|listener| !listener(len))
            .collect();
        if dead.is_empty() {
            return;
        }

        let mut listeners = self.inner.listeners.write().expect("listener lock poisoned");
        listeners.retain(|listener| !dead.iter().any(|d| Arc::ptr_eq(listener, d)));
        tracing::trace!(pruned = dead.len(), remaining = listeners.len(), "listeners pruned");
    }

    /// Number of listeners currently subscribed.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().expect("listener lock poisoned").len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Buffer> {
        self.inner.buffer.lock().expect("source buffer lock poisoned")
    }
}

impl ByteSource for ChunkedSource {
    fn readable_len(&self) -> usize {
        self.lock().len
    }

    fn read(&self, n: usize) -> Bytes {
        let mut buffer = self.lock();
        let n = n.min(buffer.len);
        if n == 0 {
            return Bytes::new();
        }
        buffer.len -= n;

        // Fast path: the request fits inside the front chunk.
        if let Some(front) = buffer.chunks.front_mut()
            && front.len() >= n
        {
            let out = front.split_to(n);
            if front.is_empty() {
                buffer.chunks.pop_front();
            }
            return out;
        }

        let mut out = BytesMut::with_capacity(n);
        while out.len() < n {
            let Some(mut chunk) = buffer.chunks.pop_front() else {
                break;
            };
            let want = n - out.len();
            if chunk.len() > want {
                out.extend_from_slice(&chunk.split_to(want));
                buffer.chunks.push_front(chunk);
            } else {
                out.extend_from_slice(&chunk);
            }
        }
        out.freeze()
    }

    fn subscribe(&self, listener: ReadableListener) {
        self.inner
            .listeners
            .write()
            .expect("listener lock poisoned")
            .push(listener);
    }

    fn is_ended(&self) -> bool {
        self.lock().ended
    }
}
