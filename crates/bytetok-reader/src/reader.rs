use std::sync::{Arc, Mutex, Weak};

use bytetok_source::ByteSource;
use tokio::sync::oneshot;

use crate::config::{EofPolicy, ReaderConfig};
use crate::error::ReadError;
use crate::number::{parse_ufloat, parse_uint};

/// Asynchronous token reader over a chunked [`ByteSource`].
///
/// Every read is built from one primitive, [`read_byte`](Self::read_byte),
/// which in turn bottoms out in [`wait_readable`](Self::wait_readable), the
/// only place a read ever suspends. Strings and numbers are terminated by a
/// single delimiter byte; fixed strings are a byte count.
///
/// ```text
///   read_int / read_float
///            │
///       read_string      read_fixed_string(n)
///            │                  │
///            └──── read_byte ───┘
///                      │
///                wait_readable  ◀── readable(len) from the source
/// ```
///
/// The reader borrows the source and owns nothing but its wait slot: at
/// most one pending wait, enforced at runtime. Reads take `&self`, so
/// overlapping reads on one reader are detected rather than prevented and
/// fail with [`ReadError::WaitPending`]. Bytes are consumed one at a time,
/// which keeps each suspension point minimal; this is a path for control
/// and handshake traffic, not bulk data.
///
/// There is no timeout. If the source never produces again, a read waits
/// forever. Wrap reads in `tokio::time::timeout` where that matters, and
/// discard the reader once a wait has been abandoned.
///
/// # Example
///
/// ```rust
/// use bytetok_reader::StreamReader;
/// use bytetok_source::ChunkedSource;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let source = ChunkedSource::new();
/// let reader = StreamReader::new(&source, ' ').unwrap();
///
/// source.push(&b"12 he"[..]).unwrap();
/// source.push(&b"llo ok"[..]).unwrap();
/// source.end();
///
/// assert_eq!(reader.read_int().await.unwrap(), 12);
/// assert_eq!(reader.read_string().await.unwrap(), "hello");
/// assert_eq!(reader.read_fixed_string(2).await.unwrap(), "ok");
/// assert!(reader.read_byte().await.is_err());
/// # }
/// ```
pub struct StreamReader<'a, S: ?Sized> {
    source: &'a S,
    delimiter: u8,
    eof_policy: EofPolicy,
    max_token_len: Option<usize>,
    slot: Arc<WaitSlot>,
}

/// The single pending-wait registration shared with the source listener.
#[derive(Default)]
struct WaitSlot {
    pending: Mutex<Option<oneshot::Sender<bool>>>,
}

impl WaitSlot {
    fn lock(&self) -> std::sync::MutexGuard<'_, Option<oneshot::Sender<bool>>> {
        self.pending.lock().expect("wait slot lock poisoned")
    }

    /// Readability event from the source.
    ///
    /// With no wait registered the event is dropped. Otherwise the slot is
    /// emptied first and the waiter resolved with whether anything is
    /// buffered.
    fn on_readable(&self, buffered: usize) {
        let Some(waiter) = self.lock().take() else {
            return;
        };
        let readable = buffered > 0;
        tracing::trace!(buffered, readable, "resolving pending wait");
        // The waiter may have been abandoned; nothing to resolve then.
        let _ = waiter.send(readable);
    }
}

impl<'a, S: ByteSource + ?Sized> StreamReader<'a, S> {
    /// Bind a reader to `source` with the given delimiter and default
    /// settings otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::Config`] if `delimiter` is not ASCII.
    pub fn new(source: &'a S, delimiter: char) -> Result<Self, ReadError> {
        Self::with_config(
            source,
            &ReaderConfig {
                delimiter,
                ..ReaderConfig::default()
            },
        )
    }

    /// Bind a reader to `source` using `config`.
    ///
    /// Subscribes the reader's readability handler to the source. The
    /// handler holds only a weak reference and unsubscribes itself on the
    /// first event after the reader is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::Config`] if `config` fails validation.
    pub fn with_config(source: &'a S, config: &ReaderConfig) -> Result<Self, ReadError> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(ReadError::Config(errors.join(", ")));
        }

        let slot = Arc::new(WaitSlot::default());
        let weak: Weak<WaitSlot> = Arc::downgrade(&slot);
        source.subscribe(Arc::new(move |buffered: usize| {
            let Some(slot) = weak.upgrade() else {
                return false;
            };
            slot.on_readable(buffered);
            true
        }));

        Ok(Self {
            source,
            delimiter: config.delimiter_byte(),
            eof_policy: config.eof_policy,
            max_token_len: config.max_token_len,
            slot,
        })
    }

    /// The delimiter byte compared by string and number reads.
    #[must_use]
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Wait until the source has at least one byte buffered.
    ///
    /// Resolves `true` straight away when bytes are already buffered,
    /// without registering anything. Resolves `false` when the source has
    /// nothing left: either it reports having ended, or a readability
    /// event arrived while its buffer was empty (see [`EofPolicy`]).
    /// Otherwise registers the one pending wait and suspends until the
    /// source's next readability event.
    ///
    /// A positive event is only a hint. The buffered length it carries was
    /// sampled before the event was delivered, so on resume the source is
    /// queried again and, if it is empty after all, the wait is registered
    /// anew.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::WaitPending`] without suspending if a wait is
    /// already registered.
    pub async fn wait_readable(&self) -> Result<bool, ReadError> {
        loop {
            let waiter = {
                let mut pending = self.slot.lock();
                if pending.is_some() {
                    return Err(ReadError::WaitPending);
                }
                if self.source.readable_len() > 0 {
                    return Ok(true);
                }
                if self.source.is_ended() {
                    return Ok(false);
                }
                let (tx, rx) = oneshot::channel();
                *pending = Some(tx);
                rx
            };

            tracing::trace!("source empty, waiting for readability");
            // A dropped sender means the slot itself went away.
            let readable = waiter.await.unwrap_or(false);

            if readable {
                // Re-checked at the top of the loop.
                continue;
            }
            if self.eof_policy == EofPolicy::Recheck {
                return Ok(self.source.readable_len() > 0);
            }
            return Ok(false);
        }
    }

    /// Read exactly one byte.
    ///
    /// # Errors
    ///
    /// - [`ReadError::Eof`] if the source has no more bytes.
    /// - [`ReadError::WaitPending`] on overlapping reads.
    pub async fn read_byte(&self) -> Result<u8, ReadError> {
        loop {
            if !self.wait_readable().await? {
                tracing::debug!("end of stream while reading a byte");
                return Err(ReadError::Eof);
            }

            if let Some(&byte) = self.source.read(1).first() {
                return Ok(byte);
            }
            // The buffer emptied between the check and the read.
            tracing::trace!("spurious readability, waiting again");
        }
    }

    /// Read up to the next delimiter and decode it as UTF-8.
    ///
    /// The delimiter is consumed and not returned. Invalid UTF-8 is
    /// replaced with U+FFFD rather than rejected, so framing survives a
    /// sender that does not produce clean text.
    ///
    /// # Errors
    ///
    /// - [`ReadError::Eof`] if the source ends before a delimiter. The
    ///   partial token is discarded.
    /// - [`ReadError::TokenTooLong`] if `max_token_len` is set and exceeded.
    pub async fn read_string(&self) -> Result<String, ReadError> {
        let mut token = Vec::new();
        loop {
            let byte = self.read_byte().await?;
            if byte == self.delimiter {
                return Ok(decode_lossy(&token));
            }
            if let Some(limit) = self.max_token_len
                && token.len() >= limit
            {
                return Err(ReadError::TokenTooLong { limit });
            }
            token.push(byte);
        }
    }

    /// Read a delimited token and parse it as a non-negative integer.
    ///
    /// See [`parse_uint`](crate::number::parse_uint) for what is accepted.
    ///
    /// # Errors
    ///
    /// - [`ReadError::InvalidNumber`] carrying the raw token.
    /// - Anything [`read_string`](Self::read_string) returns.
    pub async fn read_int(&self) -> Result<u64, ReadError> {
        let raw = self.read_string().await?;
        parse_uint(&raw).ok_or_else(|| invalid_number(raw))
    }

    /// Read a delimited token and parse it as a non-negative float.
    ///
    /// See [`parse_ufloat`](crate::number::parse_ufloat) for what is
    /// accepted.
    ///
    /// # Errors
    ///
    /// - [`ReadError::InvalidNumber`] carrying the raw token.
    /// - Anything [`read_string`](Self::read_string) returns.
    pub async fn read_float(&self) -> Result<f64, ReadError> {
        let raw = self.read_string().await?;
        parse_ufloat(&raw).ok_or_else(|| invalid_number(raw))
    }

    /// Read exactly `length` bytes, no delimiter involved, and decode them
    /// as UTF-8 with the same leniency as [`read_string`](Self::read_string).
    ///
    /// `length == 0` returns an empty string without touching the source.
    ///
    /// # Errors
    ///
    /// [`ReadError::Eof`] if the source ends before `length` bytes arrive.
    pub async fn read_fixed_string(&self, length: usize) -> Result<String, ReadError> {
        let mut block = Vec::with_capacity(length.min(4096));
        for _ in 0..length {
            block.push(self.read_byte().await?);
        }
        Ok(decode_lossy(&block))
    }
}

fn decode_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn invalid_number(raw: String) -> ReadError {
    tracing::debug!(raw = %raw, "rejected numeric token");
    ReadError::InvalidNumber { raw }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use bytetok_source::{ChunkedSource, ReadableListener};

    use super::*;

    /// A source whose readability events are fired by hand, with no
    /// notion of having ended.
    #[derive(Default)]
    struct ManualSource {
        inner: ChunkedSource,
        listeners: Mutex<Vec<ReadableListener>>,
        reads: AtomicUsize,
    }

    impl ManualSource {
        fn fill(&self, chunk: &'static [u8]) {
            self.inner.push(chunk).unwrap();
        }

        fn fire(&self) {
            let len = self.inner.readable_len();
            for listener in self.listeners.lock().unwrap().iter() {
                listener(len);
            }
        }
    }

    impl ByteSource for ManualSource {
        fn readable_len(&self) -> usize {
            self.inner.readable_len()
        }

        fn read(&self, n: usize) -> Bytes {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read(n)
        }

        fn subscribe(&self, listener: ReadableListener) {
            self.listeners.lock().unwrap().push(listener);
        }
    }

    #[tokio::test]
    async fn wait_resolves_immediately_when_buffered() {
        let source = ChunkedSource::from_chunks([&b"x"[..]]);
        let reader = StreamReader::new(&source, '\n').unwrap();
        assert!(reader.wait_readable().await.unwrap());
        // Nothing was consumed or registered.
        assert_eq!(source.readable_len(), 1);
        assert!(reader.wait_readable().await.unwrap());
    }

    #[tokio::test]
    async fn second_wait_while_pending_is_misuse() {
        let source = ManualSource::default();
        let reader = StreamReader::new(&source, '\n').unwrap();

        let first = reader.wait_readable();
        let second = async {
            tokio::task::yield_now().await;
            reader.wait_readable().await
        };
        let then_wake = async {
            let err = second.await.unwrap_err();
            source.fill(b"a");
            source.fire();
            err
        };

        let (first, err) = tokio::join!(first, then_wake);
        assert!(matches!(err, ReadError::WaitPending));
        assert!(err.is_misuse());
        assert!(first.unwrap());
    }

    #[tokio::test]
    async fn notification_without_waiter_is_dropped() {
        let source = ManualSource::default();
        let reader = StreamReader::new(&source, '\n').unwrap();
        source.fire();
        source.fill(b"z");
        assert_eq!(reader.read_byte().await.unwrap(), b'z');
    }

    #[tokio::test]
    async fn zero_length_wake_is_eof() {
        let source = ManualSource::default();
        let reader = StreamReader::new(&source, '\n').unwrap();

        let read = reader.read_byte();
        let wake = async {
            tokio::task::yield_now().await;
            source.fire();
        };
        let (result, ()) = tokio::join!(read, wake);
        assert!(matches!(result, Err(ReadError::Eof)));
    }

    #[tokio::test]
    async fn recheck_policy_survives_racing_push() {
        let source = ManualSource::default();
        let config = ReaderConfig {
            eof_policy: EofPolicy::Recheck,
            ..ReaderConfig::default()
        };
        let reader = StreamReader::with_config(&source, &config).unwrap();

        let read = reader.read_byte();
        let wake = async {
            tokio::task::yield_now().await;
            // Event fired while empty, bytes land before the reader resumes.
            for listener in source.listeners.lock().unwrap().iter() {
                listener(0);
            }
            source.fill(b"k");
        };
        let (result, ()) = tokio::join!(read, wake);
        assert_eq!(result.unwrap(), b'k');
    }

    #[tokio::test]
    async fn immediate_policy_reports_eof_on_racing_push() {
        let source = ManualSource::default();
        let reader = StreamReader::new(&source, '\n').unwrap();

        let read = reader.read_byte();
        let wake = async {
            tokio::task::yield_now().await;
            for listener in source.listeners.lock().unwrap().iter() {
                listener(0);
            }
            source.fill(b"k");
        };
        let (result, ()) = tokio::join!(read, wake);
        assert!(matches!(result, Err(ReadError::Eof)));
        // The byte is still there for whoever reads next.
        assert_eq!(source.readable_len(), 1);
    }

    #[tokio::test]
    async fn stale_positive_wake_waits_again() {
        let source = ManualSource::default();
        let reader = StreamReader::new(&source, '\n').unwrap();

        let read = reader.read_byte();
        let wake = async {
            tokio::task::yield_now().await;
            // An event whose count was sampled before the buffer drained.
            for listener in source.listeners.lock().unwrap().iter() {
                listener(1);
            }
            tokio::task::yield_now().await;
            source.fill(b"k");
            source.fire();
        };
        let (result, ()) = tokio::join!(read, wake);
        assert_eq!(result.unwrap(), b'k');
        // The stale event never led to a read of an empty buffer.
        assert_eq!(source.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_readers_unsubscribe() {
        let source = ChunkedSource::new();
        for _ in 0..8 {
            let _reader = StreamReader::new(&source, '\n').unwrap();
        }
        assert_eq!(source.listener_count(), 8);

        let reader = StreamReader::new(&source, '\n').unwrap();
        source.push(&b"x"[..]).unwrap();
        assert_eq!(source.listener_count(), 1);
        drop(reader);
    }

    #[tokio::test]
    async fn ended_source_fails_without_waiting() {
        let source = ChunkedSource::new();
        source.end();
        let reader = StreamReader::new(&source, '\n').unwrap();
        assert!(!reader.wait_readable().await.unwrap());
        assert!(matches!(reader.read_byte().await, Err(ReadError::Eof)));
    }

    #[tokio::test]
    async fn string_excludes_delimiter() {
        let source = ChunkedSource::from_chunks([&b"alpha;beta;"[..]]);
        let reader = StreamReader::new(&source, ';').unwrap();
        assert_eq!(reader.read_string().await.unwrap(), "alpha");
        assert_eq!(reader.read_string().await.unwrap(), "beta");
        assert_eq!(source.readable_len(), 0);
    }

    #[tokio::test]
    async fn empty_token_between_delimiters() {
        let source = ChunkedSource::from_chunks([&b",,x,"[..]]);
        let reader = StreamReader::new(&source, ',').unwrap();
        assert_eq!(reader.read_string().await.unwrap(), "");
        assert_eq!(reader.read_string().await.unwrap(), "");
        assert_eq!(reader.read_string().await.unwrap(), "x");
    }

    #[tokio::test]
    async fn string_decodes_invalid_utf8_lossily() {
        let source = ChunkedSource::from_chunks([&b"ok\xFF\xFEgo\n"[..]]);
        let reader = StreamReader::new(&source, '\n').unwrap();
        assert_eq!(reader.read_string().await.unwrap(), "ok\u{FFFD}\u{FFFD}go");
    }

    #[tokio::test]
    async fn string_keeps_multibyte_text_intact() {
        const TEXT: &[u8] = "héllo wörld\n".as_bytes();
        // Split inside the two-byte 'é'.
        let source = ChunkedSource::from_chunks([&TEXT[..2], &TEXT[2..]]);
        let reader = StreamReader::new(&source, '\n').unwrap();
        assert_eq!(reader.read_string().await.unwrap(), "héllo wörld");
    }

    #[tokio::test]
    async fn string_without_delimiter_is_eof() {
        let source = ChunkedSource::from_chunks([&b"dangling"[..]]);
        let reader = StreamReader::new(&source, '\n').unwrap();
        assert!(matches!(reader.read_string().await, Err(ReadError::Eof)));
    }

    #[tokio::test]
    async fn token_limit_applies_to_strings_only() {
        let source = ChunkedSource::from_chunks([&b"abcd\nabcde\nabcdefgh"[..]]);
        let config = ReaderConfig {
            max_token_len: Some(4),
            ..ReaderConfig::default()
        };
        let reader = StreamReader::with_config(&source, &config).unwrap();

        assert_eq!(reader.read_string().await.unwrap(), "abcd");
        assert!(matches!(
            reader.read_string().await,
            Err(ReadError::TokenTooLong { limit: 4 })
        ));
        // The failed read stopped right after the fifth byte.
        assert_eq!(reader.read_byte().await.unwrap(), b'\n');
        assert_eq!(reader.read_fixed_string(8).await.unwrap(), "abcdefgh");
    }

    #[tokio::test]
    async fn int_parsing() {
        let source = ChunkedSource::from_chunks([&b"42 -3 abc  17kb "[..]]);
        let reader = StreamReader::new(&source, ' ').unwrap();

        assert_eq!(reader.read_int().await.unwrap(), 42);
        match reader.read_int().await {
            Err(ReadError::InvalidNumber { raw }) => assert_eq!(raw, "-3"),
            other => panic!("expected InvalidNumber, got {other:?}"),
        }
        match reader.read_int().await {
            Err(ReadError::InvalidNumber { raw }) => assert_eq!(raw, "abc"),
            other => panic!("expected InvalidNumber, got {other:?}"),
        }
        // The empty token between the two spaces.
        assert!(matches!(reader.read_int().await, Err(ReadError::InvalidNumber { .. })));
        assert_eq!(reader.read_int().await.unwrap(), 17);
    }

    #[tokio::test]
    #[allow(clippy::approx_constant, clippy::float_cmp)]
    async fn float_parsing() {
        let source = ChunkedSource::from_chunks([&b"3.14\n-0.1\n2e2\n"[..]]);
        let reader = StreamReader::new(&source, '\n').unwrap();

        assert_eq!(reader.read_float().await.unwrap(), 3.14);
        match reader.read_float().await {
            Err(ReadError::InvalidNumber { raw }) => assert_eq!(raw, "-0.1"),
            other => panic!("expected InvalidNumber, got {other:?}"),
        }
        assert_eq!(reader.read_float().await.unwrap(), 200.0);
    }

    #[tokio::test]
    async fn fixed_string_zero_reads_nothing() {
        let source = ManualSource::default();
        let reader = StreamReader::new(&source, '\n').unwrap();
        assert_eq!(reader.read_fixed_string(0).await.unwrap(), "");
        assert_eq!(source.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fixed_string_ignores_delimiter() {
        let source = ChunkedSource::from_chunks([&b"a\nb\nc"[..]]);
        let reader = StreamReader::new(&source, '\n').unwrap();
        assert_eq!(reader.read_fixed_string(4).await.unwrap(), "a\nb\n");
        assert_eq!(reader.read_byte().await.unwrap(), b'c');
    }

    #[tokio::test]
    async fn fixed_string_short_source_is_eof() {
        let source = ChunkedSource::from_chunks([&b"abc"[..]]);
        let reader = StreamReader::new(&source, '\n').unwrap();
        assert!(matches!(reader.read_fixed_string(5).await, Err(ReadError::Eof)));
    }

    #[tokio::test]
    async fn reads_one_byte_per_source_read() {
        let source = ManualSource::default();
        source.fill(b"abc\n");
        let reader = StreamReader::new(&source, '\n').unwrap();
        reader.read_string().await.unwrap();
        assert_eq!(source.reads.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn non_ascii_delimiter_is_rejected() {
        let source = ChunkedSource::new();
        let result = StreamReader::new(&source, '€');
        assert!(matches!(result, Err(ReadError::Config(_))));
    }

    #[test]
    fn delimiter_byte_is_computed_once() {
        let source = ChunkedSource::new();
        let reader = StreamReader::new(&source, '|').unwrap();
        assert_eq!(reader.delimiter(), b'|');
    }
}
