/// Input plumbing shared by all commands.
///
/// Opens FILE (or stdin), spawns a task that pumps it into a
/// [`ChunkedSource`], and builds the [`ReaderConfig`] the command's
/// reader is created with.
///
/// ```text
///   file / stdin ──pump task──▶ ChunkedSource ◀──borrows── StreamReader
/// ```
use anyhow::{Context, Result};
use bytetok_reader::{EofPolicy, ReaderConfig};
use bytetok_source::{ChunkedSource, SourceError, pump};
use tokio::io::AsyncRead;
use tokio::task::JoinHandle;

use crate::InputArgs;

/// A source being fed in the background.
pub struct Input {
    pub source: ChunkedSource,
    producer: JoinHandle<Result<u64, SourceError>>,
}

impl Input {
    /// Open the input named by `args` and start pumping it.
    ///
    /// # Errors
    ///
    /// Returns an error if FILE cannot be opened.
    pub async fn open(args: &InputArgs) -> Result<Self> {
        let reader: Box<dyn AsyncRead + Unpin + Send> = match &args.file {
            Some(path) => Box::new(
                tokio::fs::File::open(path)
                    .await
                    .with_context(|| format!("cannot open {}", path.display()))?,
            ),
            None => Box::new(tokio::io::stdin()),
        };

        Ok(Self::spawn(reader, args.chunk_size))
    }

    /// Start pumping `reader` into a fresh source on a background task.
    pub fn spawn<R>(reader: R, chunk_size: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let source = ChunkedSource::new();
        let feeder = source.clone();
        let producer = tokio::spawn(async move { pump(reader, &feeder, chunk_size).await });
        Self { source, producer }
    }

    /// Wait for the pump task and report how many bytes it moved.
    ///
    /// Only call this once the reader has seen end of input. On an input
    /// that is still open, such as an interactive terminal, it waits for
    /// the user to close it.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the input failed.
    pub async fn finish(self) -> Result<u64> {
        let total = self
            .producer
            .await
            .context("input task panicked")?
            .context("failed to read input")?;
        tracing::debug!(bytes = total, "input exhausted");
        Ok(total)
    }

    /// Stop consuming input.
    ///
    /// A pump that already finished is reported like [`Input::finish`].
    /// One that is still waiting on its input is aborted, and any unread
    /// input is left where it is.
    ///
    /// # Errors
    ///
    /// Returns an error if the finished pump failed to read the input.
    pub async fn close(self) -> Result<()> {
        if self.producer.is_finished() {
            self.finish().await?;
        } else {
            tracing::debug!("input still open, abandoning the rest");
            self.producer.abort();
        }
        Ok(())
    }
}

/// Reader configuration for the given flags.
pub fn reader_config(args: &InputArgs) -> ReaderConfig {
    ReaderConfig {
        delimiter: args.delimiter,
        eof_policy: if args.recheck {
            EofPolicy::Recheck
        } else {
            EofPolicy::Immediate
        },
        max_token_len: None,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytetok_reader::StreamReader;
    use tokio::io::AsyncWriteExt;

    use super::*;

    #[tokio::test]
    async fn close_does_not_wait_for_open_input() {
        let (mut writer, reader) = tokio::io::duplex(64);
        writer.write_all(b"first\nsecond").await.unwrap();

        let input = Input::spawn(reader, 16);
        {
            let reader = StreamReader::new(&input.source, '\n').unwrap();
            assert_eq!(reader.read_string().await.unwrap(), "first");
        }

        // `writer` stays alive, so the pump never sees end of input.
        tokio::time::timeout(Duration::from_secs(5), input.close())
            .await
            .expect("close waited on open input")
            .unwrap();
        drop(writer);
    }

    #[tokio::test]
    async fn close_reports_finished_input() {
        let (mut writer, reader) = tokio::io::duplex(64);
        writer.write_all(b"only\n").await.unwrap();
        drop(writer);

        let input = Input::spawn(reader, 16);
        let reader = StreamReader::new(&input.source, '\n').unwrap();
        assert_eq!(reader.read_string().await.unwrap(), "only");
        assert!(reader.read_string().await.is_err());
        drop(reader);

        assert_eq!(input.finish().await.unwrap(), 5);
    }
}
