#![no_main]

use arbitrary::Arbitrary;
use bytetok_reader::{ReadError, StreamReader};
use bytetok_source::ChunkedSource;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    data: Vec<u8>,
    splits: Vec<u8>,
    delimiter: u8,
}

// Fuzz target: delimited reads must not depend on chunk boundaries.
//
// The same bytes are read once from a source that holds everything up
// front, and once from a source fed chunk by chunk while the reader is
// already running. The second reader has to suspend and resume at every
// fuzzer-chosen split point; both must yield identical tokens.
fuzz_target!(|input: Input| {
    let delimiter = char::from(input.delimiter & 0x7F);

    let whole = ChunkedSource::from_chunks([input.data.clone()]);

    let mut chunks = Vec::new();
    let mut rest = input.data.as_slice();
    for split in &input.splits {
        if rest.is_empty() {
            break;
        }
        let at = usize::from(*split) % (rest.len() + 1);
        chunks.push(rest[..at].to_vec());
        rest = &rest[at..];
    }
    chunks.push(rest.to_vec());

    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let (a, b) = rt.block_on(async {
        let expected = tokens(&whole, delimiter).await;

        let fed = ChunkedSource::new();
        let producer = tokio::spawn(feed(fed.clone(), chunks));
        let actual = tokens(&fed, delimiter).await;
        producer.await.unwrap();

        (expected, actual)
    });
    assert_eq!(a, b);
});

/// Push each chunk after yielding, so the reader drains the buffer and
/// parks on its wait between pushes.
async fn feed(source: ChunkedSource, chunks: Vec<Vec<u8>>) {
    for chunk in chunks {
        tokio::task::yield_now().await;
        source.push(chunk).unwrap();
    }
    tokio::task::yield_now().await;
    source.end();
}

async fn tokens(source: &ChunkedSource, delimiter: char) -> Vec<String> {
    let reader = StreamReader::new(source, delimiter).unwrap();
    let mut out = Vec::new();
    loop {
        match reader.read_string().await {
            Ok(token) => out.push(token),
            Err(ReadError::Eof) => return out,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}
