//! Shared helpers for driving readers over deliberately awkward chunkings.

use bytetok_source::ChunkedSource;

/// Split `data` into chunks of `size` bytes (the last one may be shorter).
#[must_use]
pub fn chunks_of(data: &[u8], size: usize) -> Vec<Vec<u8>> {
    data.chunks(size.max(1)).map(<[u8]>::to_vec).collect()
}

/// Split `data` at the given ascending byte offsets.
#[must_use]
pub fn split_at_points(data: &[u8], points: &[usize]) -> Vec<Vec<u8>> {
    let mut out = Vec::with_capacity(points.len() + 1);
    let mut start = 0;
    for &point in points {
        let point = point.clamp(start, data.len());
        out.push(data[start..point].to_vec());
        start = point;
    }
    out.push(data[start..].to_vec());
    out
}

/// Push `chunks` into `source` one at a time, yielding to the scheduler
/// between pushes so a reader on the same runtime has to suspend and
/// resume across every chunk boundary. Ends the source afterwards.
///
/// # Panics
///
/// Panics if `source` was already ended.
pub async fn trickle(source: ChunkedSource, chunks: Vec<Vec<u8>>) {
    for chunk in chunks {
        tokio::task::yield_now().await;
        source.push(chunk).expect("source ended while trickling");
    }
    tokio::task::yield_now().await;
    source.end();
}
