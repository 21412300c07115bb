//! Bandwidth limiting for transfers
//!
//! A `Throttle` paces a running byte count against elapsed time, sleeping
//! whenever the transfer gets ahead of its allowance.

use bytes::{Bytes, BytesMut};
use futures::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::{backend::ByteStream, error::SbxResult};

/// Block size handed to the remote when streaming an upload
pub const UPLOAD_BLOCK_SIZE: usize = 64 * 1024;

/// Throughput ceiling in kilobytes per second; zero means unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateLimit(u64);

impl RateLimit {
    pub fn unlimited() -> Self {
        Self(0)
    }

    pub fn kilobytes_per_sec(kb: u64) -> Self {
        Self(kb)
    }

    pub fn is_unlimited(&self) -> bool {
        self.0 == 0
    }

    pub fn as_kilobytes_per_sec(&self) -> u64 {
        self.0
    }

    pub fn bytes_per_sec(&self) -> u64 {
        self.0.saturating_mul(1024)
    }

    /// Even share of this limit for one of `clients` concurrent clients.
    ///
    /// A finite limit never rounds down to unlimited.
    pub fn share(&self, clients: usize) -> Self {
        if self.is_unlimited() || clients <= 1 {
            return *self;
        }
        Self((self.0 / clients as u64).max(1))
    }
}

/// Paces a transfer to a `RateLimit`
#[derive(Debug)]
pub struct Throttle {
    limit: RateLimit,
    started: Instant,
    transferred: u64,
}

impl Throttle {
    pub fn new(limit: RateLimit) -> Self {
        Self { limit, started: Instant::now(), transferred: 0 }
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    /// Account for `bytes` and wait until the limit allows them.
    pub async fn consume(&mut self, bytes: usize) {
        self.transferred += bytes as u64;
        if self.limit.is_unlimited() {
            return;
        }

        let allowed = Duration::from_secs_f64(self.transferred as f64 / self.limit.bytes_per_sec() as f64);
        let elapsed = self.started.elapsed();
        if allowed > elapsed {
            sleep(allowed - elapsed).await;
        }
    }
}

/// Drain `source` into memory no faster than `limit`.
pub async fn rate_limited_copy(mut source: ByteStream, limit: RateLimit) -> SbxResult<Bytes> {
    let mut throttle = Throttle::new(limit);
    let mut buffer = BytesMut::new();

    while let Some(block) = source.next().await {
        let block = block?;
        throttle.consume(block.len()).await;
        buffer.extend_from_slice(&block);
    }

    Ok(buffer.freeze())
}

/// Stream `content` in fixed-size blocks no faster than `limit`.
pub fn rate_limited_stream(content: Bytes, limit: RateLimit) -> ByteStream {
    let state = (content, Throttle::new(limit));
    Box::pin(stream::unfold(state, |(mut rest, mut throttle)| async move {
        if rest.is_empty() {
            return None;
        }
        let block = rest.split_to(rest.len().min(UPLOAD_BLOCK_SIZE));
        throttle.consume(block.len()).await;
        Some((Ok(block), (rest, throttle)))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SbxError;

    fn blocks(parts: &[&'static [u8]]) -> ByteStream {
        let items: Vec<SbxResult<Bytes>> = parts.iter().map(|p| Ok(Bytes::from_static(*p))).collect();
        Box::pin(stream::iter(items))
    }

    #[test]
    fn test_share_divides_evenly() {
        assert_eq!(RateLimit::kilobytes_per_sec(1000).share(4), RateLimit::kilobytes_per_sec(250));
        assert_eq!(RateLimit::kilobytes_per_sec(1000).share(1), RateLimit::kilobytes_per_sec(1000));
        assert_eq!(RateLimit::kilobytes_per_sec(1000).share(0), RateLimit::kilobytes_per_sec(1000));
    }

    #[test]
    fn test_share_never_becomes_unlimited() {
        assert_eq!(RateLimit::kilobytes_per_sec(3).share(4), RateLimit::kilobytes_per_sec(1));
        assert!(RateLimit::unlimited().share(8).is_unlimited());
    }

    #[tokio::test]
    async fn test_copy_collects_all_blocks() {
        let data = rate_limited_copy(blocks(&[&b"chunk"[..], &b"-"[..], &b"data"[..]]), RateLimit::unlimited())
            .await
            .unwrap();
        assert_eq!(&data[..], b"chunk-data");
    }

    #[tokio::test]
    async fn test_copy_propagates_source_error() {
        let items: Vec<SbxResult<Bytes>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(SbxError::Network("connection reset".into())),
        ];
        let err = rate_limited_copy(Box::pin(stream::iter(items)), RateLimit::unlimited())
            .await
            .unwrap_err();
        assert!(matches!(err, SbxError::Network(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_copy_respects_limit() {
        let payload: &'static [u8] = &[7u8; 1024];
        let started = Instant::now();

        let data = rate_limited_copy(blocks(&[payload, payload, payload, payload]), RateLimit::kilobytes_per_sec(2))
            .await
            .unwrap();

        assert_eq!(data.len(), 4096);
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_splits_and_paces() {
        let content = Bytes::from(vec![1u8; UPLOAD_BLOCK_SIZE * 2 + 10]);
        let started = Instant::now();

        let parts: Vec<Bytes> = rate_limited_stream(content, RateLimit::kilobytes_per_sec(64))
            .map(|b| b.unwrap())
            .collect()
            .await;

        assert_eq!(parts.iter().map(|p| p.len()).collect::<Vec<_>>(), vec![UPLOAD_BLOCK_SIZE, UPLOAD_BLOCK_SIZE, 10]);
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_stream_of_empty_content_is_empty() {
        let parts: Vec<_> = rate_limited_stream(Bytes::new(), RateLimit::kilobytes_per_sec(1)).collect().await;
        assert!(parts.is_empty());
    }
}
