//! Reusable fixed-capacity chunk buffer

use tokio::io::{AsyncRead, AsyncReadExt};

/// Default chunk size: 5MB (the S3 minimum for every part but the last)
pub const DEFAULT_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Scratch region for one transfer.
///
/// Refilled in place for every chunk; the slice returned by [`fill`] borrows
/// the buffer, so the previous chunk must be fully consumed first.
///
/// [`fill`]: ChunkBuffer::fill
pub struct ChunkBuffer {
    data: Box<[u8]>,
}

impl ChunkBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity.max(1)].into_boxed_slice(),
        }
    }

    /// Read until the buffer is full or the source ends.
    ///
    /// Returns an empty slice at end of stream. Only the final chunk of a
    /// stream can come back shorter than the capacity.
    pub async fn fill<R>(&mut self, reader: &mut R) -> std::io::Result<&[u8]>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut filled = 0;
        while filled < self.data.len() {
            let n = reader.read(&mut self.data[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(&self.data[..filled])
    }
}
