//! Streaming gzip decompression bridge.
//!
//! Decompression runs on the blocking pool, pushing chunks through a bounded
//! channel so the full decompressed payload is never resident in memory. A
//! producer-side error is delivered in-band as a terminal chunk and surfaces
//! to the consumer as a read error. Dropping the reader disconnects the
//! channel, which terminates the producer on its next send.

use std::io::{self, Read};
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};

use bytes::{Buf, Bytes};
use flate2::read::GzDecoder;

/// Size of one decompressed chunk.
const CHUNK_SIZE: usize = 64 * 1024;

/// Chunks buffered between the producer and the consumer.
const CHANNEL_CAPACITY: usize = 8;

/// Consumer half of the decompression bridge, a [`Read`] over the chunk
/// stream produced by the background decompressor.
pub struct DecompressedReader {
    chunks: Receiver<io::Result<Bytes>>,
    current: Bytes,
    done: bool,
}

/// Start decompressing `compressed` in the background and return the reader
/// side of the bridge.
pub fn decompress(compressed: Bytes) -> DecompressedReader {
    let (tx, rx) = sync_channel(CHANNEL_CAPACITY);
    tokio::task::spawn_blocking(move || produce(compressed, tx));
    DecompressedReader {
        chunks: rx,
        current: Bytes::new(),
        done: false,
    }
}

fn produce(compressed: Bytes, chunks: SyncSender<io::Result<Bytes>>) {
    let mut decoder = GzDecoder::new(compressed.as_ref());
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match decoder.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if chunks.send(Ok(Bytes::copy_from_slice(&buf[..n]))).is_err() {
                    // Consumer stopped reading.
                    break;
                }
            }
            Err(e) => {
                let _ = chunks.send(Err(e));
                break;
            }
        }
    }
}

impl Read for DecompressedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.current.is_empty() {
            if self.done {
                return Ok(0);
            }
            match self.chunks.recv() {
                Ok(Ok(chunk)) => self.current = chunk,
                Ok(Err(e)) => {
                    self.done = true;
                    return Err(e);
                }
                // Producer finished and dropped its sender.
                Err(_) => {
                    self.done = true;
                    return Ok(0);
                }
            }
        }

        let n = buf.len().min(self.current.len());
        buf[..n].copy_from_slice(&self.current[..n]);
        self.current.advance(n);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Bytes {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        Bytes::from(encoder.finish().unwrap())
    }

    #[tokio::test]
    async fn test_decompress_roundtrip() {
        let payload = b"GET 2024-11-17T12:00:00Z /index.html\n".repeat(1000);
        let mut reader = decompress(gzip(&payload));

        let result = tokio::task::spawn_blocking(move || {
            let mut out = Vec::new();
            reader.read_to_end(&mut out).map(|_| out)
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(result, payload);
    }

    #[tokio::test]
    async fn test_decompress_empty_payload() {
        let mut reader = decompress(gzip(b""));

        let result = tokio::task::spawn_blocking(move || {
            let mut out = Vec::new();
            reader.read_to_end(&mut out).map(|_| out)
        })
        .await
        .unwrap()
        .unwrap();

        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_truncated_stream_surfaces_error() {
        let full = gzip(&b"some compressible payload ".repeat(5000));
        let truncated = full.slice(..full.len() / 2);
        let mut reader = decompress(truncated);

        let result = tokio::task::spawn_blocking(move || {
            let mut out = Vec::new();
            reader.read_to_end(&mut out)
        })
        .await
        .unwrap();

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_header_surfaces_error() {
        let mut reader = decompress(Bytes::from_static(b"not gzip at all"));

        let result = tokio::task::spawn_blocking(move || {
            let mut out = Vec::new();
            reader.read_to_end(&mut out)
        })
        .await
        .unwrap();

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_dropping_reader_unblocks_producer() {
        // Payload large enough that the producer fills the channel and blocks.
        let payload = vec![b'a'; CHUNK_SIZE * (CHANNEL_CAPACITY + 4)];
        let mut reader = decompress(gzip(&payload));

        let mut first = [0u8; 16];
        tokio::task::spawn_blocking(move || {
            reader.read_exact(&mut first).unwrap();
            drop(reader);
        })
        .await
        .unwrap();

        // The producer's next send fails once the receiver is gone; give the
        // blocking task a moment to observe it and exit.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
}
