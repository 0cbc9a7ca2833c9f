//! Module `file_ops`
//!
//! GET and PUT payload streaming over the control connection.
//!
//! Both directions use the sentinel framing: the payload is followed by a
//! read (PUT) or line (GET) that is exactly `.\n`. GET is line-oriented,
//! so binary content is not guaranteed to survive a round trip.

use log::{error, info, warn};
use std::io;
use std::path::Path;
use std::time::Duration;
use tokio::fs::{self, File};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;

use crate::error::TransferError;
use crate::protocol::responses::SENTINEL;

/// Sends the file at `path` to the client, then the sentinel.
///
/// Lines longer than `line_limit` bytes go out in several writes. A read
/// error part-way through stops the body but the sentinel is still sent.
/// Returns the number of payload bytes written.
pub async fn send_file<W>(
    writer: &mut W,
    path: &Path,
    line_limit: usize,
    io_timeout: Duration,
) -> Result<u64, TransferError>
where
    W: AsyncWrite + Unpin,
{
    let file = File::open(path)
        .await
        .map_err(TransferError::SourceUnavailable)?;

    let total_bytes_sent =
        send_lines(BufReader::new(file), writer, path, line_limit, io_timeout).await?;

    info!(
        "File download completed: {} ({} bytes)",
        path.display(),
        total_bytes_sent
    );
    Ok(total_bytes_sent)
}

async fn send_lines<S, W>(
    mut source: S,
    writer: &mut W,
    path: &Path,
    line_limit: usize,
    io_timeout: Duration,
) -> Result<u64, TransferError>
where
    S: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = Vec::with_capacity(line_limit);
    let mut total_bytes_sent = 0u64;

    loop {
        line.clear();
        let n = match (&mut source)
            .take(line_limit as u64)
            .read_until(b'\n', &mut line)
            .await
        {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                error!("Read failure in {}: {}", path.display(), e);
                break;
            }
        };

        write_all_within(writer, &line, io_timeout).await?;
        total_bytes_sent += n as u64;
    }

    write_all_within(writer, SENTINEL, io_timeout).await?;
    flush_within(writer, io_timeout).await?;
    Ok(total_bytes_sent)
}

/// Receives an upload into `path`, truncating any existing file.
///
/// Each read of at most `chunk_size` bytes is one chunk. A chunk that is
/// exactly `.\n` ends the upload and is not written; any other chunk is
/// written verbatim, even if it contains the sentinel among other bytes.
///
/// If the file cannot be written part-way through, the rest of the upload
/// is still consumed up to the sentinel and `DestinationUnavailable` is
/// returned. On any error the partial file is removed.
pub async fn receive_file<R>(
    reader: &mut R,
    path: &Path,
    chunk_size: usize,
    io_timeout: Duration,
) -> Result<u64, TransferError>
where
    R: AsyncRead + Unpin,
{
    let mut file = File::create(path)
        .await
        .map_err(TransferError::DestinationUnavailable)?;

    let outcome = receive_chunks(reader, &mut file, path, chunk_size, io_timeout).await;
    drop(file);

    match outcome {
        Ok(bytes) => {
            info!("File upload completed: {} ({} bytes)", path.display(), bytes);
            Ok(bytes)
        }
        Err(e) => {
            warn!("Upload to {} aborted: {}", path.display(), e);
            if let Err(rm) = fs::remove_file(path).await {
                warn!("Could not remove partial file {}: {}", path.display(), rm);
            }
            Err(e)
        }
    }
}

/// Copies chunks from `reader` into `sink` until a lone sentinel chunk.
///
/// After the first failed write the remaining chunks are discarded, so the
/// client stays in step with the protocol.
async fn receive_chunks<R, F>(
    reader: &mut R,
    sink: &mut F,
    path: &Path,
    chunk_size: usize,
    io_timeout: Duration,
) -> Result<u64, TransferError>
where
    R: AsyncRead + Unpin,
    F: AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; chunk_size];
    let mut total_bytes_received = 0u64;
    let mut write_failure: Option<io::Error> = None;

    let outcome = loop {
        let n = match timeout(io_timeout, reader.read(&mut buffer)).await {
            Ok(Ok(0)) => break Err(TransferError::ConnectionClosed),
            Ok(Ok(n)) => n,
            Ok(Err(e)) => break Err(TransferError::Io(e)),
            Err(_) => break Err(TransferError::Timeout(io_timeout)),
        };

        let chunk = &buffer[..n];
        if chunk == SENTINEL {
            break match write_failure.take() {
                Some(e) => Err(TransferError::DestinationUnavailable(e)),
                None => Ok(total_bytes_received),
            };
        }

        if write_failure.is_some() {
            continue;
        }

        match sink.write_all(chunk).await {
            Ok(()) => total_bytes_received += n as u64,
            Err(e) => {
                error!("Failed to write to {}: {}", path.display(), e);
                write_failure = Some(e);
            }
        }
    };

    match (outcome, sink.flush().await) {
        (Ok(_), Err(e)) => Err(TransferError::DestinationUnavailable(e)),
        (outcome, _) => outcome,
    }
}

/// Writes `bytes`, failing with `Timeout` if the peer stops reading.
pub async fn write_all_within<W>(
    writer: &mut W,
    bytes: &[u8],
    limit: Duration,
) -> Result<(), TransferError>
where
    W: AsyncWrite + Unpin,
{
    match timeout(limit, writer.write_all(bytes)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(TransferError::Io(e)),
        Err(_) => Err(TransferError::Timeout(limit)),
    }
}

/// Flushes `writer` within `limit`.
pub async fn flush_within<W>(writer: &mut W, limit: Duration) -> Result<(), TransferError>
where
    W: AsyncWrite + Unpin,
{
    match timeout(limit, writer.flush()).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(TransferError::Io(e)),
        Err(_) => Err(TransferError::Timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tempfile::tempdir;
    use tokio::io::ReadBuf;

    const LIMIT: Duration = Duration::from_secs(5);

    /// Hands out one scripted chunk per read, then EOF.
    struct ScriptedReader {
        chunks: VecDeque<Vec<u8>>,
    }

    impl ScriptedReader {
        fn new(chunks: &[&[u8]]) -> Self {
            Self {
                chunks: chunks.iter().map(|c| c.to_vec()).collect(),
            }
        }
    }

    impl AsyncRead for ScriptedReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if let Some(chunk) = self.chunks.pop_front() {
                buf.put_slice(&chunk);
            }
            Poll::Ready(Ok(()))
        }
    }

    /// Refuses every write, like a full disk.
    struct FullDisk;

    impl AsyncWrite for FullDisk {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::other("no space left on device")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    /// Yields `body` once, then fails every later read.
    struct FailingSource {
        body: Option<Vec<u8>>,
    }

    impl AsyncRead for FailingSource {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            match self.body.take() {
                Some(body) => {
                    buf.put_slice(&body);
                    Poll::Ready(Ok(()))
                }
                None => Poll::Ready(Err(io::Error::other("input/output error"))),
            }
        }
    }

    #[tokio::test]
    async fn test_receive_stops_at_lone_sentinel_chunk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let mut reader = ScriptedReader::new(&[b"hello\n", b"world\n", b".\n", b"NEXT\n"]);

        let bytes = receive_file(&mut reader, &path, 1024, LIMIT).await.unwrap();

        assert_eq!(bytes, 12);
        assert_eq!(std::fs::read(&path).unwrap(), b"hello\nworld\n");
        // The chunk after the sentinel belongs to the next command.
        assert_eq!(reader.chunks.len(), 1);
    }

    #[tokio::test]
    async fn test_receive_writes_sentinel_sharing_a_chunk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let mut reader = ScriptedReader::new(&[b"data\n.\n", b".\n"]);

        let bytes = receive_file(&mut reader, &path, 1024, LIMIT).await.unwrap();

        assert_eq!(bytes, 7);
        assert_eq!(std::fs::read(&path).unwrap(), b"data\n.\n");
    }

    #[tokio::test]
    async fn test_receive_keeps_sentinel_split_across_reads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let mut reader = ScriptedReader::new(&[b"hi\n", b".", b"\n", b".\n"]);

        let bytes = receive_file(&mut reader, &path, 1024, LIMIT).await.unwrap();

        assert_eq!(bytes, 5);
        assert_eq!(std::fs::read(&path).unwrap(), b"hi\n.\n");
    }

    #[tokio::test]
    async fn test_receive_drains_upload_after_write_failure() {
        let mut reader = ScriptedReader::new(&[b"one\n", b"two\n", b".\n", b"NEXT\n"]);
        let mut sink = FullDisk;

        let err = receive_chunks(&mut reader, &mut sink, Path::new("full.txt"), 1024, LIMIT)
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::DestinationUnavailable(_)));
        assert!(err.is_recoverable());
        // Consumed through the sentinel, nothing further.
        assert_eq!(reader.chunks.len(), 1);
    }

    #[tokio::test]
    async fn test_receive_truncates_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"a much longer previous body\n").unwrap();
        let mut reader = ScriptedReader::new(&[b"new\n", b".\n"]);

        receive_file(&mut reader, &path, 1024, LIMIT).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new\n");
    }

    #[tokio::test]
    async fn test_receive_eof_removes_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.txt");
        let mut reader = ScriptedReader::new(&[b"half of it\n"]);

        let result = receive_file(&mut reader, &path, 1024, LIMIT).await;

        assert!(matches!(result, Err(TransferError::ConnectionClosed)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_receive_stalled_client_times_out() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stalled.txt");
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(b"some data\n").await.unwrap();

        let limit = Duration::from_millis(50);
        let result = receive_file(&mut server, &path, 1024, limit).await;

        assert!(matches!(result, Err(TransferError::Timeout(d)) if d == limit));
        assert!(!path.exists());
        drop(client);
    }

    #[tokio::test]
    async fn test_receive_into_missing_directory_is_recoverable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("notes.txt");
        let mut reader = ScriptedReader::new(&[b".\n"]);

        let err = receive_file(&mut reader, &path, 1024, LIMIT)
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::DestinationUnavailable(_)));
        assert!(err.is_recoverable());
        // Nothing was consumed from the client.
        assert_eq!(reader.chunks.len(), 1);
    }

    #[tokio::test]
    async fn test_send_streams_content_then_sentinel() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"line one\nline two\nno newline").unwrap();
        let mut out: Vec<u8> = Vec::new();

        let bytes = send_file(&mut out, &path, 1024, LIMIT).await.unwrap();

        assert_eq!(bytes, 28);
        assert_eq!(out, b"line one\nline two\nno newline.\n");
    }

    #[tokio::test]
    async fn test_send_splits_lines_longer_than_limit() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wide.txt");
        let body = format!("{}\n", "x".repeat(50));
        std::fs::write(&path, &body).unwrap();
        let mut out: Vec<u8> = Vec::new();

        send_file(&mut out, &path, 16, LIMIT).await.unwrap();

        assert_eq!(out, format!("{}.\n", body).into_bytes());
    }

    #[tokio::test]
    async fn test_send_read_error_still_ends_with_sentinel() {
        let source = BufReader::new(FailingSource {
            body: Some(b"line one\nline two\n".to_vec()),
        });
        let mut out: Vec<u8> = Vec::new();

        let bytes = send_lines(source, &mut out, Path::new("bad.txt"), 1024, LIMIT)
            .await
            .unwrap();

        assert_eq!(bytes, 18);
        assert_eq!(out, b"line one\nline two\n.\n");
    }

    #[tokio::test]
    async fn test_send_missing_file_writes_nothing() {
        let dir = tempdir().unwrap();
        let mut out: Vec<u8> = Vec::new();

        let err = send_file(&mut out, &dir.path().join("nope"), 1024, LIMIT)
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::SourceUnavailable(_)));
        assert!(out.is_empty());
    }
}
