use log::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::timeout;

use crate::client::Client;
use crate::error::ProtocolError;
use crate::error::handlers::log_session_end;
use crate::middleware::logging::{log_command, log_connection};
use crate::protocol::responses::COMMAND_TOO_LONG;
use crate::protocol::{CommandStatus, handle_command, parse_command};
use crate::server::ServerContext;
use crate::transfer::{flush_within, write_all_within};

/// Handles one client connection until QUIT, EOF, an I/O failure,
/// a timeout or server shutdown.
///
/// The read buffer is sized to `buffer_size`, so a single PUT chunk is never
/// larger than one legacy socket read.
pub async fn handle_client(
    stream: TcpStream,
    client_addr: SocketAddr,
    ctx: Arc<ServerContext>,
    shutdown: watch::Receiver<bool>,
) {
    log_connection(&client_addr);

    let (read_half, write_half) = stream.into_split();
    let reader = BufReader::with_capacity(ctx.limits.buffer_size, read_half);

    run_session(reader, write_half, client_addr, &ctx, shutdown).await;

    info!("Client {} disconnected", client_addr);
}

/// The session loop over any buffered reader / writer pair.
///
/// Reads one command line per iteration, dispatches it and writes exactly
/// one response. The writer is shut down on exit.
pub async fn run_session<R, W>(
    mut reader: R,
    mut writer: W,
    client_addr: SocketAddr,
    ctx: &ServerContext,
    mut shutdown: watch::Receiver<bool>,
) where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut client = Client::new(client_addr);
    let limits = ctx.limits;

    while !client.is_closed() {
        if *shutdown.borrow() {
            info!("Server shutting down, closing session with {}", client_addr);
            break;
        }

        let next = tokio::select! {
            _ = shutdown.changed() => {
                info!("Server shutting down, closing session with {}", client_addr);
                break;
            }
            line = read_command_line(&mut reader, limits.buffer_size, limits.idle_timeout) => line,
        };

        let line = match next {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("Connection closed by client {}", client_addr);
                break;
            }
            Err(ProtocolError::CommandTooLong(limit)) => {
                warn!("Client {} sent a command longer than {} bytes", client_addr, limit);
                if let Err(e) = send(&mut writer, COMMAND_TOO_LONG.as_bytes(), limits.io_timeout).await {
                    log_session_end(&client_addr, &e);
                    break;
                }
                continue;
            }
            Err(e) => {
                log_session_end(&client_addr, &e);
                break;
            }
        };

        let command = parse_command(&line);
        log_command(&client_addr, &command);

        let result =
            match handle_command(&mut client, &command, &mut reader, &mut writer, ctx).await {
                Ok(result) => result,
                Err(e) => {
                    log_session_end(&client_addr, &e);
                    break;
                }
            };

        if let Some(msg) = &result.message {
            if let Err(e) = send(&mut writer, msg.as_bytes(), limits.io_timeout).await {
                log_session_end(&client_addr, &e);
                break;
            }
        }

        match result.status {
            CommandStatus::CloseConnection => info!("Client {} requested to quit", client_addr),
            CommandStatus::Failure(reason) => {
                debug!("{} from {} failed: {}", command, client_addr, reason)
            }
            CommandStatus::Success => {}
        }
    }

    let _ = writer.shutdown().await;
}

/// Reads one command line of at most `limit` bytes, newline included.
///
/// Returns `Ok(None)` on EOF. An over-long line is consumed up to its
/// newline and reported as `CommandTooLong`.
async fn read_command_line<R>(
    reader: &mut R,
    limit: usize,
    idle_timeout: Duration,
) -> Result<Option<String>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::with_capacity(limit);
    let n = timeout(
        idle_timeout,
        (&mut *reader).take(limit as u64).read_until(b'\n', &mut line),
    )
    .await
    .map_err(|_| ProtocolError::Timeout(idle_timeout))??;

    if n == 0 {
        return Ok(None);
    }

    if line.last() != Some(&b'\n') && line.len() >= limit {
        discard_line(reader, idle_timeout).await?;
        return Err(ProtocolError::CommandTooLong(limit));
    }

    Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}

/// Skips input up to and including the next newline (or EOF).
async fn discard_line<R>(reader: &mut R, idle_timeout: Duration) -> Result<(), ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let (found, used) = {
            let buf = timeout(idle_timeout, reader.fill_buf())
                .await
                .map_err(|_| ProtocolError::Timeout(idle_timeout))??;
            if buf.is_empty() {
                return Ok(());
            }
            match buf.iter().position(|&b| b == b'\n') {
                Some(i) => (true, i + 1),
                None => (false, buf.len()),
            }
        };

        reader.consume(used);
        if found {
            return Ok(());
        }
    }
}

async fn send<W>(writer: &mut W, bytes: &[u8], io_timeout: Duration) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    write_all_within(writer, bytes, io_timeout).await?;
    flush_within(writer, io_timeout).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{StoreLimits, UserStore};
    use crate::config::ServerConfig;
    use crate::protocol::responses::{AUTH_SUCCESS, GOODBYE, NOT_AUTHENTICATED, USAGE};
    use tempfile::{TempDir, tempdir};
    use tokio::io::{DuplexStream, duplex, split};
    use tokio::task::JoinHandle;

    struct Harness {
        _dir: TempDir,
        client: DuplexStream,
        session: JoinHandle<()>,
        shutdown: watch::Sender<bool>,
    }

    fn harness(idle_timeout: Duration) -> Harness {
        let dir = tempdir().unwrap();
        let config = ServerConfig::with_paths(dir.path().to_string_lossy(), "unused");
        let users = UserStore::parse(
            "alice:secret\n",
            StoreLimits {
                capacity: 100,
                max_field_length: 49,
            },
        );
        let mut ctx = ServerContext::new(&config, users).unwrap();
        ctx.limits.idle_timeout = idle_timeout;

        let (client, server) = duplex(64 * 1024);
        let (read_half, write_half) = split(server);
        let (shutdown, rx) = watch::channel(false);
        let addr: SocketAddr = "127.0.0.1:40000".parse().unwrap();

        let session = tokio::spawn(async move {
            run_session(BufReader::new(read_half), write_half, addr, &ctx, rx).await;
        });

        Harness {
            _dir: dir,
            client,
            session,
            shutdown,
        }
    }

    async fn transcript(h: &mut Harness) -> String {
        let mut out = Vec::new();
        h.client.read_to_end(&mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_quit_says_goodbye_and_closes() {
        let mut h = harness(Duration::from_secs(5));
        h.client.write_all(b"QUIT\n").await.unwrap();

        assert_eq!(transcript(&mut h).await, GOODBYE);
        h.session.await.unwrap();
    }

    #[tokio::test]
    async fn test_one_response_per_command() {
        let mut h = harness(Duration::from_secs(5));
        h.client
            .write_all(b"LIST\nBOGUS\nUSER alice secret\nQUIT\n")
            .await
            .unwrap();

        let expected = format!("{}{}{}{}", NOT_AUTHENTICATED, USAGE, AUTH_SUCCESS, GOODBYE);
        assert_eq!(transcript(&mut h).await, expected);
    }

    #[tokio::test]
    async fn test_overlong_command_is_rejected_not_truncated() {
        let mut h = harness(Duration::from_secs(5));
        let long = format!("USER {}\n", "a".repeat(2000));
        h.client.write_all(long.as_bytes()).await.unwrap();
        h.client.write_all(b"QUIT\n").await.unwrap();

        let expected = format!("{}{}", COMMAND_TOO_LONG, GOODBYE);
        assert_eq!(transcript(&mut h).await, expected);
    }

    #[tokio::test]
    async fn test_client_eof_ends_session() {
        let mut h = harness(Duration::from_secs(5));
        h.client.shutdown().await.unwrap();

        (&mut h.session).await.unwrap();
        assert_eq!(transcript(&mut h).await, "");
    }

    #[tokio::test]
    async fn test_idle_client_is_dropped() {
        let mut h = harness(Duration::from_millis(100));

        tokio::time::timeout(Duration::from_secs(5), &mut h.session)
            .await
            .expect("idle session was not closed")
            .unwrap();
        assert_eq!(transcript(&mut h).await, "");
    }

    #[tokio::test]
    async fn test_shutdown_signal_closes_session() {
        let mut h = harness(Duration::from_secs(60));
        h.shutdown.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), &mut h.session)
            .await
            .expect("session ignored shutdown")
            .unwrap();
        assert_eq!(transcript(&mut h).await, "");
    }
}
