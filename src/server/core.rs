use log::{error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Semaphore, watch};
use tokio::time::timeout;

use crate::client::handle_client;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::protocol::responses::TOO_MANY_CONNECTIONS;
use crate::server::context::ServerContext;

/// Triggers a graceful shutdown of a running `Server`.
///
/// The accept loop stops and every session closes at its next command
/// boundary.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.sender.send_replace(true);
    }
}

pub struct Server {
    listener: TcpListener,
    context: Arc<ServerContext>,
    session_slots: Arc<Semaphore>,
    max_clients: usize,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl Server {
    /// Binds the listener. The context (and so the user table) must be fully
    /// built before any connection can be accepted.
    pub async fn bind(config: &ServerConfig, context: ServerContext) -> Result<Self, ServerError> {
        let addr = config.listen_address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;

        info!("Server bound to {}", listener.local_addr()?);
        info!("Server root directory: {}", context.root.display());

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            listener,
            context: Arc::new(context),
            session_slots: Arc::new(Semaphore::new(config.max_clients)),
            max_clients: config.max_clients,
            shutdown_tx: Arc::new(shutdown_tx),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            sender: Arc::clone(&self.shutdown_tx),
        }
    }

    /// Number of sessions currently holding a slot
    pub fn active_sessions(&self) -> usize {
        self.max_clients - self.session_slots.available_permits()
    }

    /// Accepts connections until shutdown is requested.
    pub async fn start(self) {
        let mut shutdown = self.shutdown_tx.subscribe();

        info!(
            "Starting RAX share server on {} (max {} clients)",
            self.local_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "<unknown>".into()),
            self.max_clients
        );

        while !*shutdown.borrow() {
            tokio::select! {
                _ = shutdown.changed() => {}
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => self.dispatch(stream, addr),
                    Err(e) => error!("Error accepting connection: {}", e),
                }
            }
        }

        info!(
            "Shutdown requested; stopped accepting ({} session(s) still closing)",
            self.active_sessions()
        );
    }

    /// Spawns a session task, or turns the client away when every slot is taken.
    fn dispatch(&self, stream: TcpStream, client_addr: SocketAddr) {
        match Arc::clone(&self.session_slots).try_acquire_owned() {
            Ok(permit) => {
                let ctx = Arc::clone(&self.context);
                let shutdown = self.shutdown_tx.subscribe();

                tokio::spawn(async move {
                    handle_client(stream, client_addr, ctx, shutdown).await;
                    drop(permit);
                });

                info!(
                    "Accepted client {} ({}/{} sessions)",
                    client_addr,
                    self.active_sessions(),
                    self.max_clients
                );
            }
            Err(_) => {
                warn!(
                    "Rejecting client {}: {} sessions already active",
                    client_addr, self.max_clients
                );
                let io_timeout = self.context.limits.io_timeout;
                tokio::spawn(reject(stream, io_timeout));
            }
        }
    }
}

async fn reject(mut stream: TcpStream, io_timeout: Duration) {
    let _ = timeout(io_timeout, stream.write_all(TOO_MANY_CONNECTIONS.as_bytes())).await;
    let _ = stream.shutdown().await;
}
