use anyhow::Context;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpSocket, lookup_host};
use tracing::info;

use crate::config::ServerConfig;
use crate::http::connection::{Connection, ConnectionSettings};
use crate::router::Router;

/// A bound listening socket plus everything a connection task needs.
pub struct Server {
    listener: TcpListener,
    router: Arc<Router>,
    settings: ConnectionSettings,
}

impl Server {
    /// Binds to the configured address. This is the only failure that is
    /// reported to the caller; a server without its socket cannot run.
    pub async fn bind(cfg: &ServerConfig, router: Router) -> anyhow::Result<Self> {
        let addr = lookup_host(cfg.listen_addr())
            .await
            .with_context(|| format!("Failed to resolve {}", cfg.listen_addr()))?
            .next()
            .with_context(|| format!("No address for {}", cfg.listen_addr()))?;

        let listener = listen(addr, cfg.backlog)
            .with_context(|| format!("Failed to bind to {}", addr))?;

        Ok(Self {
            listener,
            router: Arc::new(router),
            settings: ConnectionSettings {
                chunk_size: cfg.buffer_size.max(1),
                read_timeout: cfg.read_timeout(),
            },
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts until `shutdown` completes or accepting fails for good.
    ///
    /// Each connection gets its own task; in-flight connections keep running
    /// after this returns.
    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("Listening on {}", self.local_addr()?);

        tokio::select! {
            res = self.accept_loop() => res?,
            _ = shutdown => info!("Shutdown signal received"),
        }

        info!("Server stopped");
        Ok(())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(std::future::pending()).await
    }

    async fn accept_loop(&self) -> anyhow::Result<()> {
        loop {
            let (socket, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) if is_transient(&e) => {
                    tracing::warn!(error = %e, "Accept failed");
                    continue;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Accept failed");
                    return Err(e).context("Accept failed");
                }
            };
            tracing::debug!("Accepted connection from {}", peer);

            let conn = Connection::new(socket, peer, Arc::clone(&self.router), self.settings);
            tokio::spawn(conn.run());
        }
    }
}

fn listen(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(backlog)
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted | io::ErrorKind::ConnectionReset | io::ErrorKind::Interrupted
    )
}

/// Binds and serves until ctrl-c.
pub async fn run(cfg: &ServerConfig, router: Router) -> anyhow::Result<()> {
    let server = Server::bind(cfg, router).await?;
    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await
}
