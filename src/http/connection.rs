use bytes::BytesMut;
use std::io;
use std::net::SocketAddr;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{Instant, timeout_at};

use crate::http::parser::{expected_request_len, parse_http_request};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::router::Router;

/// Per-connection limits handed down by the listener.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    /// Bytes reserved for each read
    pub chunk_size: usize,
    /// Deadline for receiving the whole request
    pub read_timeout: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            chunk_size: 8192,
            read_timeout: Duration::from_secs(30),
        }
    }
}

pub struct Connection<S> {
    stream: S,
    peer: SocketAddr,
    buffer: BytesMut,
    state: ConnectionState,
    router: Arc<Router>,
    settings: ConnectionSettings,
}

pub enum ConnectionState {
    Reading,
    Decoding,
    Dispatching(Request),
    Writing(ResponseWriter),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: SocketAddr, router: Arc<Router>, settings: ConnectionSettings) -> Self {
        Self {
            stream,
            peer,
            buffer: BytesMut::with_capacity(settings.chunk_size),
            state: ConnectionState::Reading,
            router,
            settings,
        }
    }

    /// Serves exactly one request and closes.
    ///
    /// Transport failures are logged and end the connection; they are not
    /// returned, since there is nobody left to tell.
    pub async fn run(mut self) {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    self.state = match self.read_request().await {
                        Ok(()) => ConnectionState::Decoding,
                        Err(e) => {
                            log_transport_error(self.peer, "read", &e);
                            ConnectionState::Closed
                        }
                    };
                }

                ConnectionState::Decoding => {
                    let decoded = catch_unwind(AssertUnwindSafe(|| parse_http_request(&self.buffer)));
                    self.state = match decoded {
                        Ok(Ok(request)) => {
                            tracing::info!(
                                peer = %self.peer,
                                method = %request.method,
                                path = %request.path,
                                "Request"
                            );
                            ConnectionState::Dispatching(request)
                        }
                        Ok(Err(e)) => {
                            tracing::warn!(peer = %self.peer, error = %e, "Request parsing failed");
                            let response = Response::bad_request("Malformed request");
                            ConnectionState::Writing(ResponseWriter::new(&response))
                        }
                        Err(_) => {
                            tracing::error!(peer = %self.peer, "Unexpected error while decoding");
                            let response = Response::internal_error("Internal Server Error");
                            ConnectionState::Writing(ResponseWriter::new(&response))
                        }
                    };
                }

                ConnectionState::Dispatching(request) => {
                    let response = dispatch(Arc::clone(&self.router), self.peer, request).await;
                    tracing::debug!(
                        peer = %self.peer,
                        status = response.status.as_u16(),
                        "Response"
                    );
                    self.state = ConnectionState::Writing(ResponseWriter::new(&response));
                }

                ConnectionState::Writing(mut writer) => {
                    if let Err(e) = writer.write_to(&mut self.stream).await {
                        log_transport_error(self.peer, "write", &e);
                    }
                    self.state = ConnectionState::Closed;
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        // The stream itself is dropped with `self`.
        let _ = self.stream.shutdown().await;
    }

    /// Reads until the request is framed, the peer closes, or the read
    /// deadline passes. Whatever has arrived by then stays in the buffer for
    /// decoding; a truncated request is not an error at this layer.
    async fn read_request(&mut self) -> io::Result<()> {
        let deadline = Instant::now() + self.settings.read_timeout;
        let mut expected = None;

        loop {
            if expected.is_none() {
                expected = expected_request_len(&self.buffer);
            }
            if let Some(total) = expected {
                if self.buffer.len() >= total {
                    return Ok(());
                }
            }

            self.buffer.reserve(self.settings.chunk_size);
            match timeout_at(deadline, self.stream.read_buf(&mut self.buffer)).await {
                Ok(Ok(0)) => {
                    tracing::trace!(peer = %self.peer, "Peer closed before request completed");
                    return Ok(());
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    tracing::warn!(
                        peer = %self.peer,
                        received = self.buffer.len(),
                        "Connection timed out"
                    );
                    return Ok(());
                }
            }
        }
    }
}

/// Runs the router on its own task so a panicking handler surfaces as a
/// `JoinError` instead of tearing down the connection without a reply.
async fn dispatch(router: Arc<Router>, peer: SocketAddr, request: Request) -> Response {
    let task = tokio::spawn(async move { router.dispatch(&request).await });

    match task.await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(peer = %peer, error = %e, "Unexpected error while dispatching");
            Response::internal_error("Internal Server Error")
        }
    }
}

fn log_transport_error(peer: SocketAddr, during: &str, err: &io::Error) {
    match err.kind() {
        io::ErrorKind::ConnectionReset => {
            tracing::debug!(peer = %peer, during, "Connection reset by client")
        }
        io::ErrorKind::BrokenPipe | io::ErrorKind::WriteZero => {
            tracing::debug!(peer = %peer, during, "Broken pipe")
        }
        io::ErrorKind::TimedOut => {
            tracing::warn!(peer = %peer, during, "Connection timed out")
        }
        _ => tracing::error!(peer = %peer, during, error = %err, "Connection error"),
    }
}
