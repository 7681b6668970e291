//! HTTP protocol implementation.
//!
//! One request per connection; every response is sent with
//! `Connection: close` and the socket is closed afterwards.
//!
//! # Architecture
//!
//! - **`connection`**: The per-connection state machine
//! - **`parser`**: Request decoding and framing helpers
//! - **`request`**: Parsed request representation
//! - **`response`**: Response representation with builder and error helpers
//! - **`writer`**: Serializes and writes responses to the client
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Until framed, peer close, or timeout
//!        └──────┬──────┘
//!               ▼
//!        ┌─────────────┐
//!        │  Decoding   │── parse error ──┐
//!        └──────┬──────┘                 │ 400
//!               ▼                        │
//!        ┌─────────────┐                 │
//!        │ Dispatching │ ← Route or file │
//!        └──────┬──────┘                 │
//!               ▼                        │
//!        ┌─────────────┐                 │
//!        │   Writing   │ ◄───────────────┘
//!        └──────┬──────┘
//!               ▼
//!            Closed
//! ```
//!
//! # Example
//!
//! ```no_run
//! use plinth::config::Config;
//! use plinth::router::{Router, StaticFiles};
//! use plinth::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cfg = Config::load();
//!     let router = Router::new(StaticFiles::from_config(&cfg.static_files));
//!     Server::bind(&cfg.server, router).await?.run().await
//! }
//! ```

pub mod request;
pub mod response;
pub mod parser;
pub mod connection;
pub mod writer;
pub mod mime;
