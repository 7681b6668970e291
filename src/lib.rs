//! Plinth - a small HTTP/1.1 server
//!
//! One request per connection: exact-path routes, static files as the
//! fallback, `Connection: close` on every response.

pub mod config;
pub mod http;
pub mod router;
pub mod routes;
pub mod server;
