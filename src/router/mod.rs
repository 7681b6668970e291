//! Request routing
//!
//! Exact-path routes registered before the server starts, with static files
//! as the fallback for everything else. Once built, the router is shared
//! read-only between connections behind an `Arc`.

pub mod static_files;

pub use static_files::{StaticFileError, StaticFiles};

use crate::http::request::{Method, Request};
use crate::http::response::{Response, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;

/// A route handler. Handlers must not block for long; they run on the
/// connection's task.
pub type Handler = Arc<dyn Fn(&Request) -> Response + Send + Sync>;

pub struct Router {
    routes: HashMap<String, HashMap<Method, Handler>>,
    static_files: StaticFiles,
}

impl Router {
    pub fn new(static_files: StaticFiles) -> Self {
        Self {
            routes: HashMap::new(),
            static_files,
        }
    }

    /// Registers `handler` for `path` under each of `methods`. A later
    /// registration for the same path and method replaces the earlier one.
    pub fn route<F>(&mut self, path: &str, methods: &[Method], handler: F) -> &mut Self
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(handler);
        let by_method = self.routes.entry(path.to_string()).or_default();
        for method in methods {
            by_method.insert(method.clone(), Arc::clone(&handler));
            tracing::info!(method = %method, path, "Registered route");
        }
        self
    }

    /// Produces the response for `request`. Every failure is turned into an
    /// error response here; nothing propagates.
    pub async fn dispatch(&self, request: &Request) -> Response {
        if !request.method.is_supported() {
            tracing::warn!(method = %request.method, "Unsupported method");
            return Response::method_not_allowed(request.method.as_str());
        }

        if let Some(by_method) = self.routes.get(&request.path) {
            return match by_method.get(&request.method) {
                Some(handler) => handler(request),
                None => Response::method_not_allowed(request.method.as_str()),
            };
        }

        self.serve_static(request).await
    }

    async fn serve_static(&self, request: &Request) -> Response {
        let head_only = match request.method {
            Method::GET => false,
            Method::HEAD => true,
            _ => return Response::method_not_allowed(request.method.as_str()),
        };

        match self.static_files.serve(&request.path, head_only).await {
            Ok(response) => response,
            Err(e) => {
                match &e {
                    StaticFileError::PathEscapesRoot => {
                        tracing::warn!(path = %request.path, "Path traversal attempt blocked")
                    }
                    StaticFileError::NotFound => {
                        tracing::debug!(path = %request.path, "File not found")
                    }
                    _ => tracing::error!(path = %request.path, error = %e, "Error reading file"),
                }
                static_error_response(&e, &request.path)
            }
        }
    }
}

/// The client-facing response for a static file failure. Escaping the root
/// and a missing file produce the same response.
fn static_error_response(err: &StaticFileError, path: &str) -> Response {
    match err.status() {
        StatusCode::NotFound => Response::not_found(path),
        StatusCode::Forbidden => Response::forbidden(),
        _ => Response::internal_error("Internal Server Error"),
    }
}
