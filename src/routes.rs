//! Small JSON endpoints registered by the binary.

use crate::http::request::{Method, Request};
use crate::http::response::{Response, SERVER_NAME, StatusCode};
use crate::router::Router;
use serde_json::json;

pub fn register_demo_routes(router: &mut Router) {
    router
        .route("/api/status", &[Method::GET], status)
        .route("/api/echo", &[Method::POST], echo)
        .route("/api/headers", &[Method::GET], headers);
}

fn status(_req: &Request) -> Response {
    let data = json!({ "status": "ok", "server": SERVER_NAME });
    Response::json(data.to_string(), StatusCode::Ok)
}

fn echo(req: &Request) -> Response {
    let data = json!({
        "method": req.method.as_str(),
        "path": req.path,
        "headers": req.headers,
        "body": String::from_utf8_lossy(&req.body),
        "query": req.query,
    });
    Response::json(data.to_string(), StatusCode::Ok)
}

fn headers(req: &Request) -> Response {
    match serde_json::to_string_pretty(&req.headers) {
        Ok(body) => Response::json(body, StatusCode::Ok),
        Err(e) => Response::internal_error(&e.to_string()),
    }
}
