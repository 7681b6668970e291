use std::time::SystemTime;

/// Value of the `Server` header on every response.
pub const SERVER_NAME: &str = concat!("plinth/", env!("CARGO_PKG_VERSION"));

/// Protocol version written on the status line unless a caller overrides it.
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// HTTP status codes.
///
/// The named variants are the codes the server produces itself. Anything
/// else a handler wants to send goes through `Other` and is encoded with the
/// reason phrase `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 201 Created
    Created,
    /// 204 No Content
    NoContent,
    /// 400 Bad Request
    BadRequest,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 500 Internal Server Error
    InternalServerError,
    /// Any other numeric code
    Other(u16),
}

impl StatusCode {
    /// Maps a numeric code to its variant; unknown codes become `Other`.
    ///
    /// # Example
    ///
    /// ```
    /// # use plinth::http::response::StatusCode;
    /// assert_eq!(StatusCode::from_u16(404), StatusCode::NotFound);
    /// assert_eq!(StatusCode::from_u16(418), StatusCode::Other(418));
    /// ```
    pub fn from_u16(code: u16) -> Self {
        match code {
            200 => StatusCode::Ok,
            201 => StatusCode::Created,
            204 => StatusCode::NoContent,
            400 => StatusCode::BadRequest,
            403 => StatusCode::Forbidden,
            404 => StatusCode::NotFound,
            405 => StatusCode::MethodNotAllowed,
            500 => StatusCode::InternalServerError,
            other => StatusCode::Other(other),
        }
    }

    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use plinth::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::NoContent => 204,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::InternalServerError => 500,
            StatusCode::Other(code) => *code,
        }
    }

    /// Returns the reason phrase for this status code, `Unknown` for codes
    /// outside the table.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::Other(_) => "Unknown",
        }
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode::from_u16(code)
    }
}

/// Response headers in insertion order.
///
/// Names keep the casing they were inserted with but are matched
/// case-insensitively, so setting `content-length` replaces `Content-Length`
/// in place instead of adding a second line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header, replacing an existing value in its original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.position(&key) {
            Some(idx) => self.entries[idx].1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Sets a header only if it is not present yet.
    pub fn insert_default(&mut self, key: &str, value: impl FnOnce() -> String) {
        if self.position(key).is_none() {
            self.entries.push((key.to_string(), value()));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.position(key).map(|idx| self.entries[idx].1.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(key))
    }
}

/// Represents a complete HTTP response ready to be sent to a client.
///
/// `Content-Length` is kept in sync by [`Response::set_body`]; the only time
/// it differs from `body.len()` is a HEAD response, which announces the size
/// of a body it does not carry.
#[derive(Debug, Clone)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// HTTP headers in wire order
    pub headers: Headers,
    /// Response body as bytes
    pub body: Vec<u8>,
    /// Protocol version for the status line
    pub version: String,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```
/// # use plinth::http::response::{ResponseBuilder, StatusCode};
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body("{}")
///     .build();
/// assert_eq!(response.headers.get("content-length"), Some("2"));
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Headers,
    body: Option<Vec<u8>>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: impl Into<StatusCode>) -> Self {
        Self {
            status: status.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    /// Adds or replaces a header.
    ///
    /// Headers set here win over the defaults (`Server`, `Date`,
    /// `Connection`) added by [`ResponseBuilder::build`].
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Sets the response body. Accepts `&str`, `String`, `&[u8]` or `Vec<u8>`.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Builds the final Response.
    ///
    /// Fills in the default headers that are still missing and, if a body was
    /// given, sets `Content-Length` to its exact length.
    pub fn build(self) -> Response {
        let mut response = Response {
            status: self.status,
            headers: self.headers,
            body: Vec::new(),
            version: HTTP_VERSION.to_string(),
        };
        response.apply_default_headers();

        if let Some(body) = self.body {
            response.set_body(body);
        }

        response
    }
}

impl Response {
    /// Creates an empty response with the default headers.
    pub fn new(status: impl Into<StatusCode>) -> Self {
        ResponseBuilder::new(status).build()
    }

    fn apply_default_headers(&mut self) {
        self.headers.insert_default("Server", || SERVER_NAME.to_string());
        self.headers
            .insert_default("Date", || httpdate::fmt_http_date(SystemTime::now()));
        self.headers.insert_default("Connection", || "close".to_string());
    }

    /// Replaces the body and recomputes `Content-Length`.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) -> &mut Self {
        self.body = body.into();
        self.headers
            .insert("Content-Length", self.body.len().to_string());
        self
    }

    pub fn set_content_type(&mut self, content_type: &str) -> &mut Self {
        self.headers.insert("Content-Type", content_type);
        self
    }

    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(key, value);
        self
    }

    /// A 200 response with the given body and content type.
    pub fn ok(body: impl Into<Vec<u8>>, content_type: &str) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .header("Content-Type", content_type)
            .body(body)
            .build()
    }

    /// A JSON response. `data` must already be serialized.
    pub fn json(data: impl Into<Vec<u8>>, status: impl Into<StatusCode>) -> Self {
        ResponseBuilder::new(status)
            .header("Content-Type", "application/json")
            .body(data)
            .build()
    }

    /// Creates a 404 Not Found response.
    ///
    /// Used both for missing files and for paths that escape the static root,
    /// so the two cannot be told apart.
    pub fn not_found(path: &str) -> Self {
        Self::html_error(
            StatusCode::NotFound,
            &format!("<p>Path: {}</p>", escape_html(path)),
        )
    }

    /// Creates a 400 Bad Request response.
    pub fn bad_request(reason: &str) -> Self {
        Self::html_error(
            StatusCode::BadRequest,
            &format!("<p>{}</p>", escape_html(reason)),
        )
    }

    /// Creates a 403 Forbidden response.
    pub fn forbidden() -> Self {
        Self::html_error(StatusCode::Forbidden, "")
    }

    /// Creates a 405 response naming the rejected method.
    pub fn method_not_allowed(method: &str) -> Self {
        Self::html_error(
            StatusCode::MethodNotAllowed,
            &format!("<p>Method: {}</p>", escape_html(method)),
        )
    }

    /// Creates a 500 Internal Server Error response.
    pub fn internal_error(message: &str) -> Self {
        Self::html_error(
            StatusCode::InternalServerError,
            &format!("<p>{}</p>", escape_html(message)),
        )
    }

    fn html_error(status: StatusCode, detail: &str) -> Self {
        let body = format!(
            "<h1>{} {}</h1>{}",
            status.as_u16(),
            status.reason_phrase(),
            detail
        );
        Self::ok(body, "text/html").with_status(status)
    }

    fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_replace_in_place() {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "text/plain");
        headers.insert("X-One", "1");
        headers.insert("content-type", "text/html");

        let keys: Vec<_> = headers.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Content-Type", "X-One"]);
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/html"));
    }

    #[test]
    fn escapes_markup_in_error_bodies() {
        let resp = Response::not_found("/<script>");
        let body = String::from_utf8(resp.body).unwrap();
        assert!(body.contains("/&lt;script&gt;"));
        assert!(!body.contains("<script>"));
    }
}
