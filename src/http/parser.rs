use crate::http::request::{Method, Request};
use bytes::Bytes;
use std::collections::HashMap;
use thiserror::Error;

/// Blank line between the header section and the body.
pub const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty request")]
    EmptyInput,
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),
}

/// Decodes one request from `buf`.
///
/// The connection layer hands over exactly the bytes it framed, so everything
/// after the blank line is taken as the body. Header bytes that are not valid
/// UTF-8 are replaced rather than rejected.
pub fn parse_http_request(buf: &[u8]) -> Result<Request, ParseError> {
    if buf.is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let raw = Bytes::copy_from_slice(buf);
    let (header_bytes, body) = match find_headers_end(&raw) {
        Some(end) => (raw.slice(..end), raw.slice(end + HEADER_TERMINATOR.len()..)),
        None => (raw.clone(), Bytes::new()),
    };

    let header_text = String::from_utf8_lossy(&header_bytes);
    let mut lines = header_text.split("\r\n");

    // Request line
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split(' ');
    let (method_str, target) = match (parts.next(), parts.next()) {
        (Some(method), Some(target)) => (method, target),
        _ => return Err(ParseError::MalformedRequestLine(request_line.to_string())),
    };
    let version = parts.next().unwrap_or("HTTP/1.1");

    let (path, query) = match target.split_once('?') {
        Some((path, query_string)) => (path, parse_query_string(query_string)),
        None => (target, HashMap::new()),
    };

    // Headers; lines without ": " are skipped
    let mut headers = HashMap::new();
    for line in lines {
        if let Some((key, value)) = line.split_once(": ") {
            headers.insert(key.to_ascii_lowercase(), value.to_string());
        }
    }

    Ok(Request {
        method: Method::parse(method_str),
        path: path.to_string(),
        version: version.to_string(),
        headers,
        body,
        query,
        raw,
    })
}

/// Splits `a=1&b=2` into pairs. Pairs without `=` are dropped, later
/// duplicates win.
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Offset of the blank line that ends the header section.
pub fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_TERMINATOR.len())
        .position(|w| w == HEADER_TERMINATOR)
}

/// Body length declared by the first `Content-Length` line of a header
/// section. Missing or unparseable values count as 0. Lines are split on
/// CRLF exactly like [`parse_http_request`] splits them.
pub fn declared_content_length(header_section: &[u8]) -> usize {
    const NAME: &str = "content-length:";

    String::from_utf8_lossy(header_section)
        .split("\r\n")
        .find(|line| line.get(..NAME.len()).is_some_and(|name| name.eq_ignore_ascii_case(NAME)))
        .and_then(|line| line[NAME.len()..].trim().parse().ok())
        .unwrap_or(0)
}

/// Total number of bytes the request in `buf` occupies once complete, or
/// `None` while the header section is still incomplete. A declared length
/// too large to add up saturates, so the reader waits for close or timeout.
pub fn expected_request_len(buf: &[u8]) -> Option<usize> {
    let end = find_headers_end(buf)?;
    let body_len = declared_content_length(&buf[..end]);
    Some(
        end.saturating_add(HEADER_TERMINATOR.len())
            .saturating_add(body_len),
    )
}
