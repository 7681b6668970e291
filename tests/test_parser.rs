use plinth::http::parser::{ParseError, parse_http_request, parse_query_string};
use plinth::http::request::Method;

#[test]
fn test_parse_simple_get_request() {
    let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let parsed = parse_http_request(req).unwrap();

    assert_eq!(parsed.method, Method::GET);
    assert_eq!(parsed.path, "/");
    assert_eq!(parsed.version, "HTTP/1.1");
    assert_eq!(parsed.headers.get("host").unwrap(), "example.com");
    assert!(parsed.body.is_empty());
}

#[test]
fn test_parse_post_request_with_body() {
    let req = b"POST /api HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\n\r\nhello";
    let parsed = parse_http_request(req).unwrap();

    assert_eq!(parsed.method, Method::POST);
    assert_eq!(parsed.path, "/api");
    assert_eq!(&parsed.body[..], b"hello");
    assert_eq!(parsed.content_length(), 5);
}

#[test]
fn test_parse_header_names_are_lowercased() {
    let req = b"GET /path HTTP/1.1\r\nHost: example.com\r\nUser-Agent: test-client\r\nAccept: */*\r\n\r\n";
    let parsed = parse_http_request(req).unwrap();

    assert_eq!(parsed.headers.get("user-agent").unwrap(), "test-client");
    assert_eq!(parsed.headers.get("accept").unwrap(), "*/*");
    assert!(!parsed.headers.contains_key("User-Agent"));
    assert_eq!(parsed.header("USER-AGENT"), Some("test-client"));
}

#[test]
fn test_parse_duplicate_headers_last_wins() {
    let req = b"GET / HTTP/1.1\r\nX-Tag: first\r\nx-tag: second\r\n\r\n";
    let parsed = parse_http_request(req).unwrap();

    assert_eq!(parsed.header("x-tag"), Some("second"));
}

#[test]
fn test_parse_header_value_kept_verbatim() {
    let req = b"GET / HTTP/1.1\r\nX-Spaced: a: b  \r\n\r\n";
    let parsed = parse_http_request(req).unwrap();

    assert_eq!(parsed.header("x-spaced"), Some("a: b  "));
}

#[test]
fn test_parse_request_with_query_string() {
    let req = b"GET /search?q=rust&page=2&flag HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let parsed = parse_http_request(req).unwrap();

    assert_eq!(parsed.path, "/search");
    assert_eq!(parsed.query("q"), Some("rust"));
    assert_eq!(parsed.query("page"), Some("2"));
    assert_eq!(parsed.query("flag"), None);
    assert_eq!(parsed.query.len(), 2);
}

#[test]
fn test_query_value_split_at_first_equals() {
    let params = parse_query_string("expr=a=b&empty=");
    assert_eq!(params.get("expr").unwrap(), "a=b");
    assert_eq!(params.get("empty").unwrap(), "");
}

#[test]
fn test_parse_without_blank_line_has_empty_body() {
    let req = b"GET / HTTP/1.1\r\nHost: example.com\r\n";
    let parsed = parse_http_request(req).unwrap();

    assert_eq!(parsed.header("host"), Some("example.com"));
    assert!(parsed.body.is_empty());
}

#[test]
fn test_parse_missing_version_defaults() {
    let req = b"GET /index.html\r\n\r\n";
    let parsed = parse_http_request(req).unwrap();

    assert_eq!(parsed.path, "/index.html");
    assert_eq!(parsed.version, "HTTP/1.1");
}

#[test]
fn test_parse_extra_request_line_tokens_ignored() {
    let req = b"GET / HTTP/1.0 trailing junk\r\n\r\n";
    let parsed = parse_http_request(req).unwrap();

    assert_eq!(parsed.version, "HTTP/1.0");
}

#[test]
fn test_parse_empty_input() {
    assert_eq!(parse_http_request(b"").unwrap_err(), ParseError::EmptyInput);
}

#[test]
fn test_parse_malformed_request_line() {
    let result = parse_http_request(b"GARBAGE\r\n\r\n");
    assert!(matches!(result, Err(ParseError::MalformedRequestLine(_))));
}

#[test]
fn test_parse_malformed_header_is_skipped() {
    let req = b"GET / HTTP/1.1\r\nBrokenHeader\r\nNoSpace:value\r\nHost: ok\r\n\r\n";
    let parsed = parse_http_request(req).unwrap();

    assert_eq!(parsed.headers.len(), 1);
    assert_eq!(parsed.header("host"), Some("ok"));
}

#[test]
fn test_parse_method_is_uppercased() {
    let parsed = parse_http_request(b"post /x HTTP/1.1\r\n\r\n").unwrap();
    assert_eq!(parsed.method, Method::POST);

    let parsed = parse_http_request(b"trace /x HTTP/1.1\r\n\r\n").unwrap();
    assert_eq!(parsed.method, Method::Extension("TRACE".to_string()));
    assert!(!parsed.method.is_supported());
}

#[test]
fn test_parse_request_with_binary_body() {
    let req = b"POST /upload HTTP/1.1\r\nContent-Length: 4\r\n\r\n\x00\x01\xff\x03";
    let parsed = parse_http_request(req).unwrap();

    assert_eq!(&parsed.body[..], &[0, 1, 0xff, 3]);
    assert_eq!(&parsed.raw[..], &req[..]);
}

#[test]
fn test_parse_invalid_utf8_in_headers_does_not_fail() {
    let req = b"GET /\xff\xfe HTTP/1.1\r\nX-Bin: \xc3\x28\r\n\r\n";
    let parsed = parse_http_request(req).unwrap();

    assert_eq!(parsed.method, Method::GET);
    assert!(parsed.path.starts_with('/'));
    assert!(parsed.header("x-bin").is_some());
}
