//! Same-origin CORS proxy: a single `GET /proxy?url=...` passthrough that
//! relays the upstream status, content type, and body verbatim. Browsers
//! cannot fetch the YouTube feed URL directly; this endpoint exists solely
//! to sidestep that.

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::app::Result;

/// Request heads larger than this are rejected outright.
const MAX_REQUEST_HEAD: usize = 8 * 1024;

pub async fn serve(addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("CORS proxy listening on http://{addr}");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .user_agent(concat!("viewdeck/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(crate::app::ViewdeckError::Network)?;

    loop {
        let (stream, peer) = listener.accept().await?;
        let client = client.clone();
        tokio::spawn(async move {
            if let Err(e) = handle(stream, &client).await {
                tracing::debug!("proxy connection from {peer} failed: {e}");
            }
        });
    }
}

/// Serve one connection. Generic over the stream so tests can drive it
/// with an in-memory duplex pipe.
async fn handle<S>(mut stream: S, client: &reqwest::Client) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let head = match read_request_head(&mut stream).await? {
        Some(head) => head,
        None => return Ok(()),
    };

    let response = match route(&head) {
        Route::Proxy(target) => relay(client, &target).await,
        Route::BadRequest(message) => json_error(400, &message),
        Route::MethodNotAllowed => json_error(405, "only GET is supported"),
        Route::NotFound => json_error(404, "not found"),
    };

    stream.write_all(&response).await?;
    stream.flush().await
}

enum Route {
    Proxy(String),
    BadRequest(String),
    MethodNotAllowed,
    NotFound,
}

fn route(head: &str) -> Route {
    let Some((method, target)) = parse_request_line(head) else {
        return Route::BadRequest("malformed request".into());
    };

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    };

    if path != "/proxy" {
        return Route::NotFound;
    }
    if method != "GET" {
        return Route::MethodNotAllowed;
    }

    let Some(raw) = query.and_then(|q| query_param(q, "url")) else {
        return Route::BadRequest("URL parameter is required".into());
    };

    let target = match urlencoding::decode(&raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => return Route::BadRequest("url parameter is not valid UTF-8".into()),
    };

    match url::Url::parse(&target) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Route::Proxy(target),
        _ => Route::BadRequest("url parameter must be an absolute http(s) URL".into()),
    }
}

/// Forward the request upstream and relay status, content type, and body
/// verbatim. Transport failures map to a 502 with a JSON body.
async fn relay(client: &reqwest::Client, target: &str) -> Vec<u8> {
    let response = match client.get(target).send().await {
        Ok(response) => response,
        Err(e) => {
            return json_body(
                502,
                &serde_json::json!({
                    "error": "Failed to fetch the requested URL",
                    "details": e.to_string(),
                }),
            );
        }
    };

    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/xml")
        .to_string();

    let body = match response.bytes().await {
        Ok(body) => body.to_vec(),
        Err(e) => {
            return json_body(
                502,
                &serde_json::json!({
                    "error": "Failed to read the upstream response",
                    "details": e.to_string(),
                }),
            );
        }
    };

    build_response(status.as_u16(), status.canonical_reason(), &content_type, &body)
}

async fn read_request_head<S>(stream: &mut S) -> std::io::Result<Option<String>>
where
    S: AsyncRead + Unpin,
{
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];

    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        head.extend_from_slice(&buf[..n]);
        if head.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
        if head.len() > MAX_REQUEST_HEAD {
            return Ok(None);
        }
    }

    Ok(Some(String::from_utf8_lossy(&head).into_owned()))
}

fn parse_request_line(head: &str) -> Option<(&str, &str)> {
    let line = head.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    Some((method, target))
}

/// First value for `name` in a raw query string, percent-encoding intact.
fn query_param(query: &str, name: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (key == name).then(|| value.to_string())
    })
}

fn json_error(status: u16, message: &str) -> Vec<u8> {
    json_body(status, &serde_json::json!({ "error": message }))
}

fn json_body(status: u16, body: &serde_json::Value) -> Vec<u8> {
    let body = body.to_string();
    build_response(status, reason(status), "application/json", body.as_bytes())
}

fn build_response(
    status: u16,
    reason: Option<&str>,
    content_type: &str,
    body: &[u8],
) -> Vec<u8> {
    let mut out = format!(
        "HTTP/1.1 {status} {}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nAccess-Control-Allow-Origin: *\r\nConnection: close\r\n\r\n",
        reason.unwrap_or(""),
        body.len(),
    )
    .into_bytes();
    out.extend_from_slice(body);
    out
}

fn reason(status: u16) -> Option<&'static str> {
    match status {
        200 => Some("OK"),
        400 => Some("Bad Request"),
        404 => Some("Not Found"),
        405 => Some("Method Not Allowed"),
        502 => Some("Bad Gateway"),
        _ => None,
    }
}
