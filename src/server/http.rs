// src/server/http.rs

//! Static file serving of the output tree.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use percent_encoding::percent_decode_str;
use tiny_http::{Header, Request, Response, StatusCode};

const RELOAD_CLIENT: &str = include_str!("livereload.js");

/// Resolve a request URL to a file under `root`.
///
/// Directories resolve to their `index.html`. Anything that would leave
/// `root` (`..`, symlinks pointing outside) resolves to nothing.
pub fn resolve_path(url: &str, root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url);
    if clean.split('/').any(|seg| seg == "..") {
        return None;
    }

    let canonical = root.join(&clean).canonicalize().ok()?;
    let root_canonical = root.canonicalize().ok()?;
    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }

    let index = canonical.join("index.html");
    index.is_file().then_some(index)
}

/// Decode, drop query and fragment, trim slashes.
fn normalize_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let decoded = percent_decode_str(path).decode_utf8_lossy();
    decoded.trim_matches('/').to_string()
}

pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// The live-reload client script pointing at `reload_port`.
pub fn reload_script(reload_port: u16) -> String {
    let client = RELOAD_CLIENT.replace("__RELOAD_PORT__", &reload_port.to_string());
    format!("<script>{client}</script>")
}

/// Insert the reload client before the last `</body>`, or append it.
pub fn inject_reload_script(body: &[u8], reload_port: u16) -> Vec<u8> {
    const PATTERN: &[u8] = b"</body>";
    let script = reload_script(reload_port);

    let pos = body
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
        .unwrap_or(body.len());

    let mut result = Vec::with_capacity(body.len() + script.len());
    result.extend_from_slice(&body[..pos]);
    result.extend_from_slice(script.as_bytes());
    result.extend_from_slice(&body[pos..]);
    result
}

fn header(value: &str) -> Option<Header> {
    Header::from_bytes(&b"Content-Type"[..], value.as_bytes()).ok()
}

/// Answer one request from the files under `root`.
pub fn handle_request(request: Request, root: &Path, reload_port: u16) -> Result<()> {
    let Some(path) = resolve_path(request.url(), root) else {
        let mut response = Response::from_string("404 Not Found").with_status_code(StatusCode(404));
        if let Some(h) = header("text/plain; charset=utf-8") {
            response.add_header(h);
        }
        return request.respond(response).context("sending 404 response");
    };

    let mime = content_type(&path);
    let body = fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
    let body = if mime.starts_with("text/html") {
        inject_reload_script(&body, reload_port)
    } else {
        body
    };

    let mut response = Response::from_data(body);
    if let Some(h) = header(mime) {
        response.add_header(h);
    }
    request.respond(response).context("sending response")
}
