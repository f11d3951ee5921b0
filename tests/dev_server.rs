// tests/dev_server.rs

use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::Path;
use std::time::{Duration, Instant};

use assetdag::config::ServerSection;
use assetdag::server::http::{content_type, inject_reload_script, resolve_path};
use assetdag::server::{DevServer, ReloadHub, ReloadMessage};
use assetdag::types::NotifyKind;

fn test_server_section() -> ServerSection {
    ServerSection {
        root: "public".into(),
        host: "127.0.0.1".to_string(),
        port: 0,
        reload_port: 0,
        enabled: true,
    }
}

fn http_get(addr: std::net::SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    write!(
        stream,
        "GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
    )
    .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    response
}

fn wait_for(mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "condition not met in time");
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn messages_serialise_with_a_type_tag() {
    assert_eq!(ReloadMessage::Reload.to_json(), r#"{"type":"reload"}"#);
    assert_eq!(
        ReloadMessage::from(NotifyKind::Inject).to_json(),
        r#"{"type":"inject"}"#
    );
}

#[test]
fn reload_script_goes_before_the_last_body_tag() {
    let out = inject_reload_script(b"<html><body><p>x</p></body></html>", 4242);
    let out = String::from_utf8(out).unwrap();

    let script_at = out.find("<script>").unwrap();
    assert!(script_at < out.find("</body>").unwrap());
    assert!(out.contains("var port = 4242;"));
    assert!(out.starts_with("<html><body><p>x</p>"));
}

#[test]
fn reload_script_is_appended_without_body() {
    let out = String::from_utf8(inject_reload_script(b"<p>fragment</p>", 1)).unwrap();
    assert!(out.starts_with("<p>fragment</p><script>"));
    assert!(out.ends_with("</script>"));
}

#[test]
fn paths_resolve_inside_the_root_only() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("css")).unwrap();
    std::fs::write(root.join("index.html"), "<p>home</p>").unwrap();
    std::fs::write(root.join("css/main min.css"), "a{}").unwrap();

    let canonical = root.canonicalize().unwrap();
    assert_eq!(resolve_path("/", root), Some(canonical.join("index.html")));
    assert_eq!(
        resolve_path("/index.html?v=3#top", root),
        Some(canonical.join("index.html"))
    );
    assert_eq!(
        resolve_path("/css/main%20min.css", root),
        Some(canonical.join("css/main min.css"))
    );
    assert_eq!(resolve_path("/../outside.txt", root), None);
    assert_eq!(resolve_path("/missing.html", root), None);
    assert_eq!(resolve_path("/css/", root), None);
}

#[test]
fn content_types_follow_the_extension() {
    assert_eq!(content_type(Path::new("a.html")), "text/html; charset=utf-8");
    assert_eq!(content_type(Path::new("main.min.css")), "text/css; charset=utf-8");
    assert_eq!(content_type(Path::new("main.min.js.map")), "application/json");
    assert_eq!(content_type(Path::new("logo.PNG")), "image/png");
    assert_eq!(content_type(Path::new("blob")), "application/octet-stream");
}

#[test]
fn notify_without_clients_reaches_nobody() {
    let hub = ReloadHub::new();
    assert_eq!(hub.notify(NotifyKind::Reload), 0);
    assert_eq!(hub.client_count(), 0);
}

#[test]
fn server_serves_output_with_reload_client() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("public/css")).unwrap();
    std::fs::write(
        root.join("public/index.html"),
        "<html><body><h1>Hi</h1></body></html>",
    )
    .unwrap();
    std::fs::write(root.join("public/css/main.min.css"), "a{color:red}").unwrap();

    let mut handle = DevServer::start(&test_server_section(), root, ReloadHub::new()).unwrap();
    assert_ne!(handle.addr().port(), 0);
    assert_ne!(handle.reload_port(), 0);

    let page = http_get(handle.addr(), "/");
    assert!(page.starts_with("HTTP/1.1 200"), "{page}");
    assert!(page.contains("<h1>Hi</h1>"));
    assert!(page.contains(&format!("var port = {};", handle.reload_port())));

    let css = http_get(handle.addr(), "/css/main.min.css");
    assert!(css.contains("text/css"), "{css}");
    assert!(css.ends_with("a{color:red}"), "{css}");
    assert!(!css.contains("<script>"));

    let missing = http_get(handle.addr(), "/nope.html");
    assert!(missing.starts_with("HTTP/1.1 404"), "{missing}");

    handle.stop();
}

#[test]
fn connected_clients_receive_notifications() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("public")).unwrap();

    let hub = ReloadHub::new();
    let handle = DevServer::start(&test_server_section(), dir.path(), hub.clone()).unwrap();

    let url = format!("ws://127.0.0.1:{}/", handle.reload_port());
    let (mut client, _response) = tungstenite::connect(url).unwrap();
    wait_for(|| hub.client_count() == 1);

    assert_eq!(hub.notify(NotifyKind::Inject), 1);
    let msg = client.read().unwrap();
    assert_eq!(msg.to_text().unwrap(), r#"{"type":"inject"}"#);

    assert_eq!(hub.notify(NotifyKind::Reload), 1);
    let msg = client.read().unwrap();
    assert_eq!(msg.to_text().unwrap(), r#"{"type":"reload"}"#);

    drop(handle);
    assert_eq!(hub.client_count(), 0);
}

#[test]
fn silent_connection_does_not_block_other_clients_or_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("public")).unwrap();

    let hub = ReloadHub::new();
    let mut handle = DevServer::start(&test_server_section(), dir.path(), hub.clone()).unwrap();
    let port = handle.reload_port();

    // Connects but never sends a handshake.
    let _silent = TcpStream::connect(("127.0.0.1", port)).unwrap();
    std::thread::sleep(Duration::from_millis(100));

    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let url = format!("ws://127.0.0.1:{port}/");
        let _ = tx.send(tungstenite::connect(url).map(|(client, _)| client));
    });
    let mut client = rx
        .recv_timeout(Duration::from_secs(3))
        .expect("handshake finished in time")
        .expect("handshake succeeded");
    wait_for(|| hub.client_count() == 1);

    assert_eq!(hub.notify(NotifyKind::Reload), 1);
    assert_eq!(client.read().unwrap().to_text().unwrap(), r#"{"type":"reload"}"#);

    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        handle.stop();
        let _ = tx.send(());
    });
    rx.recv_timeout(Duration::from_secs(3))
        .expect("stop returned in time");
    assert_eq!(hub.client_count(), 0);
}

#[test]
fn client_that_stops_reading_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("public")).unwrap();

    let hub = ReloadHub::new();
    let handle = DevServer::start(&test_server_section(), dir.path(), hub.clone()).unwrap();

    let url = format!("ws://127.0.0.1:{}/", handle.reload_port());
    let (_stalled, _response) = tungstenite::connect(url).unwrap();
    wait_for(|| hub.client_count() == 1);

    // Fill the socket buffers until a send times out.
    let deadline = Instant::now() + Duration::from_secs(30);
    loop {
        let started = Instant::now();
        let delivered = hub.notify(NotifyKind::Inject);
        assert!(
            started.elapsed() < Duration::from_secs(2),
            "a single notify blocked for {:?}",
            started.elapsed()
        );
        if delivered == 0 {
            break;
        }
        assert!(Instant::now() < deadline, "stalled client was never dropped");
    }
    assert_eq!(hub.client_count(), 0);
}

#[tokio::test]
async fn background_notify_does_not_block_the_runtime() {
    let hub = ReloadHub::new();
    hub.notify_in_background(NotifyKind::Reload);
    hub.notify_in_background(NotifyKind::Inject);
    assert_eq!(hub.client_count(), 0);
}
