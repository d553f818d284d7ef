use std::error::Error;
use std::net::SocketAddr;
use std::time::Duration;

use futures::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;

use assetdag::server::{CLIENT_PATH, DevServer, ReloadBroadcaster, ReloadScope, ServerHandle, WS_PATH};
use assetdag_test_utils::{init_tracing, wait_until, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

/// Status code and body of a plain HTTP/1.1 GET.
async fn get(addr: SocketAddr, path: &str) -> Result<(u16, String), Box<dyn Error>> {
    let mut stream = TcpStream::connect(addr).await?;
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await?;
    let text = String::from_utf8_lossy(&raw).into_owned();

    let status = text
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .ok_or("malformed status line")?;
    let body = text
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    Ok((status, body))
}

async fn serve_site() -> Result<(tempfile::TempDir, ServerHandle, ReloadBroadcaster), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    std::fs::create_dir_all(dir.path().join("css"))?;
    std::fs::create_dir_all(dir.path().join("docs"))?;
    std::fs::write(
        dir.path().join("index.html"),
        "<html><body><h1>Home</h1></body></html>",
    )?;
    std::fs::write(dir.path().join("docs/index.html"), "<p>docs</p>")?;
    std::fs::write(dir.path().join("css/main.css"), "body{margin:0}")?;

    let broadcaster = ReloadBroadcaster::new();
    let addr: SocketAddr = "127.0.0.1:0".parse()?;
    let handle = DevServer::start(dir.path(), addr, broadcaster.clone()).await?;
    Ok((dir, handle, broadcaster))
}

#[tokio::test]
async fn html_is_served_with_the_reload_client() -> TestResult {
    with_timeout(async {
        init_tracing();

        let (_dir, mut handle, _) = serve_site().await?;
        assert_ne!(handle.addr().port(), 0);
        assert!(handle.is_running());

        let (status, body) = get(handle.addr(), "/").await?;
        assert_eq!(status, 200);
        assert!(body.contains(&format!(
            "<h1>Home</h1><script src=\"{CLIENT_PATH}\"></script></body>"
        )));

        // Directory without trailing slash, document without a body tag.
        let (status, body) = get(handle.addr(), "/docs").await?;
        assert_eq!(status, 200);
        assert!(body.ends_with(&format!("<p>docs</p><script src=\"{CLIENT_PATH}\"></script>")));

        handle.shutdown().await;
        Ok(())
    })
    .await
}

#[tokio::test]
async fn static_files_keep_their_bytes() -> TestResult {
    with_timeout(async {
        init_tracing();

        let (_dir, mut handle, _) = serve_site().await?;

        let (status, body) = get(handle.addr(), "/css/main.css").await?;
        assert_eq!(status, 200);
        assert_eq!(body, "body{margin:0}");

        let (status, body) = get(handle.addr(), CLIENT_PATH).await?;
        assert_eq!(status, 200);
        assert!(body.contains(WS_PATH));

        handle.shutdown().await;
        Ok(())
    })
    .await
}

#[tokio::test]
async fn missing_and_escaping_paths_are_refused() -> TestResult {
    with_timeout(async {
        init_tracing();

        let (_dir, mut handle, _) = serve_site().await?;

        let (status, _) = get(handle.addr(), "/nope.js").await?;
        assert_eq!(status, 404);

        let (status, _) = get(handle.addr(), "/%2e%2e/%2e%2e/etc/passwd").await?;
        assert_eq!(status, 403);

        let (status, _) = get(handle.addr(), "/css/%ff.css").await?;
        assert_eq!(status, 400);

        handle.shutdown().await;
        Ok(())
    })
    .await
}

#[tokio::test]
async fn websocket_clients_receive_reload_messages() -> TestResult {
    with_timeout(async {
        init_tracing();

        let (_dir, mut handle, broadcaster) = serve_site().await?;

        let url = format!("ws://{}{WS_PATH}", handle.addr());
        let (mut first, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
        let (mut second, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
        assert!(wait_until(|| broadcaster.client_count() == 2).await);

        assert_eq!(
            broadcaster.notify_clients(ReloadScope::Styles {
                paths: vec!["css/main.css".to_string()],
            }),
            2
        );

        for ws in [&mut first, &mut second] {
            let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
                .await?
                .ok_or("socket closed")??;
            assert_eq!(msg.to_text()?, r#"{"type":"css","paths":["css/main.css"]}"#);
        }

        broadcaster.notify_clients(ReloadScope::FullPage);
        let msg = first.next().await.ok_or("socket closed")??;
        assert_eq!(msg.to_text()?, r#"{"type":"reload"}"#);

        // A client that goes away is no longer counted.
        drop(second);
        assert!(wait_until(|| broadcaster.client_count() == 1).await);

        handle.shutdown().await;
        Ok(())
    })
    .await
}

#[tokio::test]
async fn shutdown_closes_sockets_and_releases_the_port() -> TestResult {
    with_timeout(async {
        init_tracing();

        let (_dir, mut handle, broadcaster) = serve_site().await?;
        let addr = handle.addr();

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}{WS_PATH}")).await?;
        assert!(wait_until(|| broadcaster.client_count() == 1).await);

        handle.shutdown().await;
        assert!(!handle.is_running());

        match tokio::time::timeout(Duration::from_secs(2), ws.next()).await? {
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {}
            Some(Ok(other)) => panic!("unexpected message after shutdown: {other:?}"),
        }

        assert!(TcpStream::connect(addr).await.is_err());

        // Second shutdown is a no-op.
        handle.shutdown().await;
        Ok(())
    })
    .await
}
