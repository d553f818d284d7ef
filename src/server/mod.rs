// src/server/mod.rs

//! Development server: static files from the output directory plus a
//! websocket that forwards [`ReloadBroadcaster`] messages to browsers.

pub mod files;
pub mod reload;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::get,
};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::errors::Result;

pub use files::{RequestPathError, inject_client, resolve_request_path};
pub use reload::{ReloadBroadcaster, ReloadScope};

pub const WS_PATH: &str = "/__assetdag/ws";
pub const CLIENT_PATH: &str = "/__assetdag/client.js";

const CLIENT_SCRIPT: &str = include_str!("client.js");
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

struct ServerState {
    root: PathBuf,
    broadcaster: ReloadBroadcaster,
    shutdown: watch::Receiver<bool>,
}

pub struct DevServer;

impl DevServer {
    /// Bind `addr` and start serving `root` in the background.
    ///
    /// Returns once the listener is bound, so the reported address is
    /// already accepting connections.
    pub async fn start(
        root: impl Into<PathBuf>,
        addr: SocketAddr,
        broadcaster: ReloadBroadcaster,
    ) -> Result<ServerHandle> {
        let root = root.into();
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state = Arc::new(ServerState {
            root: root.clone(),
            broadcaster,
            shutdown: shutdown_rx.clone(),
        });
        let app = router(state);

        let mut graceful = shutdown_rx;
        let join = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = graceful.wait_for(|stop| *stop).await;
            });
            if let Err(err) = server.await {
                error!(error = %err, "dev server terminated");
            }
        });

        info!(
            url = %format!("http://{local_addr}"),
            root = %root.display(),
            "dev server listening"
        );

        Ok(ServerHandle {
            addr: local_addr,
            shutdown_tx,
            join: Some(join),
        })
    }
}

fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route(WS_PATH, get(websocket_handler))
        .route(CLIENT_PATH, get(client_script))
        .fallback(static_handler)
        .with_state(state)
}

/// Handle of a running [`DevServer`].
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    join: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    /// Stop accepting connections, close websockets and wait for the server
    /// task. Calling this more than once is harmless.
    pub async fn shutdown(&mut self) {
        self.shutdown_tx.send_replace(true);
        let Some(mut join) = self.join.take() else {
            return;
        };
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut join).await {
            Ok(_) => info!(addr = %self.addr, "dev server stopped"),
            Err(_) => {
                warn!(addr = %self.addr, "dev server did not stop in time; aborting");
                join.abort();
            }
        }
    }
}

async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        CLIENT_SCRIPT,
    )
}

async fn static_handler(State(state): State<Arc<ServerState>>, uri: Uri) -> Response {
    let mut path = match resolve_request_path(&state.root, uri.path()) {
        Ok(path) => path,
        Err(RequestPathError::Traversal) => {
            return (StatusCode::FORBIDDEN, "Forbidden").into_response();
        }
        Err(RequestPathError::Malformed) => {
            return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
        }
    };

    if tokio::fs::metadata(&path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        path.push("index.html");
    }

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(_) => {
            debug!(path = %uri.path(), "not found");
            return (StatusCode::NOT_FOUND, "Not Found").into_response();
        }
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    if mime.essence_str() == "text/html" {
        let html = inject_client(&String::from_utf8_lossy(&bytes));
        return ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], html).into_response();
    }

    ([(header::CONTENT_TYPE, mime.to_string())], bytes).into_response()
}

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<ServerState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.broadcaster.subscribe();
    let mut shutdown = state.shutdown.clone();
    debug!(clients = state.broadcaster.client_count(), "reload client connected");

    loop {
        tokio::select! {
            msg = rx.recv() => {
                let scope = match msg {
                    Ok(scope) => scope,
                    // Missed messages collapse into one full reload.
                    Err(broadcast::error::RecvError::Lagged(_)) => ReloadScope::FullPage,
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let Ok(json) = serde_json::to_string(&scope) else {
                    continue;
                };
                if sender.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            // The borrowed guard must not outlive this branch.
            _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => break,
        }
    }

    let closing = *shutdown.borrow();
    if closing {
        let _ = sender.send(Message::Close(None)).await;
    }

    debug!("reload client disconnected");
}

#[cfg(test)]
mod tests {
    use std::future::Future;

    use super::*;

    fn spawnable<F, Fut>(_handler: F)
    where
        F: FnOnce(WebSocket, Arc<ServerState>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
    }

    #[test]
    fn socket_handler_can_run_on_the_runtime() {
        // `on_upgrade` needs a Send future; this fails to compile otherwise.
        spawnable(handle_socket);
    }
}
