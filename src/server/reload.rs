// src/server/reload.rs

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// What connected browsers should refresh.
///
/// Serialized as the websocket message:
/// `{"type":"reload"}` or `{"type":"css","paths":["css/main.css"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReloadScope {
    #[serde(rename = "reload")]
    FullPage,
    /// Swap stylesheets in place. Paths are relative to the output directory.
    #[serde(rename = "css")]
    Styles { paths: Vec<String> },
}

/// Fan-out of reload signals to every connected client.
#[derive(Debug, Clone)]
pub struct ReloadBroadcaster {
    tx: broadcast::Sender<ReloadScope>,
}

impl Default for ReloadBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadBroadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadScope> {
        self.tx.subscribe()
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Send `scope` to every client; returns how many received it. Zero
    /// clients is a no-op.
    pub fn notify_clients(&self, scope: ReloadScope) -> usize {
        match self.tx.send(scope.clone()) {
            Ok(n) => {
                info!(?scope, clients = n, "reload broadcast");
                n
            }
            Err(_) => {
                debug!(?scope, "no clients connected; reload dropped");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_serialize_with_type_tag() {
        assert_eq!(
            serde_json::to_string(&ReloadScope::FullPage).unwrap(),
            r#"{"type":"reload"}"#
        );
        assert_eq!(
            serde_json::to_string(&ReloadScope::Styles {
                paths: vec!["css/main.css".into()]
            })
            .unwrap(),
            r#"{"type":"css","paths":["css/main.css"]}"#
        );
    }

    #[test]
    fn no_clients_is_a_noop() {
        let broadcaster = ReloadBroadcaster::new();
        assert_eq!(broadcaster.notify_clients(ReloadScope::FullPage), 0);
    }

    #[tokio::test]
    async fn subscribers_receive_scope() {
        let broadcaster = ReloadBroadcaster::new();
        let mut rx = broadcaster.subscribe();
        assert_eq!(broadcaster.notify_clients(ReloadScope::FullPage), 1);
        assert_eq!(rx.recv().await.unwrap(), ReloadScope::FullPage);
    }
}
