use crate::errors::ConsoleError;
use crate::models::{parse_scan, ConnectionState, IdentifyMessage, ScanEvent};
use crate::relay::{ConnectionSignal, NotificationRelay};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::{
    sync::{mpsc, oneshot, watch, Mutex},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

struct Link {
    close: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

struct Shared {
    url: String,
    identify: IdentifyMessage,
    relay: Arc<NotificationRelay>,
    scans: mpsc::UnboundedSender<ScanEvent>,
    state: watch::Sender<ConnectionState>,
}

// Disconnected -> Connecting -> Connected -> Disconnected. Only `connect`
// leaves Disconnected; nothing reconnects automatically.
pub struct SocketSessionManager {
    shared: Arc<Shared>,
    link: Mutex<Option<Link>>,
}

impl SocketSessionManager {
    pub fn new(
        url: impl Into<String>,
        identify: IdentifyMessage,
        relay: Arc<NotificationRelay>,
        scans: mpsc::UnboundedSender<ScanEvent>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                url: url.into(),
                identify,
                relay,
                scans,
                state,
            }),
            link: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Opens a fresh connection. A previous one is closed, and its task
    /// finished, before the new one is started.
    pub async fn connect(&self) {
        let mut link = self.link.lock().await;
        if let Some(previous) = link.take() {
            info!("closing previous scanner connection");
            shut_down(previous).await;
        }

        self.shared.state.send_replace(ConnectionState::Connecting);
        let (close, close_rx) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(shared.run(close_rx));
        *link = Some(Link { close, task });
    }

    pub async fn close(&self) {
        if let Some(previous) = self.link.lock().await.take() {
            shut_down(previous).await;
        }
    }
}

async fn shut_down(link: Link) {
    let _ = link.close.send(());
    if let Err(err) = link.task.await {
        error!("scanner connection task failed: {err}");
    }
}

impl Shared {
    async fn run(self: Arc<Self>, mut close_rx: oneshot::Receiver<()>) {
        info!(url = %self.url, "connecting to scanner");
        let connecting = tokio::select! {
            result = connect_async(self.url.as_str()) => result,
            _ = &mut close_rx => {
                self.state.send_replace(ConnectionState::Disconnected);
                return;
            }
        };
        let mut socket = match connecting {
            Ok((socket, _)) => socket,
            Err(err) => return self.lost(ConnectionSignal::Failed, Some(err.into())).await,
        };

        self.state.send_replace(ConnectionState::Connected);
        info!(url = %self.url, "connected to scanner");
        self.relay.connection_signal(ConnectionSignal::Opened).await;

        if let Err(err) = socket.send(Message::Text(self.identify.to_frame())).await {
            return self.lost(ConnectionSignal::Failed, Some(err.into())).await;
        }

        loop {
            tokio::select! {
                _ = &mut close_rx => {
                    if let Err(err) = socket.close(None).await {
                        debug!("close handshake failed: {err}");
                    }
                    return self.lost(ConnectionSignal::Closed, None).await;
                }
                frame = socket.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.forward(&text),
                    Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                        Ok(text) => self.forward(&text),
                        Err(_) => debug!("ignoring non-utf8 scanner frame"),
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        return self.lost(ConnectionSignal::Closed, None).await;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        return self.lost(ConnectionSignal::Failed, Some(err.into())).await;
                    }
                },
            }
        }
    }

    fn forward(&self, raw: &str) {
        match parse_scan(raw) {
            Some(scan) => {
                info!(tag_id = %scan.tag_id, "tag scanned");
                if self.scans.send(scan).is_err() {
                    warn!("scan receiver is gone, dropping tag");
                }
            }
            None => debug!(frame = raw, "ignoring scanner frame"),
        }
    }

    async fn lost(&self, signal: ConnectionSignal, cause: Option<ConsoleError>) {
        self.state.send_replace(ConnectionState::Disconnected);
        match cause {
            Some(err) => error!(url = %self.url, "{err}"),
            None => warn!(url = %self.url, "scanner connection closed"),
        }
        self.relay.connection_signal(signal).await;
    }
}
