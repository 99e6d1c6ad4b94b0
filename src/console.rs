use crate::config::ConsoleConfig;
use crate::dispatcher::{Operation, ScanDispatcher};
use crate::models::{
    ConfirmationResult, ScanEvent, Session, SessionMode, StatusResponse, Transport,
};
use crate::poller::PaymentPoller;
use crate::relay::NotificationRelay;
use crate::socket::SocketSessionManager;
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::info;

pub struct Console {
    config: ConsoleConfig,
    relay: Arc<NotificationRelay>,
    dispatcher: ScanDispatcher,
    manager: SocketSessionManager,
}

impl Console {
    pub fn new(config: ConsoleConfig) -> (Arc<Self>, mpsc::UnboundedReceiver<ScanEvent>) {
        let (scans_tx, scans_rx) = mpsc::unbounded_channel();
        let relay = Arc::new(NotificationRelay::for_config(&config));
        let dispatcher = ScanDispatcher::new(&config);
        let manager = SocketSessionManager::new(
            config.scanner_url.clone(),
            config.session.identify(),
            Arc::clone(&relay),
            scans_tx,
        );
        let console = Arc::new(Self {
            config,
            relay,
            dispatcher,
            manager,
        });
        (console, scans_rx)
    }

    pub fn session(&self) -> &Session {
        &self.config.session
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn relay(&self) -> &Arc<NotificationRelay> {
        &self.relay
    }

    pub fn dispatcher(&self) -> &ScanDispatcher {
        &self.dispatcher
    }

    pub fn manager(&self) -> &SocketSessionManager {
        &self.manager
    }

    pub fn scan_operation(&self) -> Operation {
        match self.config.session.mode {
            SessionMode::Payment => Operation::Pay,
            SessionMode::UserRegistration => Operation::Change,
        }
    }

    // Registration consoles wait for the operator to connect.
    pub fn start(
        self: &Arc<Self>,
        scans: mpsc::UnboundedReceiver<ScanEvent>,
    ) -> Vec<JoinHandle<()>> {
        let mut tasks = vec![self.spawn_navigation_watch()];
        match self.config.transport {
            Transport::Socket => {
                tasks.push(self.spawn_scan_loop(scans));
                if self.config.session.mode == SessionMode::Payment {
                    let console = Arc::clone(self);
                    tasks.push(tokio::spawn(async move { console.manager.connect().await }));
                }
            }
            Transport::Polling => {
                let poller = PaymentPoller::new(
                    self.dispatcher.clone(),
                    Arc::clone(&self.relay),
                    self.config.session.subject_id.clone(),
                );
                tasks.push(tokio::spawn(poller.run(self.config.poll_interval)));
            }
        }
        tasks
    }

    // One task per scan.
    pub fn spawn_scan_loop(
        self: &Arc<Self>,
        mut scans: mpsc::UnboundedReceiver<ScanEvent>,
    ) -> JoinHandle<()> {
        let console = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(scan) = scans.recv().await {
                let console = Arc::clone(&console);
                tokio::spawn(async move {
                    console.handle_scan(scan).await;
                });
            }
        })
    }

    pub async fn handle_scan(&self, scan: ScanEvent) -> ConfirmationResult {
        if self.config.session.mode == SessionMode::UserRegistration {
            self.relay
                .notify(&ConfirmationResult::message(format!(
                    "RFID UID received: {}",
                    scan.tag_id
                )))
                .await;
        }
        let outcome = self
            .dispatcher
            .dispatch(self.scan_operation(), &scan.tag_id)
            .await;
        self.relay.deliver(outcome.clone()).await;
        outcome
    }

    pub async fn clear_tag(&self) -> ConfirmationResult {
        let outcome = self.dispatcher.dispatch(Operation::Clear, "").await;
        self.relay.deliver(outcome.clone()).await;
        outcome
    }

    pub async fn reconnect(&self) {
        info!("reconnect requested");
        self.manager.connect().await;
    }

    pub fn status(&self) -> StatusResponse {
        let connection = self.manager.state();
        StatusResponse {
            mode: self.config.session.mode,
            subject_id: self.config.session.subject_id.clone(),
            multi_use: self.config.session.multi_use,
            transport: self.config.transport,
            connection,
            indicator: connection.indicator(),
            in_flight: self.dispatcher.in_flight(),
            navigate_to: self.relay.navigation(),
        }
    }

    fn spawn_navigation_watch(self: &Arc<Self>) -> JoinHandle<()> {
        let console = Arc::clone(self);
        let mut navigation = self.relay.subscribe_navigation();
        tokio::spawn(async move {
            let left = navigation.wait_for(Option::is_some).await.is_ok();
            if left {
                info!("console left after redirect, closing scanner connection");
                console.manager.close().await;
            }
        })
    }
}
