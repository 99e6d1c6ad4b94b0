use crate::config::ConsoleConfig;
use crate::models::{ConfirmationResult, Notification, SessionMode};
use chrono::Local;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{watch, Mutex},
    time::{sleep, Instant},
};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectPlan {
    pub target: String,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionSignal {
    Opened,
    Failed,
    Closed,
}

struct Entry {
    notification: Notification,
    expires_at: Instant,
}

#[derive(Default)]
struct RelayState {
    next_id: u64,
    entries: Vec<Entry>,
    redirect_pending: bool,
    redirects_scheduled: usize,
}

// Every outcome handed in is shown, identical texts included.
pub struct NotificationRelay {
    ttl: Duration,
    redirect: Option<RedirectPlan>,
    announce_connection: bool,
    state: Mutex<RelayState>,
    navigation: watch::Sender<Option<String>>,
}

impl NotificationRelay {
    pub fn new(ttl: Duration, redirect: Option<RedirectPlan>, announce_connection: bool) -> Self {
        let (navigation, _) = watch::channel(None);
        Self {
            ttl,
            redirect,
            announce_connection,
            state: Mutex::new(RelayState::default()),
            navigation,
        }
    }

    pub fn for_config(config: &ConsoleConfig) -> Self {
        let redirect = config.session.redirects_on_success().then(|| RedirectPlan {
            target: config.redirect_target(),
            delay: config.redirect_delay,
        });
        let announce = config.session.mode == SessionMode::UserRegistration;
        Self::new(config.notification_ttl, redirect, announce)
    }

    pub async fn deliver(self: &Arc<Self>, outcome: ConfirmationResult) {
        let success = outcome.is_success();
        self.notify(&outcome).await;
        if success {
            self.schedule_redirect().await;
        }
    }

    pub async fn notify(&self, outcome: &ConfirmationResult) -> u64 {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        state.entries.retain(|entry| entry.expires_at > now);
        state.next_id += 1;
        let id = state.next_id;
        state.entries.push(Entry {
            notification: Notification {
                id,
                kind: outcome.kind,
                message: outcome.text.trim().to_string(),
                shown_at: Local::now().format("%H:%M:%S").to_string(),
            },
            expires_at: now + self.ttl,
        });
        debug!(id, kind = ?outcome.kind, "notification shown");
        id
    }

    pub async fn connection_signal(&self, signal: ConnectionSignal) {
        if !self.announce_connection {
            return;
        }
        let outcome = match signal {
            ConnectionSignal::Opened => ConfirmationResult::success("Connected to RFID server"),
            ConnectionSignal::Failed => ConfirmationResult::error("WebSocket connection error"),
            ConnectionSignal::Closed => ConfirmationResult::error("WebSocket disconnected"),
        };
        self.notify(&outcome).await;
    }

    async fn schedule_redirect(self: &Arc<Self>) {
        let Some(plan) = self.redirect.clone() else {
            return;
        };
        {
            let mut state = self.state.lock().await;
            if state.redirect_pending {
                debug!("redirect already scheduled");
                return;
            }
            state.redirect_pending = true;
            state.redirects_scheduled += 1;
        }

        info!(location = %plan.target, delay_ms = plan.delay.as_millis() as u64, "redirect scheduled");
        let relay = Arc::clone(self);
        tokio::spawn(async move {
            sleep(plan.delay).await;
            info!(location = %plan.target, "redirecting");
            relay.navigation.send_replace(Some(plan.target));
        });
    }

    pub async fn active(&self) -> Vec<Notification> {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        state.entries.retain(|entry| entry.expires_at > now);
        state
            .entries
            .iter()
            .map(|entry| entry.notification.clone())
            .collect()
    }

    pub async fn dismiss(&self, id: u64) -> bool {
        let mut state = self.state.lock().await;
        let before = state.entries.len();
        state.entries.retain(|entry| entry.notification.id != id);
        state.entries.len() != before
    }

    pub async fn redirects_scheduled(&self) -> usize {
        self.state.lock().await.redirects_scheduled
    }

    pub fn navigation(&self) -> Option<String> {
        self.navigation.borrow().clone()
    }

    pub fn subscribe_navigation(&self) -> watch::Receiver<Option<String>> {
        self.navigation.subscribe()
    }
}
