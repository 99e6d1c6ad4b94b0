use crate::dispatcher::ScanDispatcher;
use crate::errors::ConsoleError;
use crate::models::{ConfirmationResult, SuccessfulPayment};
use crate::relay::NotificationRelay;
use std::{collections::HashSet, sync::Arc, time::Duration};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};
use urlencoding::encode;

// Transaction ids already announced during this process' lifetime. Only grows.
#[derive(Debug, Default)]
pub struct SeenSet {
    ids: HashSet<String>,
}

impl SeenSet {
    pub fn insert(&mut self, transaction_id: &str) -> bool {
        self.ids.insert(transaction_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

pub struct PaymentPoller {
    dispatcher: ScanDispatcher,
    relay: Arc<NotificationRelay>,
    request_id: String,
    seen: SeenSet,
}

impl PaymentPoller {
    pub fn new(
        dispatcher: ScanDispatcher,
        relay: Arc<NotificationRelay>,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            dispatcher,
            relay,
            request_id: request_id.into(),
            seen: SeenSet::default(),
        }
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    pub async fn run(mut self, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = self.poll_once().await {
                warn!("payment polling failed: {err}");
            }
        }
    }

    /// Returns how many payments were new.
    pub async fn poll_once(&mut self) -> Result<usize, ConsoleError> {
        let url = format!(
            "{}/api/requests/{}/successful-payments",
            self.dispatcher.base_url(),
            encode(&self.request_id)
        );
        let response = self
            .dispatcher
            .authorize(self.dispatcher.client().get(url))
            .send()
            .await?
            .error_for_status()?;
        let payments: Vec<SuccessfulPayment> = response.json().await?;

        let mut fresh = 0;
        for payment in payments {
            if !self.seen.insert(&payment.transaction_id) {
                continue;
            }
            fresh += 1;
            debug!(transaction_id = %payment.transaction_id, "new payment");
            self.relay
                .deliver(ConfirmationResult::success(format!(
                    "{} just paid €{}",
                    payment.payer_name, payment.amount
                )))
                .await;
        }
        Ok(fresh)
    }
}
