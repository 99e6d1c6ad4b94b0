use crate::config::{ConsoleConfig, CsrfToken};
use crate::errors::ConsoleError;
use crate::models::ConfirmationResult;
use reqwest::{header, Client, Method, RequestBuilder, StatusCode};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tracing::{error, info, warn};
use urlencoding::encode;

pub const GENERIC_ERROR: &str = "Unexpected error occurred";
pub const UNEXPECTED_RESPONSE: &str = "Unexpected server response";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Pay,
    Change,
    Clear,
}

impl Operation {
    pub fn not_authorized(self) -> &'static str {
        match self {
            Operation::Pay => "Not authorized to make RFID payments",
            Operation::Change => "Not authorized to change RFID",
            Operation::Clear => "Not authorized to clear RFID",
        }
    }

    fn malformed(self) -> &'static str {
        match self {
            Operation::Pay => GENERIC_ERROR,
            Operation::Change | Operation::Clear => UNEXPECTED_RESPONSE,
        }
    }
}

// Overlapping confirmations are allowed; the count only makes them visible.
#[derive(Clone)]
pub struct ScanDispatcher {
    client: Client,
    base_url: String,
    subject_id: String,
    csrf: Option<CsrfToken>,
    session_cookie: Option<String>,
    in_flight: Arc<AtomicUsize>,
}

impl ScanDispatcher {
    pub fn new(config: &ConsoleConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &ConsoleConfig) -> Self {
        Self {
            client,
            base_url: config.api_base_url.clone(),
            subject_id: config.session.subject_id.clone(),
            csrf: config.csrf.clone(),
            session_cookie: config.session_cookie.clone(),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn endpoint(&self, operation: Operation, tag_id: &str) -> (Method, String) {
        let subject = encode(&self.subject_id);
        match operation {
            Operation::Pay => (
                Method::POST,
                format!("{}/api/rfid/{}/pay/{subject}", self.base_url, encode(tag_id)),
            ),
            Operation::Change => (
                Method::POST,
                format!("{}/api/rfid/{}/change/{subject}", self.base_url, encode(tag_id)),
            ),
            Operation::Clear => (
                Method::DELETE,
                format!("{}/api/rfid/clear/{subject}", self.base_url),
            ),
        }
    }

    pub async fn dispatch(&self, operation: Operation, tag_id: &str) -> ConfirmationResult {
        let guard = InFlight::enter(&self.in_flight);
        if guard.concurrent > 1 {
            warn!(
                concurrent = guard.concurrent,
                tag_id, "confirmation issued while another is in flight"
            );
        }

        let result = self.confirm(operation, tag_id).await;
        drop(guard);

        match result {
            Ok(outcome) => outcome,
            Err(ConsoleError::Authorization) => {
                warn!(?operation, "confirmation rejected with 403");
                ConfirmationResult::error(operation.not_authorized())
            }
            Err(ConsoleError::Malformed(detail)) => {
                error!(?operation, %detail, "invalid confirmation payload");
                ConfirmationResult::error(operation.malformed())
            }
            Err(err) => {
                error!(?operation, "confirmation failed: {err}");
                ConfirmationResult::error(GENERIC_ERROR)
            }
        }
    }

    async fn confirm(
        &self,
        operation: Operation,
        tag_id: &str,
    ) -> Result<ConfirmationResult, ConsoleError> {
        let (method, url) = self.endpoint(operation, tag_id);
        info!(?operation, tag_id, %url, "requesting confirmation");

        let response = self.authorize(self.client.request(method, url)).send().await?;
        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(ConsoleError::Authorization);
        }
        if !status.is_success() {
            warn!(%status, "confirmation endpoint returned non-success status");
        }

        let body = response.bytes().await?;
        serde_json::from_slice::<ConfirmationResult>(&body)
            .map_err(|err| ConsoleError::Malformed(format!("status {status}: {err}")))
    }

    pub(crate) fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let mut request = request.header(header::ACCEPT, "application/json");
        if let Some(csrf) = &self.csrf {
            request = request.header(csrf.header.as_str(), csrf.token.as_str());
        }
        if let Some(cookie) = &self.session_cookie {
            request = request.header(header::COOKIE, cookie.as_str());
        }
        request
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }
}

// Holds one in-flight slot until dropped, cancellation included.
struct InFlight {
    counter: Arc<AtomicUsize>,
    concurrent: usize,
}

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        let concurrent = counter.fetch_add(1, Ordering::SeqCst) + 1;
        Self {
            counter: Arc::clone(counter),
            concurrent,
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Session;

    fn dispatcher(session: Session) -> ScanDispatcher {
        let mut config = ConsoleConfig::new(session);
        config.api_base_url = "http://backend".into();
        ScanDispatcher::new(&config)
    }

    #[test]
    fn endpoints_encode_path_segments() {
        let payment = dispatcher(Session::payment("req 1", false));
        assert_eq!(
            payment.endpoint(Operation::Pay, "AA:BB/CC"),
            (
                Method::POST,
                "http://backend/api/rfid/AA%3ABB%2FCC/pay/req%201".to_string()
            )
        );

        let user = dispatcher(Session::registration("open-id"));
        assert_eq!(
            user.endpoint(Operation::Change, "04A2"),
            (
                Method::POST,
                "http://backend/api/rfid/04A2/change/open-id".to_string()
            )
        );
        assert_eq!(
            user.endpoint(Operation::Clear, ""),
            (
                Method::DELETE,
                "http://backend/api/rfid/clear/open-id".to_string()
            )
        );
    }

    #[tokio::test]
    async fn network_failure_becomes_generic_error() {
        let mut config = ConsoleConfig::new(Session::payment("req", false));
        config.api_base_url = "http://127.0.0.1:1".into();
        let dispatcher = ScanDispatcher::new(&config);

        let outcome = dispatcher.dispatch(Operation::Pay, "AA").await;
        assert_eq!(outcome, ConfirmationResult::error(GENERIC_ERROR));
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn cancelled_dispatch_releases_in_flight_slot() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let silent = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let mut config = ConsoleConfig::new(Session::registration("open-id"));
        config.api_base_url = format!("http://{addr}");
        let dispatcher = ScanDispatcher::new(&config);

        let pending = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.dispatch(Operation::Clear, "").await })
        };
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while dispatcher.in_flight() == 0 {
            assert!(std::time::Instant::now() < deadline, "dispatch never started");
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        pending.abort();
        assert!(pending.await.unwrap_err().is_cancelled());
        assert_eq!(dispatcher.in_flight(), 0);
        silent.abort();
    }
}
