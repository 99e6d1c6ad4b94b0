#![allow(dead_code)]

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use rfid_console::models::{IdentifyMessage, SuccessfulPayment};
use serde_json::json;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Barrier, Mutex};
use tokio::time::sleep;

pub const CSRF_HEADER: &str = "X-CSRF-TOKEN";
pub const CLOSE_FRAME: &str = "__close__";

pub async fn wait_until<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if check().await {
            return;
        }
        if Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        sleep(Duration::from_millis(20)).await;
    }
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
    let addr = listener.local_addr().expect("local addr");
    (listener, addr.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub tag_id: Option<String>,
    pub subject_id: String,
    pub csrf: Option<String>,
    pub cookie: Option<String>,
}

#[derive(Clone)]
struct BackendState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    payments: Arc<Mutex<Vec<SuccessfulPayment>>>,
    overlap: Arc<Barrier>,
}

// Tag ids select the behaviour: FORBIDDEN 403, GARBLED non-JSON body,
// MISSING no message, UNKNOWN 404, SLOW-* held until two are in flight.
pub struct MockBackend {
    pub base_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    payments: Arc<Mutex<Vec<SuccessfulPayment>>>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let state = BackendState {
            requests: Arc::new(Mutex::new(Vec::new())),
            payments: Arc::new(Mutex::new(Vec::new())),
            overlap: Arc::new(Barrier::new(2)),
        };
        let requests = Arc::clone(&state.requests);
        let payments_list = Arc::clone(&state.payments);

        let app = Router::new()
            .route("/api/rfid/:tag/pay/:request", post(pay))
            .route("/api/rfid/:tag/change/:user", post(change))
            .route("/api/rfid/clear/:user", delete(clear))
            .route("/api/requests/:request/successful-payments", get(payments))
            .with_state(state);

        let (listener, addr) = bind().await;
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock backend");
        });
        Self {
            base_url: format!("http://{addr}"),
            requests,
            payments: payments_list,
        }
    }

    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn add_payment(&self, transaction_id: &str, payer_name: &str, amount: &str) {
        self.payments.lock().await.push(SuccessfulPayment {
            transaction_id: transaction_id.to_string(),
            payer_name: payer_name.to_string(),
            amount: amount.to_string(),
            timestamp: "2025-06-04T12:07:15".to_string(),
        });
    }
}

async fn record(
    state: &BackendState,
    method: &'static str,
    tag_id: Option<String>,
    subject_id: String,
    headers: &HeaderMap,
) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    state.requests.lock().await.push(RecordedRequest {
        method,
        tag_id,
        subject_id,
        csrf: header(CSRF_HEADER),
        cookie: header("cookie"),
    });
}

fn outcome(status: StatusCode, kind: &str, message: &str) -> Response {
    (status, Json(json!({ "type": kind, "message": message }))).into_response()
}

async fn pay(
    State(state): State<BackendState>,
    Path((tag, request)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    record(&state, "POST", Some(tag.clone()), request, &headers).await;
    match tag.as_str() {
        "FORBIDDEN" => outcome(StatusCode::FORBIDDEN, "success", "should never be shown"),
        "GARBLED" => (StatusCode::OK, "<html>oops</html>").into_response(),
        "MISSING" => (StatusCode::OK, Json(json!({ "type": "success" }))).into_response(),
        "UNKNOWN" => outcome(
            StatusCode::NOT_FOUND,
            "error",
            "No user found for RFID UNKNOWN",
        ),
        slow if slow.starts_with("SLOW") => {
            state.overlap.wait().await;
            outcome(StatusCode::OK, "success", &format!("Paid {slow}"))
        }
        _ => outcome(StatusCode::OK, "success", "Paid"),
    }
}

async fn change(
    State(state): State<BackendState>,
    Path((tag, user)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    record(&state, "POST", Some(tag.clone()), user, &headers).await;
    match tag.as_str() {
        "FORBIDDEN" => StatusCode::FORBIDDEN.into_response(),
        "TAKEN" => outcome(StatusCode::BAD_REQUEST, "error", "RFID is already taken"),
        _ => outcome(StatusCode::OK, "success", "User RFID updated successfully"),
    }
}

async fn clear(
    State(state): State<BackendState>,
    Path(user): Path<String>,
    headers: HeaderMap,
) -> Response {
    record(&state, "DELETE", None, user.clone(), &headers).await;
    if user == "locked" {
        return StatusCode::FORBIDDEN.into_response();
    }
    outcome(StatusCode::OK, "success", "User RFID cleared successfully")
}

async fn payments(
    State(state): State<BackendState>,
    Path(_request): Path<String>,
) -> Json<Vec<SuccessfulPayment>> {
    Json(state.payments.lock().await.clone())
}

#[derive(Clone)]
struct ScannerState {
    frames: broadcast::Sender<String>,
    identifications: Arc<Mutex<Vec<IdentifyMessage>>>,
    open: Arc<AtomicUsize>,
    accepted: Arc<AtomicUsize>,
    closed_by_client: Arc<AtomicUsize>,
}

pub struct MockScanner {
    pub url: String,
    state: ScannerState,
}

impl MockScanner {
    pub async fn start() -> Self {
        let (frames, _) = broadcast::channel(64);
        let state = ScannerState {
            frames,
            identifications: Arc::new(Mutex::new(Vec::new())),
            open: Arc::new(AtomicUsize::new(0)),
            accepted: Arc::new(AtomicUsize::new(0)),
            closed_by_client: Arc::new(AtomicUsize::new(0)),
        };
        let app = Router::new()
            .route("/", get(upgrade))
            .with_state(state.clone());

        let (listener, addr) = bind().await;
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock scanner");
        });
        Self {
            url: format!("ws://{addr}/"),
            state,
        }
    }

    pub fn push(&self, frame: &str) {
        let _ = self.state.frames.send(frame.to_string());
    }

    pub fn hang_up(&self) {
        self.push(CLOSE_FRAME);
    }

    pub async fn identifications(&self) -> Vec<IdentifyMessage> {
        self.state.identifications.lock().await.clone()
    }

    pub fn open(&self) -> usize {
        self.state.open.load(Ordering::SeqCst)
    }

    pub fn accepted(&self) -> usize {
        self.state.accepted.load(Ordering::SeqCst)
    }

    pub fn closed_by_client(&self) -> usize {
        self.state.closed_by_client.load(Ordering::SeqCst)
    }
}

async fn upgrade(State(state): State<ScannerState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| serve_scanner(socket, state))
}

async fn serve_scanner(mut socket: WebSocket, state: ScannerState) {
    let mut frames = state.frames.subscribe();
    state.accepted.fetch_add(1, Ordering::SeqCst);
    state.open.fetch_add(1, Ordering::SeqCst);

    if socket
        .send(Message::Text(json!({ "event": "ready" }).to_string()))
        .await
        .is_ok()
    {
        loop {
            tokio::select! {
                incoming = socket.recv() => match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(identify) = serde_json::from_str::<IdentifyMessage>(&text) {
                            state.identifications.lock().await.push(identify);
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        state.closed_by_client.fetch_add(1, Ordering::SeqCst);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                },
                outgoing = frames.recv() => match outgoing {
                    Ok(frame) if frame == CLOSE_FRAME => {
                        let _ = socket.send(Message::Close(None)).await;
                        break;
                    }
                    Ok(frame) => {
                        if socket.send(Message::Text(frame)).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                },
            }
        }
    }

    state.open.fetch_sub(1, Ordering::SeqCst);
}
