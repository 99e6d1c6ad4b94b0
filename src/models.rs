use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionMode {
    Payment,
    UserRegistration,
}

impl SessionMode {
    pub fn identify_type(self) -> &'static str {
        match self {
            SessionMode::Payment => "transaction",
            SessionMode::UserRegistration => "user",
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionMode::Payment => f.write_str("payment"),
            SessionMode::UserRegistration => f.write_str("user-registration"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub mode: SessionMode,
    pub subject_id: String,
    pub multi_use: bool,
}

impl Session {
    pub fn payment(request_id: impl Into<String>, multi_use: bool) -> Self {
        Self {
            mode: SessionMode::Payment,
            subject_id: request_id.into(),
            multi_use,
        }
    }

    pub fn registration(user_id: impl Into<String>) -> Self {
        Self {
            mode: SessionMode::UserRegistration,
            subject_id: user_id.into(),
            multi_use: false,
        }
    }

    pub fn redirects_on_success(&self) -> bool {
        self.mode == SessionMode::Payment && !self.multi_use
    }

    pub fn identify(&self) -> IdentifyMessage {
        IdentifyMessage {
            kind: self.mode.identify_type().to_string(),
            id: self.subject_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl IdentifyMessage {
    pub fn to_frame(&self) -> String {
        serde_json::json!({ "type": self.kind, "id": self.id }).to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub tag_id: String,
}

/// Interprets one frame from the scanning service.
///
/// Structured frames carry either `{"event":"ready"}` (ignored) or
/// `{"uid": ...}`. Anything that is not JSON is taken verbatim as the tag
/// identifier. JSON that is not an object, or an object without a usable
/// `uid`, yields nothing.
pub fn parse_scan(raw: &str) -> Option<ScanEvent> {
    let tag_id = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(obj)) => {
            if obj.get("event").and_then(Value::as_str) == Some("ready") {
                return None;
            }
            match obj.get("uid") {
                Some(Value::String(uid)) => uid.clone(),
                Some(Value::Number(uid)) => uid.to_string(),
                _ => return None,
            }
        }
        Ok(_) => return None,
        Err(_) => raw.to_string(),
    };

    if tag_id.is_empty() {
        return None;
    }
    Some(ScanEvent { tag_id })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Success,
    Error,
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationResult {
    #[serde(rename = "type")]
    pub kind: OutcomeKind,
    #[serde(rename = "message")]
    pub text: String,
}

impl ConfirmationResult {
    pub fn new(kind: OutcomeKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Success, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Error, text)
    }

    pub fn message(text: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Message, text)
    }

    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Success
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessfulPayment {
    pub transaction_id: String,
    pub payer_name: String,
    pub amount: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Socket,
    Polling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn indicator(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "red",
            ConnectionState::Connecting => "amber",
            ConnectionState::Connected => "green",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: OutcomeKind,
    pub message: String,
    pub shown_at: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub mode: SessionMode,
    pub subject_id: String,
    pub multi_use: bool,
    pub transport: Transport,
    pub connection: ConnectionState,
    pub indicator: &'static str,
    pub in_flight: usize,
    pub navigate_to: Option<String>,
}
