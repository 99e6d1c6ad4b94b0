use crate::errors::ConsoleError;
use crate::models::{Session, SessionMode, Transport};
use std::{env, str::FromStr, time::Duration};

pub const DEFAULT_SCANNER_URL: &str = "ws://localhost:12345";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_REDIRECT_LOCATION: &str = "/admin/createPaymentRequest";
pub const DEFAULT_PORT: u16 = 8090;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    pub header: String,
    pub token: String,
}

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub session: Session,
    pub transport: Transport,
    pub scanner_url: String,
    pub api_base_url: String,
    pub csrf: Option<CsrfToken>,
    pub session_cookie: Option<String>,
    pub notification_ttl: Duration,
    pub redirect_delay: Duration,
    pub redirect_location: String,
    pub poll_interval: Duration,
    pub port: u16,
}

impl ConsoleConfig {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            transport: Transport::Socket,
            scanner_url: DEFAULT_SCANNER_URL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            csrf: None,
            session_cookie: None,
            notification_ttl: Duration::from_secs(5),
            redirect_delay: Duration::from_secs(5),
            redirect_location: DEFAULT_REDIRECT_LOCATION.to_string(),
            poll_interval: Duration::from_secs(5),
            port: DEFAULT_PORT,
        }
    }

    pub fn from_env() -> Result<Self, ConsoleError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConsoleError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mode = match get("RFID_CONSOLE_MODE").as_deref().map(str::trim) {
            None | Some("payment") => SessionMode::Payment,
            Some("user-registration") | Some("user") => SessionMode::UserRegistration,
            Some(other) => {
                return Err(ConsoleError::config(format!(
                    "RFID_CONSOLE_MODE must be 'payment' or 'user-registration', got '{other}'"
                )));
            }
        };

        let subject_id = get("RFID_CONSOLE_SUBJECT_ID")
            .map(|value| value.trim().to_string())
            .ok_or_else(|| ConsoleError::config("RFID_CONSOLE_SUBJECT_ID is not set"))?;

        let multi_use = parse_or(&get, "RFID_CONSOLE_MULTI_USE", false)?;
        let session = match mode {
            SessionMode::Payment => Session::payment(subject_id, multi_use),
            SessionMode::UserRegistration => Session::registration(subject_id),
        };

        let transport = match get("RFID_CONSOLE_TRANSPORT").as_deref().map(str::trim) {
            None | Some("socket") => Transport::Socket,
            Some("polling") => Transport::Polling,
            Some(other) => {
                return Err(ConsoleError::config(format!(
                    "RFID_CONSOLE_TRANSPORT must be 'socket' or 'polling', got '{other}'"
                )));
            }
        };
        if transport == Transport::Polling && mode != SessionMode::Payment {
            return Err(ConsoleError::config(
                "polling transport is only available for payment consoles",
            ));
        }

        let mut config = Self::new(session);
        config.transport = transport;
        if let Some(url) = get("RFID_SCANNER_URL") {
            config.scanner_url = url;
        }
        if let Some(url) = get("RFID_API_BASE_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        config.csrf = match (get("RFID_CSRF_HEADER"), get("RFID_CSRF_TOKEN")) {
            (Some(header), Some(token)) => Some(CsrfToken { header, token }),
            _ => None,
        };
        config.session_cookie = get("RFID_SESSION_COOKIE");
        config.notification_ttl = millis_or(&get, "RFID_NOTIFICATION_TTL_MS", config.notification_ttl)?;
        config.redirect_delay = millis_or(&get, "RFID_REDIRECT_DELAY_MS", config.redirect_delay)?;
        config.poll_interval = millis_or(&get, "RFID_POLL_INTERVAL_MS", config.poll_interval)?;
        if config.poll_interval.is_zero() {
            return Err(ConsoleError::config("RFID_POLL_INTERVAL_MS must be positive"));
        }
        if let Some(location) = get("RFID_REDIRECT_LOCATION") {
            config.redirect_location = location;
        }
        config.port = parse_or(&get, "PORT", DEFAULT_PORT)?;

        Ok(config)
    }

    pub fn redirect_target(&self) -> String {
        if self.redirect_location.starts_with("http://") || self.redirect_location.starts_with("https://") {
            return self.redirect_location.clone();
        }
        format!("{}{}", self.api_base_url, self.redirect_location)
    }
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> Result<T, ConsoleError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(key) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConsoleError::config(format!("{key} has an invalid value '{value}'"))),
        None => Ok(default),
    }
}

fn millis_or<G>(get: &G, key: &str, default: Duration) -> Result<Duration, ConsoleError>
where
    G: Fn(&str) -> Option<String>,
{
    let millis = parse_or(get, key, default.as_millis() as u64)?;
    Ok(Duration::from_millis(millis))
}
