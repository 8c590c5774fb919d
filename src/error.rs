use std::fmt;

use serde::Deserialize;

// =========================================================
// Error status
// =========================================================

/// What went wrong, independent of where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorStatus {
    /// 401 from the backend
    Unauthorized,
    /// 422: structured field errors from the backend
    Validation,
    /// Any other non-2xx backend answer
    Api,
    /// Transport failure (unreachable, timeout, TLS)
    Network,
    /// JSON encode/decode failure
    Serialization,
    /// Persisted key I/O failure
    Storage,
    /// Client-side validation; nothing was sent
    InvalidInput,
}

impl ClientErrorStatus {
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientErrorStatus::Unauthorized => "UNAUTHORIZED",
            ClientErrorStatus::Validation => "VALIDATION_FAILED",
            ClientErrorStatus::Api => "API_ERROR",
            ClientErrorStatus::Network => "NETWORK_ERROR",
            ClientErrorStatus::Serialization => "JSON_PARSE_ERROR",
            ClientErrorStatus::Storage => "STORAGE_ERROR",
            ClientErrorStatus::InvalidInput => "INVALID_INPUT",
        }
    }
}

// =========================================================
// Error spans
// =========================================================

/// One breadcrumb of the operation chain that produced an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSpan {
    /// e.g. "api.send", "session.restore"
    pub operation: String,
    pub detail: Option<String>,
}

impl ErrorSpan {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            detail: None,
        }
    }

    pub fn with_detail(operation: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            detail: Some(detail.into()),
        }
    }
}

// =========================================================
// Client error
// =========================================================

#[derive(Debug)]
pub struct ClientError {
    pub status: ClientErrorStatus,
    pub message: String,
    /// HTTP status when the error came from a backend response
    pub http_status: Option<u16>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
    spans: Vec<ErrorSpan>,
}

impl ClientError {
    pub fn new(status: ClientErrorStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            http_status: None,
            source: None,
            spans: Vec::new(),
        }
    }

    // --- Convenience constructors ---

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ClientErrorStatus::Unauthorized, message).with_http_status(401)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ClientErrorStatus::Validation, message).with_http_status(422)
    }

    pub fn api(http_status: u16, message: impl Into<String>) -> Self {
        Self::new(ClientErrorStatus::Api, message).with_http_status(http_status)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ClientErrorStatus::Network, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ClientErrorStatus::Serialization, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ClientErrorStatus::Storage, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ClientErrorStatus::InvalidInput, message)
    }

    /// Maps a non-2xx backend answer onto a status, keeping the payload's message.
    pub fn from_response(http_status: u16, body: &str) -> Self {
        let message = extract_error_message(body, &format!("Request failed with status {http_status}"));
        match http_status {
            401 => Self::unauthorized(message),
            422 => Self::validation(message),
            code => Self::api(code, message),
        }
    }

    // --- Context builders ---

    pub fn in_op(mut self, operation: impl Into<String>) -> Self {
        self.spans.push(ErrorSpan::new(operation));
        self
    }

    pub fn in_op_with(mut self, operation: impl Into<String>, detail: impl Into<String>) -> Self {
        self.spans.push(ErrorSpan::with_detail(operation, detail));
        self
    }

    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn with_http_status(mut self, http_status: u16) -> Self {
        self.http_status = Some(http_status);
        self
    }

    // --- Accessors ---

    pub fn error_code(&self) -> &'static str {
        self.status.error_code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn spans(&self) -> &[ErrorSpan] {
        &self.spans
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == ClientErrorStatus::Unauthorized
    }

    /// Text suitable for an alert. Transport and decoding failures are not
    /// meaningful to a user, so they get the caller's fallback instead.
    pub fn user_message(&self, default: &str) -> String {
        match self.status {
            ClientErrorStatus::Network
            | ClientErrorStatus::Serialization
            | ClientErrorStatus::Storage => default.to_string(),
            _ if self.message.is_empty() => default.to_string(),
            _ => self.message.clone(),
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.error_code(), self.message)?;

        if !self.spans.is_empty() {
            write!(f, " | trace: ")?;
            for (i, span) in self.spans.iter().enumerate() {
                if i > 0 {
                    write!(f, " -> ")?;
                }
                write!(f, "{}", span.operation)?;
                if let Some(detail) = &span.detail {
                    write!(f, "({})", detail)?;
                }
            }
        }
        Ok(())
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

// =========================================================
// Conversions
// =========================================================

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::serialization(e.to_string()).with_source(e)
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::storage(e.to_string()).with_source(e)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::network(e.to_string()).with_source(e)
    }
}

// =========================================================
// Backend error payloads
// =========================================================

#[derive(Deserialize)]
struct ErrorPayload {
    detail: Option<ErrorDetail>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Text(String),
    Fields(Vec<FieldError>),
}

#[derive(Deserialize)]
struct FieldError {
    #[serde(default)]
    loc: Vec<serde_json::Value>,
    msg: String,
}

impl FieldError {
    fn render(&self) -> String {
        match self.loc.last() {
            Some(serde_json::Value::String(field)) => format!("{}: {}", field, self.msg),
            Some(serde_json::Value::Number(index)) => format!("{}: {}", index, self.msg),
            _ => self.msg.clone(),
        }
    }
}

/// Human-readable text from an error body: a plain `detail` string, or one
/// `field: message` line per structured field error. Anything else yields `default`.
pub fn extract_error_message(body: &str, default: &str) -> String {
    let Ok(payload) = serde_json::from_str::<ErrorPayload>(body) else {
        return default.to_string();
    };
    match payload.detail {
        Some(ErrorDetail::Text(text)) if !text.trim().is_empty() => text,
        Some(ErrorDetail::Fields(fields)) if !fields.is_empty() => fields
            .iter()
            .map(FieldError::render)
            .collect::<Vec<_>>()
            .join("\n"),
        _ => default.to_string(),
    }
}
