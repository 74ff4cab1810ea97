use thiserror::Error;

/// Failures surfaced by the marquee overlay.
///
/// None of these are fatal to the host application. Activation failures are
/// logged and dropped; everything else leaves the overlay open and retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarqueeError {
    /// The activation named a node the host no longer knows about.
    #[error("no live node for id {node_id}")]
    ActivationUnresolvable { node_id: String },
    /// Network failure or a non-success status the server did not explain.
    #[error("transport failure: {message}")]
    TransportFailure { message: String },
    /// The server refused the node/token correlation or the payload.
    #[error("server rejected request (http {status}): {message}")]
    ProtocolReject { status: u16, message: String },
    #[error("invalid preview image: {0}")]
    InvalidImage(String),
    #[error("failed to encode request: {0}")]
    Encode(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl MarqueeError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::TransportFailure {
            message: message.into(),
        }
    }

    /// Classify a non-success HTTP status.
    ///
    /// 4xx means the server looked at the request and refused it; anything
    /// else is indistinguishable from the server being unavailable.
    pub fn from_status(status: u16, body: &str) -> Self {
        let body = body.trim();
        if (400..500).contains(&status) {
            let message = if body.is_empty() {
                format!("http status {status}")
            } else {
                body.to_string()
            };
            return Self::ProtocolReject { status, message };
        }
        let message = if body.is_empty() {
            format!("http status {status}")
        } else {
            format!("http status {status}: {body}")
        };
        Self::TransportFailure { message }
    }

    /// Whether the overlay should keep the session open for another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransportFailure { .. } | Self::ProtocolReject { .. } | Self::Encode(_)
        )
    }
}
