use thiserror::Error;

/// Domain-level errors shared across application components.
#[derive(Debug, Error)]
pub enum PortalError {
    /// The incoming payload missed a required field or violated invariants.
    #[error("validation error: {0}")]
    Validation(String),

    /// A staged icon declared a media type other than PNG.
    #[error("unsupported icon type: expected image/png, got {0}")]
    InvalidFileType(String),

    /// Credentials were rejected, the session is missing, or the API returned 401/403.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The request never produced an HTTP response (DNS, connect, timeout).
    #[error("network failure: {0}")]
    Network(String),

    /// The API answered with a non-success status.
    #[error("http {status}: {message}")]
    Http { status: u16, message: String },

    /// Local persistence (settings store, preview cache) failed.
    #[error("storage failure: {0}")]
    Storage(String),

    /// Remote data violated a structural bound we refuse to render.
    #[error("data integrity: {0}")]
    DataIntegrity(String),

    /// The response lost a generation race and must be dropped, not displayed.
    #[error("request superseded by an endpoint change")]
    Superseded,

    /// Any other unexpected failure.
    #[error("unexpected error: {0}")]
    Other(String),
}

impl PortalError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn data_integrity(msg: impl Into<String>) -> Self {
        Self::DataIntegrity(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Whether the failure came from the login/session path rather than transport.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::Http { status: 401, .. } | Self::Http { status: 403, .. })
    }
}
