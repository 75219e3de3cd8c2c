//! Error types for event source and authentication operations.
//!
//! Remote failures are classified by [`ProviderErrorCode`] so that callers
//! can single out the few conditions they handle (a missing calendar) and
//! report everything else verbatim.

use std::fmt;
use thiserror::Error;

/// The category of a provider error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// The token endpoint or the API rejected our credentials.
    AuthenticationFailed,
    /// The user did not grant access, or the calendar is not shared with them.
    AuthorizationFailed,
    /// Connection failure, timeout, DNS.
    NetworkError,
    /// HTTP 429.
    RateLimited,
    /// 5xx or any other status we do not classify.
    ServerError,
    /// The body could not be parsed.
    InvalidResponse,
    /// HTTP 404, or a local file that does not exist.
    NotFound,
    /// HTTP 400.
    BadRequest,
    /// Unusable client secret file, token cache or settings.
    ConfigurationError,
    InternalError,
}

impl ProviderErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::AuthorizationFailed => "authorization_failed",
            Self::NetworkError => "network_error",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error raised while authenticating or fetching events.
#[derive(Debug, Error)]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    /// Backend that raised the error (e.g. "google").
    provider: Option<String>,
    /// HTTP status of the response that produced this error.
    status: Option<u16>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

macro_rules! constructors {
    ($($name:ident => $code:ident),* $(,)?) => {
        $(
            pub fn $name(message: impl Into<String>) -> Self {
                Self::new(ProviderErrorCode::$code, message)
            }
        )*
    };
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider: None,
            status: None,
            source: None,
        }
    }

    constructors! {
        authentication => AuthenticationFailed,
        authorization => AuthorizationFailed,
        network => NetworkError,
        rate_limited => RateLimited,
        server => ServerError,
        invalid_response => InvalidResponse,
        not_found => NotFound,
        bad_request => BadRequest,
        configuration => ConfigurationError,
        internal => InternalError,
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_not_found(&self) -> bool {
        self.code == ProviderErrorCode::NotFound
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{provider}] ")?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_code() {
        let err = ProviderError::authentication("token expired");
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert_eq!(err.message(), "token expired");
        assert!(err.provider().is_none());
        assert!(err.status().is_none());
        assert!(!err.is_not_found());

        assert_eq!(
            ProviderError::bad_request("x").code(),
            ProviderErrorCode::BadRequest
        );
    }

    #[test]
    fn not_found_keeps_context() {
        let err = ProviderError::not_found("calendar missing")
            .with_provider("google")
            .with_status(404);
        assert!(err.is_not_found());
        assert_eq!(err.provider(), Some("google"));
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn display_is_tagged_with_provider() {
        let err = ProviderError::rate_limited("too many requests").with_provider("google");
        assert_eq!(err.to_string(), "[google] rate_limited: too many requests");

        let bare = ProviderError::configuration("no client_id");
        assert_eq!(bare.to_string(), "configuration_error: no client_id");
    }

    #[test]
    fn source_is_chained() {
        use std::error::Error;
        let io_err = std::io::Error::other("disk full");
        let err = ProviderError::configuration("failed to write token cache").with_source(io_err);
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("disk full"));
    }
}
