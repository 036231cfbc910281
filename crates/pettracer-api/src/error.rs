use thiserror::Error;

/// Error type raised by any [`DeviceSource`](crate::DeviceSource) implementation.
///
/// Covers the failure modes of the vendor API surface: credential
/// rejection, transport trouble, and malformed payloads.
/// `pettracer-core` classifies these into fatal vs. retryable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected (wrong credentials, account locked, token revoked).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// Connection refused, DNS failure, TLS trouble, reset mid-request.
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Non-success HTTP status from the vendor API.
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// Response body could not be decoded.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String },

    /// Anything the client could not classify.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Returns `true` if the credentials were rejected and only
    /// re-authentication by the user can resolve it.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if retrying on the next poll may succeed.
    ///
    /// Everything that is not an authentication failure is retryable
    /// during steady-state polling.
    pub fn is_transient(&self) -> bool {
        !self.is_auth()
    }

    /// Returns `true` for network-level trouble (as opposed to a bad
    /// payload or an unclassified failure).
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Timeout { .. } | Self::Server { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Deserialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_is_not_transient() {
        let err = Error::Authentication {
            message: "bad password".into(),
        };
        assert!(err.is_auth());
        assert!(!err.is_transient());
        assert!(!err.is_connection());
    }

    #[test]
    fn transport_family_is_transient() {
        for err in [
            Error::Transport {
                message: "refused".into(),
            },
            Error::Timeout { timeout_secs: 10 },
            Error::Server {
                status: 502,
                message: "bad gateway".into(),
            },
        ] {
            assert!(err.is_transient(), "{err}");
            assert!(err.is_connection(), "{err}");
        }
    }

    #[test]
    fn unexpected_is_transient_but_not_connection() {
        let err = Error::Unexpected("boom".into());
        assert!(err.is_transient());
        assert!(!err.is_connection());
    }
}
