// ── Core error types ──
//
// `UpdateFailure` describes one failed refresh cycle and is handed to
// observers, so it is cheap to clone. `CoreError` covers misuse of the
// coordinator lifecycle. `SetupError` is what the host sees when an
// account cannot be brought online; each variant maps to a reason code.

use thiserror::Error;

/// How a refresh cycle failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    /// Credentials rejected. Polling stops until the account is set up again.
    Auth,
    /// Network trouble, timeout, server error, bad payload. Retried on the next tick.
    Transient,
    /// The coordinator was stopped before or during the cycle.
    Stopped,
}

/// Failure of a single refresh cycle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} failure: {message}")]
pub struct UpdateFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl UpdateFailure {
    pub fn is_auth(&self) -> bool {
        self.kind == FailureKind::Auth
    }

    pub fn is_transient(&self) -> bool {
        self.kind == FailureKind::Transient
    }

    pub(crate) fn stopped() -> Self {
        Self {
            kind: FailureKind::Stopped,
            message: "coordinator stopped".into(),
        }
    }
}

impl From<pettracer_api::Error> for UpdateFailure {
    fn from(err: pettracer_api::Error) -> Self {
        let kind = if err.is_auth() {
            FailureKind::Auth
        } else {
            FailureKind::Transient
        };
        Self {
            kind,
            message: format!("Error communicating with petTracer API: {err}"),
        }
    }
}

/// Errors from driving the coordinator lifecycle.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Poll interval must be greater than zero")]
    InvalidInterval,

    #[error("Refresh schedule is already running")]
    ScheduleAlreadyRunning,

    #[error("Coordinator is stopped")]
    Stopped,

    #[error(transparent)]
    Update(#[from] UpdateFailure),
}

// ── Setup ───────────────────────────────────────────────────────────

/// Reason code surfaced to the host when setup is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ReasonCode {
    CannotConnect,
    InvalidAuth,
    AlreadyConfigured,
    Unknown,
}

/// Why an account could not be validated or brought online.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SetupError {
    // ── Credential validation ────────────────────────────────────────
    #[error("Invalid credentials: {message}")]
    InvalidAuth { message: String },

    #[error("Cannot connect to petTracer: {message}")]
    CannotConnect { message: String },

    #[error("No devices found for this account")]
    NoDevices,

    #[error("Account '{account}' is already configured")]
    AlreadyConfigured { account: String },

    // ── Account setup ────────────────────────────────────────────────
    /// Permanent: the user has to re-enter credentials.
    #[error("Authentication failed, reconfiguration required: {message}")]
    AuthFailed { message: String },

    /// Temporary: the host should retry setup later.
    #[error("petTracer is temporarily unavailable: {message}")]
    NotReady { message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Unexpected error: {message}")]
    Unknown { message: String },
}

impl SetupError {
    pub fn reason_code(&self) -> ReasonCode {
        match self {
            Self::InvalidAuth { .. } | Self::AuthFailed { .. } => ReasonCode::InvalidAuth,
            Self::CannotConnect { .. } | Self::NoDevices | Self::NotReady { .. } => {
                ReasonCode::CannotConnect
            }
            Self::AlreadyConfigured { .. } => ReasonCode::AlreadyConfigured,
            Self::InvalidConfig { .. } | Self::Unknown { .. } => ReasonCode::Unknown,
        }
    }

    /// The host must block loading and ask for new credentials.
    pub fn needs_reauth(&self) -> bool {
        matches!(self, Self::InvalidAuth { .. } | Self::AuthFailed { .. })
    }

    /// The host may retry setup later without user involvement.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CannotConnect { .. } | Self::NotReady { .. })
    }

    /// Classify a failure of the interactive credential check. Anything
    /// that is not a credential rejection reads as "cannot connect".
    pub(crate) fn from_validation(err: &pettracer_api::Error) -> Self {
        let message = err.to_string();
        if err.is_auth() {
            Self::InvalidAuth { message }
        } else {
            Self::CannotConnect { message }
        }
    }

    /// Classify a failure while bringing a stored account online.
    pub(crate) fn from_setup(err: &pettracer_api::Error) -> Self {
        let message = err.to_string();
        if err.is_auth() {
            Self::AuthFailed { message }
        } else {
            Self::NotReady { message }
        }
    }
}

impl From<UpdateFailure> for SetupError {
    fn from(failure: UpdateFailure) -> Self {
        match failure.kind {
            FailureKind::Auth => Self::AuthFailed {
                message: failure.message,
            },
            FailureKind::Transient | FailureKind::Stopped => Self::NotReady {
                message: failure.message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pettracer_api::Error as ApiError;

    #[test]
    fn api_errors_classify_into_failure_kinds() {
        let auth = UpdateFailure::from(ApiError::Authentication {
            message: "nope".into(),
        });
        assert_eq!(auth.kind, FailureKind::Auth);

        let timeout = UpdateFailure::from(ApiError::Timeout { timeout_secs: 10 });
        assert_eq!(timeout.kind, FailureKind::Transient);

        let weird = UpdateFailure::from(ApiError::Unexpected("boom".into()));
        assert!(weird.is_transient());
    }

    #[test]
    fn reason_codes_render_snake_case() {
        assert_eq!(ReasonCode::CannotConnect.to_string(), "cannot_connect");
        assert_eq!(ReasonCode::InvalidAuth.as_ref(), "invalid_auth");
        assert_eq!("unknown".parse::<ReasonCode>().ok(), Some(ReasonCode::Unknown));
    }

    #[test]
    fn validation_errors_map_to_reason_codes() {
        let auth = SetupError::from_validation(&ApiError::Authentication {
            message: "bad".into(),
        });
        assert_eq!(auth.reason_code(), ReasonCode::InvalidAuth);
        assert!(auth.needs_reauth());

        let net = SetupError::from_validation(&ApiError::Transport {
            message: "refused".into(),
        });
        assert_eq!(net.reason_code(), ReasonCode::CannotConnect);
        assert!(net.is_retryable());

        let other = SetupError::from_validation(&ApiError::Unexpected("?".into()));
        assert_eq!(other.reason_code(), ReasonCode::CannotConnect);
        assert!(other.is_retryable());

        assert_eq!(SetupError::NoDevices.reason_code(), ReasonCode::CannotConnect);
    }

    #[test]
    fn setup_errors_split_reauth_from_retry() {
        let auth = SetupError::from_setup(&ApiError::Authentication {
            message: "bad".into(),
        });
        assert!(matches!(auth, SetupError::AuthFailed { .. }));
        assert!(auth.needs_reauth());
        assert!(!auth.is_retryable());

        let unexpected = SetupError::from_setup(&ApiError::Unexpected("?".into()));
        assert!(matches!(unexpected, SetupError::NotReady { .. }));
        assert!(unexpected.is_retryable());
    }
}
