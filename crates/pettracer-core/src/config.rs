// ── Runtime coordinator configuration ──
//
// Describes *how* to poll one account. Never touches disk: loading
// lives in `pettracer-config`, which hands a finished value in.

use std::time::Duration;

use secrecy::SecretString;

/// Account credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Polling configuration for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Name used in log output.
    pub name: String,
    /// Fixed delay between refresh cycles. Doubles as the retry delay
    /// after a transient failure.
    pub poll_interval: Duration,
    /// Timeout handed to the login call during setup.
    pub login_timeout: Duration,
}

impl CoordinatorConfig {
    /// Slower preset matching the YAML-configured variant of the
    /// integration (5 minute poll, 30 second login timeout).
    pub fn legacy_yaml() -> Self {
        Self {
            name: "pettracer_yaml".into(),
            poll_interval: Duration::from_secs(300),
            login_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            name: "pettracer".into(),
            poll_interval: Duration::from_secs(60),
            login_timeout: Duration::from_secs(10),
        }
    }
}
