// ── Device source contract ──
//
// The single seam between the polling core and whatever talks to the
// vendor cloud. Implementations own their HTTP session; the core only
// asks for it to be closed on teardown.

use std::future::Future;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::Error;
use crate::models::RawDevice;

/// Asynchronous access to one petTracer account.
///
/// Futures must be `Send` so the coordinator can drive them from a
/// spawned schedule task.
pub trait DeviceSource: Send + Sync + 'static {
    /// Log in with the account credentials, giving up after `timeout`.
    fn authenticate(
        &self,
        username: &str,
        password: &SecretString,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    /// Fetch every collar registered to the logged-in account.
    fn fetch_all_devices(&self) -> impl Future<Output = Result<Vec<RawDevice>, Error>> + Send;

    /// Release the underlying network session. Called at most once.
    fn close(&self) -> impl Future<Output = ()> + Send {
        std::future::ready(())
    }
}
