// ── Account setup and teardown ──
//
// Credential validation for the interactive add-account flow, and the
// load/unload lifecycle of a stored account. Both classify failures so
// the host can tell "ask for new credentials" from "try again later".

use std::time::Duration;

use tracing::{debug, error, info, warn};

use pettracer_api::{DeviceSource, RawDevice};

use crate::config::{CoordinatorConfig, Credentials};
use crate::coordinator::Coordinator;
use crate::error::SetupError;
use crate::registry::{AccountId, Registry};

/// Login timeout used while validating credentials interactively.
pub const VALIDATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of a successful credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub account: AccountId,
    /// Display title for the account (the username as entered).
    pub title: String,
    pub collar_ids: Vec<String>,
    pub device_count: usize,
}

/// Check that `credentials` can log in and see at least one collar.
///
/// `source` is a throwaway session: it is closed before returning,
/// whatever the outcome. Rejects accounts already in `registry`.
pub async fn validate_credentials<S: DeviceSource>(
    registry: &Registry<S>,
    source: S,
    credentials: &Credentials,
    timeout: Duration,
) -> Result<AccountInfo, SetupError> {
    let result = probe_account(&source, credentials, timeout).await;
    source.close().await;

    let info = result?;
    if registry.contains(&info.account) {
        return Err(SetupError::AlreadyConfigured {
            account: info.account.to_string(),
        });
    }
    Ok(info)
}

/// Log in, then fetch once to prove the session works.
async fn login_and_probe<S: DeviceSource>(
    source: &S,
    credentials: &Credentials,
    timeout: Duration,
) -> Result<Vec<RawDevice>, pettracer_api::Error> {
    source
        .authenticate(&credentials.username, &credentials.password, timeout)
        .await?;
    source.fetch_all_devices().await
}

async fn probe_account<S: DeviceSource>(
    source: &S,
    credentials: &Credentials,
    timeout: Duration,
) -> Result<AccountInfo, SetupError> {
    debug!(username = %credentials.username, "validating credentials");

    let devices = login_and_probe(source, credentials, timeout)
        .await
        .map_err(|e| {
            error!(error = %e, "credential validation failed");
            SetupError::from_validation(&e)
        })?;

    let collar_ids: Vec<String> = devices
        .into_iter()
        .filter_map(|d| d.id)
        .filter(|id| !id.is_empty())
        .collect();

    if collar_ids.is_empty() {
        warn!(username = %credentials.username, "no collars found for account");
        return Err(SetupError::NoDevices);
    }

    debug!(device_count = collar_ids.len(), "credentials validated");
    Ok(AccountInfo {
        account: AccountId::from_username(&credentials.username),
        title: credentials.username.clone(),
        device_count: collar_ids.len(),
        collar_ids,
    })
}

/// Bring a stored account online.
///
/// Logs in, probes the device list, runs the mandatory first refresh,
/// registers the coordinator, and only then starts the schedule. On any
/// failure the source is closed and no timer is left running.
pub async fn setup_account<S: DeviceSource>(
    registry: &Registry<S>,
    source: S,
    credentials: &Credentials,
    config: CoordinatorConfig,
) -> Result<Coordinator<S>, SetupError> {
    let account = AccountId::from_username(&credentials.username);
    if registry.contains(&account) {
        source.close().await;
        return Err(SetupError::AlreadyConfigured {
            account: account.to_string(),
        });
    }
    if config.poll_interval.is_zero() {
        source.close().await;
        return Err(SetupError::InvalidConfig {
            message: "poll interval must be greater than zero".into(),
        });
    }

    info!(account = %account, "setting up petTracer account");

    if let Err(e) = login_and_probe(&source, credentials, config.login_timeout).await {
        let err = SetupError::from_setup(&e);
        if err.needs_reauth() {
            error!(account = %account, error = %e, "authentication failed");
        } else {
            warn!(account = %account, error = %e, "petTracer unavailable, setup deferred");
        }
        source.close().await;
        return Err(err);
    }

    let poll_interval = config.poll_interval;
    let coordinator = Coordinator::new(source, config);

    debug!(account = %account, "performing first refresh");
    if let Err(failure) = coordinator.refresh_now().await {
        warn!(account = %account, error = %failure, "first refresh failed");
        coordinator.stop().await;
        return Err(failure.into());
    }

    if let Err(e) = registry.insert(account.clone(), coordinator.clone()) {
        coordinator.stop().await;
        return Err(e);
    }

    if let Err(e) = coordinator.start(poll_interval).await {
        registry.remove(&account);
        coordinator.stop().await;
        return Err(SetupError::Unknown {
            message: e.to_string(),
        });
    }

    info!(
        account = %account,
        device_count = coordinator.current_snapshot().len(),
        "petTracer account ready"
    );
    Ok(coordinator)
}

/// Remove an account from `registry` and stop its coordinator.
///
/// Returns `false` if the account was not loaded.
pub async fn unload_account<S: DeviceSource>(registry: &Registry<S>, account: &AccountId) -> bool {
    let Some(coordinator) = registry.remove(account) else {
        debug!(account = %account, "unload requested for unknown account");
        return false;
    };
    coordinator.stop().await;
    info!(account = %account, "petTracer account unloaded");
    true
}
