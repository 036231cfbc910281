#![allow(clippy::unwrap_used, dead_code)]
// Scripted `DeviceSource` shared by the integration tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::Notify;

use pettracer_api::{DeviceSource, Error, RawDevice};

type FetchResult = Result<Vec<RawDevice>, Error>;

/// Plays back canned responses in order. The last response repeats once
/// the script runs out; an empty script answers with an empty list.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    state: Arc<State>,
}

#[derive(Default)]
struct State {
    responses: Mutex<VecDeque<FetchResult>>,
    login_error: Mutex<Option<Error>>,
    login_timeouts: Mutex<Vec<Duration>>,
    gate: Mutex<Option<Arc<Notify>>>,
    fetch_started: Notify,
    fetch_calls: AtomicUsize,
    login_calls: AtomicUsize,
    close_calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_ok(self, devices: Vec<RawDevice>) -> Self {
        self.push(Ok(devices));
        self
    }

    pub fn then_err(self, err: Error) -> Self {
        self.push(Err(err));
        self
    }

    pub fn failing_login(self, err: Error) -> Self {
        *self.state.login_error.lock().unwrap() = Some(err);
        self
    }

    pub fn push(&self, response: FetchResult) {
        self.state.responses.lock().unwrap().push_back(response);
    }

    /// Hold every fetch until the returned gate is notified.
    pub fn gate(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.state.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Let later fetches through without waiting.
    pub fn ungate(&self) {
        self.state.gate.lock().unwrap().take();
    }

    /// Resolves once a fetch has been entered.
    pub async fn fetch_started(&self) {
        self.state.fetch_started.notified().await;
    }

    pub fn fetch_calls(&self) -> usize {
        self.state.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn login_calls(&self) -> usize {
        self.state.login_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.state.close_calls.load(Ordering::SeqCst)
    }

    pub fn login_timeouts(&self) -> Vec<Duration> {
        self.state.login_timeouts.lock().unwrap().clone()
    }

    fn next_response(&self) -> FetchResult {
        let mut responses = self.state.responses.lock().unwrap();
        if responses.len() > 1 {
            responses.pop_front().unwrap()
        } else {
            responses.front().cloned().unwrap_or_else(|| Ok(Vec::new()))
        }
    }
}

impl DeviceSource for ScriptedSource {
    async fn authenticate(
        &self,
        _username: &str,
        _password: &SecretString,
        timeout: Duration,
    ) -> Result<(), Error> {
        self.state.login_calls.fetch_add(1, Ordering::SeqCst);
        self.state.login_timeouts.lock().unwrap().push(timeout);
        match self.state.login_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn fetch_all_devices(&self) -> Result<Vec<RawDevice>, Error> {
        self.state.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.state.fetch_started.notify_one();

        let gate = self.state.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.next_response()
    }

    async fn close(&self) {
        self.state.close_calls.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

pub fn collar(id: &str, millivolts: i32) -> RawDevice {
    RawDevice {
        id: Some(id.into()),
        bat: Some(millivolts),
        ..RawDevice::default()
    }
}

pub fn transport_error() -> Error {
    Error::Transport {
        message: "connection reset".into(),
    }
}

pub fn auth_error() -> Error {
    Error::Authentication {
        message: "invalid credentials".into(),
    }
}
