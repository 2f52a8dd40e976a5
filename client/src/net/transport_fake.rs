//! Scripted cookie transport shared by bridge and manager tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use session::SessionPayload;
use session::cookies::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE, ROLE_COOKIE};
use tokio::sync::Semaphore;

use super::{BridgeError, CookieTransport};

// =============================================================================
// FAKE TRANSPORT
// =============================================================================

/// Records calls, keeps a cookie map, and holds each request until the test
/// hands out a permit.
pub struct FakeTransport {
    gate: Semaphore,
    set_calls: AtomicUsize,
    clear_calls: AtomicUsize,
    log: Mutex<Vec<&'static str>>,
    set_failures: Mutex<VecDeque<BridgeError>>,
    clear_failures: Mutex<VecDeque<BridgeError>>,
    cookies: Mutex<HashMap<&'static str, String>>,
}

impl FakeTransport {
    pub fn open() -> Self {
        Self::with_permits(Semaphore::MAX_PERMITS)
    }

    pub fn gated() -> Self {
        Self::with_permits(0)
    }

    fn with_permits(permits: usize) -> Self {
        Self {
            gate: Semaphore::new(permits),
            set_calls: AtomicUsize::new(0),
            clear_calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
            set_failures: Mutex::new(VecDeque::new()),
            clear_failures: Mutex::new(VecDeque::new()),
            cookies: Mutex::new(HashMap::new()),
        }
    }

    pub fn release(&self, permits: usize) {
        self.gate.add_permits(permits);
    }

    pub fn fail_next_set(&self) {
        self.set_failures
            .lock()
            .unwrap()
            .push_back(BridgeError::Request("connection reset".into()));
    }

    pub fn fail_next_clear(&self) {
        self.clear_failures
            .lock()
            .unwrap()
            .push_back(BridgeError::Status { status: 502 });
    }

    pub fn sets(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    pub fn clears(&self) -> usize {
        self.clear_calls.load(Ordering::SeqCst)
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.lock().unwrap().get(name).cloned()
    }

    pub fn log(&self) -> Vec<&'static str> {
        self.log.lock().unwrap().clone()
    }

    async fn pass_gate(&self) {
        self.gate.acquire().await.unwrap().forget();
    }
}

#[async_trait::async_trait]
impl CookieTransport for FakeTransport {
    async fn set_cookies(&self, payload: &SessionPayload) -> Result<(), BridgeError> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;
        self.log.lock().unwrap().push("set");
        if let Some(err) = self.set_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        let mut cookies = self.cookies.lock().unwrap();
        let access_token = payload.access_token.as_ref().filter(|t| !t.is_empty());
        if let Some(token) = access_token {
            cookies.insert(ACCESS_TOKEN_COOKIE, token.clone());
        }
        if let Some(token) = payload.refresh_token.as_ref().filter(|t| !t.is_empty()) {
            cookies.insert(REFRESH_TOKEN_COOKIE, token.clone());
        }
        match payload.role {
            Some(role) => {
                cookies.insert(ROLE_COOKIE, role.to_string());
            }
            // Same rule as the server: a new access token without a role
            // expires the previous role cookie.
            None if access_token.is_some() => {
                cookies.remove(ROLE_COOKIE);
            }
            None => {}
        }
        Ok(())
    }

    async fn clear_cookies(&self) -> Result<(), BridgeError> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;
        self.log.lock().unwrap().push("clear");
        if let Some(err) = self.clear_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.cookies.lock().unwrap().clear();
        Ok(())
    }

    fn discard_local(&self) {
        self.cookies.lock().unwrap().clear();
    }
}
