//! In-memory stand-in for the remote authentication service.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

use crate::error::{FetchError, LoginError};
use crate::net::api::AuthApi;
use crate::net::types::{Identity, LoginPayload};

/// One scripted reply to `fetch_me`, optionally held until a permit is added.
pub(crate) struct MeStep {
    pub(crate) outcome: Result<Identity, FetchError>,
    pub(crate) hold: Option<Arc<Semaphore>>,
}

/// Fake server session store.
///
/// `fetch_me` answers from the script first, then from the current session.
/// `login` succeeds for known usernames and opens a session for them.
#[derive(Default)]
pub(crate) struct FakeAuthApi {
    session: Mutex<Option<Identity>>,
    users: Mutex<HashMap<String, Identity>>,
    me_script: Mutex<VecDeque<MeStep>>,
    login_script: Mutex<VecDeque<Result<(), LoginError>>>,
    login_hold: Mutex<Option<Arc<Semaphore>>>,
    me_calls: AtomicUsize,
    login_calls: AtomicUsize,
}

impl FakeAuthApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn signed_in(identity: Identity) -> Arc<Self> {
        let api = Self::default();
        *api.session.lock().unwrap() = Some(identity);
        Arc::new(api)
    }

    pub(crate) fn add_user(&self, identity: Identity) {
        self.users
            .lock()
            .unwrap()
            .insert(identity.name.clone(), identity);
    }

    pub(crate) fn push_me(&self, outcome: Result<Identity, FetchError>, hold: Option<Arc<Semaphore>>) {
        self.me_script
            .lock()
            .unwrap()
            .push_back(MeStep { outcome, hold });
    }

    pub(crate) fn push_login(&self, outcome: Result<(), LoginError>) {
        self.login_script.lock().unwrap().push_back(outcome);
    }

    pub(crate) fn hold_logins(&self, gate: Arc<Semaphore>) {
        *self.login_hold.lock().unwrap() = Some(gate);
    }

    pub(crate) fn me_calls(&self) -> usize {
        self.me_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AuthApi for FakeAuthApi {
    async fn fetch_me(&self) -> Result<Identity, FetchError> {
        self.me_calls.fetch_add(1, Ordering::SeqCst);
        let step = self.me_script.lock().unwrap().pop_front();
        match step {
            Some(MeStep { outcome, hold }) => {
                if let Some(gate) = hold {
                    gate.acquire().await.unwrap().forget();
                }
                outcome
            }
            None => {
                let session = self.session.lock().unwrap().clone();
                session.ok_or(FetchError::Unauthenticated { status: 401 })
            }
        }
    }

    async fn login(&self, payload: &LoginPayload) -> Result<(), LoginError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.login_hold.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        if let Some(outcome) = self.login_script.lock().unwrap().pop_front() {
            return outcome;
        }
        let user = self.users.lock().unwrap().get(&payload.username).cloned();
        match user {
            Some(identity) => {
                *self.session.lock().unwrap() = Some(identity);
                Ok(())
            }
            None => Err(LoginError::rejected(400, r#"{"message":"unknown username"}"#)),
        }
    }
}

/// Let spawned tasks run until `done` holds, bounded so a broken test fails
/// instead of hanging.
pub(crate) async fn run_until<F>(done: F)
where
    F: Fn() -> bool,
{
    for _ in 0..1000 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    assert!(done(), "condition not reached");
}

pub(crate) fn jeremie() -> Identity {
    Identity { id: 1, name: "Jeremie".to_owned() }
}
