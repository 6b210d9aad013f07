//! Login mutation controller.
//!
//! Concurrent `submit` calls are allowed and are not coordinated: each one
//! issues its own request and resets `loading` when it settles, so an early
//! settle can clear `loading` while a later attempt is still in flight.

#[cfg(test)]
#[path = "login_test.rs"]
mod login_test;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::LoginError;
use crate::net::api::AuthApi;
use crate::net::types::LoginPayload;

/// Progress of the most recent login submission.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoginAttempt {
    pub loading: bool,
    pub error: Option<LoginError>,
}

type Completion = Arc<dyn Fn() + Send + Sync>;

struct ControllerShared {
    api: Arc<dyn AuthApi>,
    on_success: Completion,
    attempt: watch::Sender<LoginAttempt>,
    disposed: AtomicBool,
}

#[derive(Clone)]
pub struct LoginController {
    shared: Arc<ControllerShared>,
}

impl LoginController {
    /// `on_success` runs once per successful submission, after `loading`
    /// has been cleared.
    pub fn new<F>(api: Arc<dyn AuthApi>, on_success: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let (attempt, _) = watch::channel(LoginAttempt::default());
        Self {
            shared: Arc::new(ControllerShared {
                api,
                on_success: Arc::new(on_success),
                attempt,
                disposed: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn attempt(&self) -> LoginAttempt {
        self.shared.attempt.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LoginAttempt> {
        self.shared.attempt.subscribe()
    }

    /// Log in as `credential` and wait for the outcome.
    ///
    /// The credential is expected to be non-empty; form validation owns that.
    /// There is no retry: a failed attempt stays failed until resubmitted.
    pub async fn submit(&self, credential: &str) {
        if self.is_disposed() {
            debug!("login controller disposed; ignoring submit");
            return;
        }
        self.shared
            .attempt
            .send_replace(LoginAttempt { loading: true, error: None });
        info!(username_len = credential.len(), "login submitted");

        let payload = LoginPayload { username: credential.to_owned() };
        let outcome = self.shared.api.login(&payload).await;

        if self.is_disposed() {
            debug!("login settled after dispose; discarding");
            return;
        }
        match outcome {
            Ok(()) => {
                info!("login accepted");
                self.shared
                    .attempt
                    .send_replace(LoginAttempt { loading: false, error: None });
                (self.shared.on_success)();
            }
            Err(error) => {
                warn!(%error, "login failed");
                self.shared
                    .attempt
                    .send_replace(LoginAttempt { loading: false, error: Some(error) });
            }
        }
    }

    /// Fire-and-forget variant of [`LoginController::submit`] for form handlers.
    pub fn spawn_submit(&self, credential: String) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move { controller.submit(&credential).await })
    }

    /// Detach from the screen. Outcomes that arrive later update nothing and
    /// do not run the completion callback.
    pub fn dispose(&self) {
        self.shared.disposed.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::Acquire)
    }
}
