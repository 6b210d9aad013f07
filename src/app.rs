//! Root of the client: wires session, gate, redirect and navigation together.
//!
//! SYSTEM CONTEXT
//! ==============
//! A host drives the app in two phases per render cycle: `render` computes
//! the decision for the screen the navigator is on, then `commit` runs the
//! side effects that decision scheduled. `settle` repeats the cycle until
//! the decision stops changing, for hosts without a reactive runtime.

#[cfg(test)]
#[path = "app_test.rs"]
mod app_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::config::ClientConfig;
use crate::guard::gate::{AuthGate, Decision, ScreenId};
use crate::guard::redirect::{Navigator, RedirectEffect, RenderMode};
use crate::net::api::AuthApi;
use crate::state::login::LoginController;
use crate::state::session::SessionCache;

const MAX_RENDER_PASSES: usize = 8;

pub struct App {
    config: ClientConfig,
    api: Arc<dyn AuthApi>,
    session: SessionCache,
    gate: AuthGate,
    navigator: Arc<dyn Navigator>,
    redirect: Mutex<RedirectEffect>,
    /// Protected location the visitor was bounced from, restored after login.
    return_to: Arc<Mutex<Option<ScreenId>>>,
    logins: Mutex<Vec<LoginController>>,
}

impl App {
    #[must_use]
    pub fn new(config: ClientConfig, api: Arc<dyn AuthApi>, navigator: Arc<dyn Navigator>, mode: RenderMode) -> Self {
        let session = SessionCache::new(Arc::clone(&api));
        let gate = AuthGate::new(config.login_screen.clone());
        let redirect = Mutex::new(RedirectEffect::new(Arc::clone(&navigator), mode));
        Self {
            config,
            api,
            session,
            gate,
            navigator,
            redirect,
            return_to: Arc::new(Mutex::new(None)),
            logins: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn session(&self) -> &SessionCache {
        &self.session
    }

    /// Render phase: decide what the current screen shows. No navigation.
    #[must_use]
    pub fn render(&self) -> Decision {
        let requested = self.navigator.current();
        let decision = self.gate.evaluate(&self.session.get(), &requested);
        if decision.is_redirecting() {
            *lock(&self.return_to) = Some(requested);
        }
        lock(&self.redirect).schedule(&decision);
        decision
    }

    /// Commit phase: run the navigation scheduled by the last render.
    pub fn commit(&self) -> Option<ScreenId> {
        lock(&self.redirect).flush()
    }

    /// Render and commit until the decision is stable.
    ///
    /// Waits on the session lookup while loading and follows redirects. On a
    /// server render redirects are not followed, so `Redirecting` is returned.
    pub async fn settle(&self) -> Decision {
        let mut decision = Decision::Loading;
        for _ in 0..MAX_RENDER_PASSES {
            decision = self.render();
            let navigated = self.commit();
            match decision {
                Decision::Loading => {
                    self.session.resolve().await;
                }
                Decision::Redirecting { .. } if navigated.is_some() => {}
                Decision::Redirecting { .. } | Decision::Render => return decision,
            }
        }
        warn!(screen = %self.navigator.current(), ?decision, "render did not settle");
        decision
    }

    /// Navigate to `screen` as a link click would.
    pub fn visit(&self, screen: &ScreenId) {
        self.navigator.push(screen);
    }

    /// Controller for the login screen.
    ///
    /// On success the session is invalidated first, then the navigator
    /// replaces the login screen with the screen the visitor was bounced from
    /// (home if none). Controllers handed out here are disposed on unmount.
    #[must_use]
    pub fn login_controller(&self) -> LoginController {
        let session = self.session.clone();
        let navigator = Arc::clone(&self.navigator);
        let return_to = Arc::clone(&self.return_to);
        let home = self.config.home_screen.clone();
        let controller = LoginController::new(Arc::clone(&self.api), move || {
            session.invalidate();
            let target = lock(&return_to).take().unwrap_or_else(|| home.clone());
            navigator.replace(&target);
        });
        if self.session.is_disposed() {
            controller.dispose();
        } else {
            let mut logins = lock(&self.logins);
            logins.retain(|login| !login.is_disposed());
            logins.push(controller.clone());
        }
        controller
    }

    /// Window regained focus.
    pub fn on_focus(&self) {
        if self.config.revalidate_on_focus {
            self.session.revalidate();
        }
    }

    /// Network connectivity came back.
    pub fn on_reconnect(&self) {
        if self.config.revalidate_on_reconnect {
            self.session.revalidate();
        }
    }

    /// Tear down: late session results and login outcomes are dropped from
    /// here on.
    pub fn unmount(&self) {
        self.session.dispose();
        for login in lock(&self.logins).drain(..) {
            login.dispose();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
