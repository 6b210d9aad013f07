//! Redirect effect: turns a `Redirecting` decision into one navigation.
//!
//! SYSTEM CONTEXT
//! ==============
//! The render pass calls `schedule` with each decision; the app calls `flush`
//! once the pass is over. Navigation therefore never happens while a render
//! is still running, and never happens at all during a server render.

#[cfg(test)]
#[path = "redirect_test.rs"]
mod redirect_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use super::gate::{Decision, ScreenId};

/// Imperative navigation primitive supplied by the host router.
pub trait Navigator: Send + Sync {
    fn current(&self) -> ScreenId;

    /// Navigate, adding a history entry.
    fn push(&self, to: &ScreenId);

    /// Navigate, replacing the current history entry.
    fn replace(&self, to: &ScreenId);
}

/// Whether the current render runs in the browser or on the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    Server,
    Client,
}

pub struct RedirectEffect {
    navigator: Arc<dyn Navigator>,
    mode: RenderMode,
    scheduled: Option<ScreenId>,
    dispatched: Option<ScreenId>,
}

impl RedirectEffect {
    #[must_use]
    pub fn new(navigator: Arc<dyn Navigator>, mode: RenderMode) -> Self {
        Self { navigator, mode, scheduled: None, dispatched: None }
    }

    /// Record the decision of the render in progress.
    ///
    /// A redirect to a target already dispatched is not scheduled again until
    /// some other decision has been seen in between.
    pub fn schedule(&mut self, decision: &Decision) {
        match decision {
            Decision::Redirecting { target } => {
                if self.dispatched.as_ref() != Some(target) {
                    self.scheduled = Some(target.clone());
                }
            }
            Decision::Loading | Decision::Render => {
                self.scheduled = None;
                self.dispatched = None;
            }
        }
    }

    /// Run the scheduled navigation, if any. Returns the target navigated to.
    pub fn flush(&mut self) -> Option<ScreenId> {
        let target = self.scheduled.take()?;
        if self.mode == RenderMode::Server {
            debug!(%target, "redirect suppressed during server render");
            return None;
        }
        info!(from = %self.navigator.current(), to = %target, "redirecting");
        self.navigator.push(&target);
        self.dispatched = Some(target.clone());
        Some(target)
    }

    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        self.scheduled.is_some()
    }
}

// =============================================================================
// IN-MEMORY NAVIGATOR
// =============================================================================

/// History-stack navigator for non-browser hosts and tests.
pub struct MemoryNavigator {
    history: Mutex<Vec<ScreenId>>,
}

impl MemoryNavigator {
    #[must_use]
    pub fn new(initial: ScreenId) -> Self {
        Self { history: Mutex::new(vec![initial]) }
    }

    #[must_use]
    pub fn history(&self) -> Vec<ScreenId> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ScreenId>> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Navigator for MemoryNavigator {
    fn current(&self) -> ScreenId {
        self.lock()
            .last()
            .cloned()
            .unwrap_or_else(|| ScreenId::new("/"))
    }

    fn push(&self, to: &ScreenId) {
        self.lock().push(to.clone());
    }

    fn replace(&self, to: &ScreenId) {
        let mut history = self.lock();
        history.pop();
        history.push(to.clone());
    }
}
