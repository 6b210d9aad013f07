//! Auth gate: session state + requested screen -> render decision.

#[cfg(test)]
#[path = "gate_test.rs"]
mod gate_test;

use std::fmt;

use crate::state::session::{FetchStatus, SessionState};

/// A screen location such as `/` or `/tvshows/search?q=dune`.
///
/// The path identifies the screen: a trailing `/` on anything but the root is
/// dropped, so `/login/?next=/` is the same screen as `/login`. Query string
/// and fragment are kept so a location can be restored as it was requested.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ScreenId {
    path: String,
    suffix: String,
}

impl ScreenId {
    #[must_use]
    pub fn new(location: impl AsRef<str>) -> Self {
        let raw = location.as_ref().trim();
        let end = raw.find(['?', '#']).unwrap_or(raw.len());
        let suffix = raw[end..].to_owned();
        let path = raw[..end].trim_end_matches('/');
        let path = if path.is_empty() {
            "/".to_owned()
        } else if path.starts_with('/') {
            path.to_owned()
        } else {
            format!("/{path}")
        };
        Self { path, suffix }
    }

    /// Normalised path, without query string or fragment.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Query string and fragment as requested, empty when there were none.
    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    #[must_use]
    pub fn same_screen(&self, other: &ScreenId) -> bool {
        self.path == other.path
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.path, self.suffix)
    }
}

impl From<&str> for ScreenId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// What a protected screen must do before rendering its own content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// No identity yet and the lookup is still in flight.
    Loading,
    /// Render the requested screen.
    Render,
    /// No identity; navigation to `target` is (or will be) under way.
    Redirecting { target: ScreenId },
}

impl Decision {
    #[must_use]
    pub fn is_redirecting(&self) -> bool {
        matches!(self, Self::Redirecting { .. })
    }
}

/// Evaluates session state against the requested screen.
///
/// Stateless apart from knowing which screen is the login screen; it never
/// mutates the session and never navigates.
#[derive(Clone, Debug)]
pub struct AuthGate {
    login_screen: ScreenId,
}

impl AuthGate {
    #[must_use]
    pub fn new(login_screen: ScreenId) -> Self {
        Self { login_screen }
    }

    #[must_use]
    pub fn login_screen(&self) -> &ScreenId {
        &self.login_screen
    }

    #[must_use]
    pub fn evaluate(&self, session: &SessionState, requested: &ScreenId) -> Decision {
        evaluate(session, requested, &self.login_screen)
    }
}

/// The gate rule.
///
/// The login screen always renders, even for anonymous visitors, so a failed
/// identity lookup can never loop back onto itself.
#[must_use]
pub fn evaluate(session: &SessionState, requested: &ScreenId, login_screen: &ScreenId) -> Decision {
    if session.identity.is_some() {
        return Decision::Render;
    }
    match session.fetch_status {
        FetchStatus::Pending => Decision::Loading,
        FetchStatus::Settled if requested.same_screen(login_screen) => Decision::Render,
        FetchStatus::Settled => Decision::Redirecting { target: login_screen.clone() },
    }
}
