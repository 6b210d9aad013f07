//! # entertainarr-client
//!
//! Session-gated access control for the entertainarr web client.
//!
//! Every navigation asks the session cache who the visitor is, turns the
//! answer into a render decision, and redirects unauthenticated visitors to
//! the login screen. The login controller moves a visitor from anonymous to
//! authenticated and hands control back to the screen they asked for.

pub mod app;
pub mod config;
pub mod error;
pub mod guard;
pub mod net;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use app::App;
pub use config::ClientConfig;
pub use error::{ConfigError, FetchError, LoginError};
pub use guard::gate::{AuthGate, Decision, ScreenId};
pub use guard::redirect::{MemoryNavigator, Navigator, RedirectEffect, RenderMode};
pub use net::api::{AuthApi, HttpAuthApi};
pub use net::types::Identity;
pub use state::login::{LoginAttempt, LoginController};
pub use state::session::{FetchStatus, SessionCache, SessionState};
