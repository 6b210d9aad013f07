//! Client-side state for the session core.
//!
//! DESIGN
//! ======
//! `session` holds who the visitor is; `login` tracks a login form's
//! submission. The two only meet through the login completion callback,
//! which invalidates the session.

pub mod login;
pub mod session;
