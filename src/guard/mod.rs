//! Route guarding: what to render for a screen, and the navigation it implies.
//!
//! DESIGN
//! ======
//! Guarding is split in two phases. `gate` is a pure function from session
//! state and requested screen to a `Decision`; `redirect` is the only place a
//! decision turns into navigation, and it runs after the render that produced
//! the decision has finished.

pub mod gate;
pub mod redirect;
