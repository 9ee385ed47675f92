//! Active resource lifecycle: creation, countdown, renewal and removal.
//!
//! ```text
//! Empty --create--> Active --time left hits 0--> Expiring
//!   ^                 |  ^                          |
//!   +-----delete------+  +---replacement created----+
//! ```
//!
//! A failed replacement leaves the session in `Expiring`; the next countdown
//! tick retries.

mod controller;
mod events;
mod guard;

pub use controller::{Renewal, SessionController, SessionPhase, TickOutcome};
pub use events::{ClearReason, SessionEvent};
pub use guard::ExpiryGuard;
