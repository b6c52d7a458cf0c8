//! # marketdash-core
//!
//! Primitives shared by the MarketDash crates.
//!
//! - [`clock`] - Injectable time source used by every TTL computation

pub mod clock;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock, system_clock};
