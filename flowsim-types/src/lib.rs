//! # flowsim-types
//!
//! Core types for the household water-flow simulator. These are shared by
//! the simulation SDK and the command-line publisher.
//!
//! ## Features
//!
//! - `serde`: JSON/TOML/etc. serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use flowsim_types::{Household, Mode, Snapshot};
//!
//! let households = vec![
//!     Household::new("A101", Mode::Normal),
//!     Household::new("B202", Mode::SlowLeak),
//! ];
//!
//! let mut snapshot = Snapshot::new();
//! for household in &households {
//!     snapshot.record(household.id.clone(), household.mode, 0.0);
//! }
//!
//! assert_eq!(snapshot.len(), 2);
//! ```

mod mode;
mod snapshot;

pub use mode::*;
pub use snapshot::*;
