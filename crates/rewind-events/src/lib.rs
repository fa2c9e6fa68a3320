//! Rewind Events -- reversible change records derived from field histories.
//!
//! This crate turns a baseline value plus a history of observed values into
//! discrete change records, each able to move one field of an entity forward
//! (`apply`) or backward (`revert`). Fields are addressed through
//! [`rewind_reflect`] accessors.
//!
//! # Modules
//!
//! - [`change`]: [`Change`](change::Change) and
//!   [`TimedChange`](change::TimedChange) records, the
//!   [`Reversible`](change::Reversible) trait, and the serializable
//!   [`ChangeEntry`](change::ChangeEntry).
//! - [`factory`]: the [`ChangeFactory`](factory::ChangeFactory) and its
//!   arrival-order and time-order sequences.
//! - [`log`]: an in-memory [`ChangeLog`](log::ChangeLog) for replaying and
//!   rewinding a recorded timeline.
//!
//! # Quick Start
//!
//! ```
//! use rewind_events::prelude::*;
//! use rewind_reflect::selector;
//!
//! struct Product { available: i32 }
//!
//! let mut product = Product { available: 10 };
//! let changes: Vec<_> = to_change_events(
//!     &selector!(Product, available),
//!     15,
//!     vec![("P1", 12), ("P1", 10)],
//!     |obs| obs.0,
//!     |obs| obs.1,
//! )
//! .collect();
//!
//! changes[0].revert(&mut product).unwrap();
//! assert_eq!(product.available, 15);
//! changes[1].apply(&mut product).unwrap();
//! assert_eq!(product.available, 10);
//! ```

#![deny(unsafe_code)]

pub mod change;
pub mod factory;
pub mod log;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::change::{Change, ChangeEntry, Keyed, Reversible, TimedChange};
    pub use crate::factory::{
        to_change_events, to_ordered_change_events, ChangeEvents, ChangeFactory, FactoryConfig,
        OrderedChangeEvents,
    };
    pub use crate::log::ChangeLog;
}
