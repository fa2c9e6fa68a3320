//! Rewind -- reversible change events for entity field histories.
//!
//! This crate bundles [`rewind_reflect`] (typed field accessors resolved by
//! name, selector or compile-time path) and [`rewind_events`] (change records,
//! change factories and the change log) behind one prelude.
//!
//! # Quick Start
//!
//! ```
//! use rewind::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
//! struct Product { price: f64 }
//!
//! impl Reflect for Product {
//!     fn describe(fields: &mut SchemaBuilder<Self>) {
//!         fields.field("price", |p| &p.price, |p| &mut p.price);
//!     }
//! }
//!
//! // (day, price) observations, out of order.
//! let history = vec![(3u32, 1.4), (1, 0.9), (2, 1.1)];
//!
//! let factory = ChangeFactory::<Product, f64>::by_name("price").unwrap();
//! let log: ChangeLog<_> = factory
//!     .ordered_changes(1.0, history, |_| "P1", |o| o.1, |o| o.0)
//!     .collect();
//!
//! let mut product = Product { price: 1.0 };
//! log.replay(&mut product).unwrap();
//! assert_eq!(product.price, 1.4);
//! log.rewind(&mut product).unwrap();
//! assert_eq!(product.price, 1.0);
//! ```

#![deny(unsafe_code)]

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the accessor crate for convenience.
pub use rewind_reflect;

/// Re-export the change event crate for convenience.
pub use rewind_events;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use rewind_events::prelude::*;
    pub use rewind_reflect::prelude::*;
}
