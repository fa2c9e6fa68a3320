//! In-memory change log.
//!
//! The [`ChangeLog`] keeps changes in the order they were recorded and
//! replays them onto a caller-supplied entity. Applying every change in order
//! reconstructs the observed timeline on the entity; reverting every change
//! in reverse order walks it back to the baseline.
//!
//! # Query API
//!
//! - **Key**: [`ChangeLog::changes_for_key`]
//! - **All**: [`ChangeLog::iter`] / [`ChangeLog::all_changes`]
//!
//! # Example
//!
//! ```
//! use rewind_events::prelude::*;
//! use rewind_reflect::selector;
//!
//! struct Product { price: f64 }
//!
//! let log: ChangeLog<_> = to_ordered_change_events(
//!     &selector!(Product, price),
//!     1.0,
//!     vec![(2u32, 1.5), (1, 1.25)],
//!     |_| "P1",
//!     |obs| obs.1,
//!     |obs| obs.0,
//! )
//! .collect();
//!
//! let mut product = Product { price: 1.0 };
//! log.replay(&mut product).unwrap();
//! assert_eq!(product.price, 1.5);
//! log.rewind(&mut product).unwrap();
//! assert_eq!(product.price, 1.0);
//! ```

use rewind_reflect::ReflectError;
use tracing::warn;

use crate::change::{Keyed, Reversible};

// ---------------------------------------------------------------------------
// ChangeLog
// ---------------------------------------------------------------------------

/// Append-only list of changes in recording order.
#[derive(Debug, Clone)]
pub struct ChangeLog<C> {
    changes: Vec<C>,
}

impl<C> ChangeLog<C> {
    /// Create a new, empty log.
    pub fn new() -> Self {
        Self {
            changes: Vec::new(),
        }
    }

    /// Append one change.
    pub fn record(&mut self, change: C) {
        self.changes.push(change);
    }

    /// Drop all recorded changes.
    pub fn clear(&mut self) {
        self.changes.clear();
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// All changes in recording order.
    pub fn all_changes(&self) -> &[C] {
        &self.changes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, C> {
        self.changes.iter()
    }

    /// Apply every change in recording order.
    ///
    /// Stops at the first failure and returns it; changes before it stay
    /// applied. Returns the number of changes applied.
    pub fn replay<T>(&self, entity: &mut T) -> Result<usize, ReflectError>
    where
        C: Reversible<T>,
    {
        walk(self.changes.iter(), entity, "replay", |c, e| c.apply(e))
    }

    /// Revert every change in reverse recording order.
    pub fn rewind<T>(&self, entity: &mut T) -> Result<usize, ReflectError>
    where
        C: Reversible<T>,
    {
        walk(self.changes.iter().rev(), entity, "rewind", |c, e| c.revert(e))
    }
}

impl<C: Keyed> ChangeLog<C>
where
    C::Key: PartialEq,
{
    /// Changes targeting the entity `key`, in recording order.
    pub fn changes_for_key<'a>(&'a self, key: &'a C::Key) -> impl Iterator<Item = &'a C> {
        self.changes.iter().filter(move |c| c.key() == key)
    }

    /// Apply, in order, only the changes for `key`.
    pub fn replay_for<T>(&self, key: &C::Key, entity: &mut T) -> Result<usize, ReflectError>
    where
        C: Reversible<T>,
    {
        walk(self.changes_for_key(key), entity, "replay", |c, e| c.apply(e))
    }

    /// Revert, in reverse order, only the changes for `key`.
    pub fn rewind_for<T>(&self, key: &C::Key, entity: &mut T) -> Result<usize, ReflectError>
    where
        C: Reversible<T>,
    {
        let mine: Vec<&C> = self.changes_for_key(key).collect();
        walk(mine.into_iter().rev(), entity, "rewind", |c, e| c.revert(e))
    }
}

fn walk<'a, C: 'a, T>(
    changes: impl Iterator<Item = &'a C>,
    entity: &mut T,
    direction: &str,
    mut step: impl FnMut(&C, &mut T) -> Result<(), ReflectError>,
) -> Result<usize, ReflectError> {
    let mut done = 0;
    for change in changes {
        if let Err(e) = step(change, entity) {
            warn!(
                direction,
                completed = done,
                error = %e,
                "change log walk stopped"
            );
            return Err(e);
        }
        done += 1;
    }
    Ok(done)
}

impl<C> Default for ChangeLog<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> FromIterator<C> for ChangeLog<C> {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        Self {
            changes: iter.into_iter().collect(),
        }
    }
}

impl<C> Extend<C> for ChangeLog<C> {
    fn extend<I: IntoIterator<Item = C>>(&mut self, iter: I) {
        self.changes.extend(iter);
    }
}

impl<'a, C> IntoIterator for &'a ChangeLog<C> {
    type Item = &'a C;
    type IntoIter = std::slice::Iter<'a, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
