//! Change factory: turn a history of observed field values into changes.
//!
//! Given the value a field had *before* a series of observations, the factory
//! emits one [`Change`] per observation, chaining each record's old value from
//! the previous record's new value:
//!
//! ```text
//! baseline ──▶ v1 ──▶ v2 ──▶ … ──▶ vn
//!   c1: baseline → v1,  c2: v1 → v2,  …,  cn: vn-1 → vn
//! ```
//!
//! Two variants exist:
//!
//! - [`ChangeFactory::changes`] chains observations in *arrival* order -- the
//!   order the input iterator yields them. It never reorders.
//! - [`ChangeFactory::ordered_changes`] first sorts observations by a time
//!   projection (stable, so equal times keep arrival order) and chains in
//!   that order. Each record carries its timestamp.
//!
//! Neither variant touches an entity. Records are applied or reverted later
//! by the caller.
//!
//! # Laziness
//!
//! [`ChangeEvents`] pulls one observation per record, so it is exactly as
//! single-pass as its input. It is `Clone` (and can be replayed from the
//! start) whenever the input iterator and both projections are `Clone`.
//! [`OrderedChangeEvents`] has to see every observation to sort them, so the
//! projections run once when it is built; record emission is still lazy and
//! the sorted buffer can be cloned and replayed.

use std::marker::PhantomData;

use rewind_reflect::accessor::{resolve_by_name, resolve_by_selector, Accessor};
use rewind_reflect::schema::Reflect;
use rewind_reflect::ReflectError;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::change::{Change, TimedChange};

// ---------------------------------------------------------------------------
// FactoryConfig
// ---------------------------------------------------------------------------

/// Options controlling how observations become changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FactoryConfig {
    /// Drop observations whose value equals the running value instead of
    /// emitting a no-op record. Off by default, which keeps the one record
    /// per observation guarantee.
    #[serde(default)]
    pub skip_unchanged: bool,
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Chain `observations` in arrival order into changes of `field`.
///
/// ```
/// use rewind_events::prelude::*;
/// use rewind_reflect::selector;
///
/// struct Product { available: i32 }
///
/// let history = vec![("P1", 12), ("P1", 10)];
/// let changes: Vec<_> = to_change_events(
///     &selector!(Product, available),
///     15,
///     history,
///     |obs| obs.0,
///     |obs| obs.1,
/// )
/// .collect();
///
/// assert_eq!(changes.len(), 2);
/// assert_eq!(*changes[0].old_value(), 15);
/// assert_eq!(*changes[1].old_value(), 12);
/// assert_eq!(*changes[1].new_value(), 10);
/// ```
pub fn to_change_events<T, V, K, I, FK, FV>(
    field: &Accessor<T, V>,
    baseline: V,
    observations: I,
    key_fn: FK,
    value_fn: FV,
) -> ChangeEvents<T, K, V, I::IntoIter, FK, FV>
where
    T: 'static,
    V: Clone + PartialEq + 'static,
    I: IntoIterator,
    FK: FnMut(&I::Item) -> K,
    FV: FnMut(&I::Item) -> V,
{
    ChangeFactory::new(field.clone()).changes(baseline, observations, key_fn, value_fn)
}

/// Sort `observations` by `time_fn` and chain them into timed changes.
pub fn to_ordered_change_events<T, V, K, Tm, I, FK, FV, FT>(
    field: &Accessor<T, V>,
    baseline: V,
    observations: I,
    key_fn: FK,
    value_fn: FV,
    time_fn: FT,
) -> OrderedChangeEvents<T, K, V, Tm>
where
    T: 'static,
    V: Clone + PartialEq + 'static,
    Tm: Ord,
    I: IntoIterator,
    FK: FnMut(&I::Item) -> K,
    FV: FnMut(&I::Item) -> V,
    FT: FnMut(&I::Item) -> Tm,
{
    ChangeFactory::new(field.clone()).ordered_changes(
        baseline,
        observations,
        key_fn,
        value_fn,
        time_fn,
    )
}

// ---------------------------------------------------------------------------
// ChangeFactory
// ---------------------------------------------------------------------------

/// Produces change sequences for one field of `T`.
///
/// The field is resolved when the factory is built, so an unknown or
/// ill-typed field fails here, before any sequence exists.
pub struct ChangeFactory<T, V> {
    field: Accessor<T, V>,
    config: FactoryConfig,
}

impl<T: 'static, V: Clone + PartialEq + 'static> ChangeFactory<T, V> {
    pub fn new(field: Accessor<T, V>) -> Self {
        Self {
            field,
            config: FactoryConfig::default(),
        }
    }

    /// Resolve `name` on `T`'s schema.
    pub fn by_name(name: &str) -> Result<Self, ReflectError>
    where
        T: Reflect,
    {
        Ok(Self::new(resolve_by_name(&T::schema(), name)?))
    }

    /// Resolve selector text such as `"x => x.stock.on_hand"`.
    pub fn by_selector(selector: &str) -> Result<Self, ReflectError>
    where
        T: Reflect,
    {
        Ok(Self::new(resolve_by_selector(selector)?))
    }

    pub fn with_config(mut self, config: FactoryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn field(&self) -> &Accessor<T, V> {
        &self.field
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    /// Chain observations in arrival order. See the [module docs](self).
    pub fn changes<K, I, FK, FV>(
        &self,
        baseline: V,
        observations: I,
        key_fn: FK,
        value_fn: FV,
    ) -> ChangeEvents<T, K, V, I::IntoIter, FK, FV>
    where
        I: IntoIterator,
        FK: FnMut(&I::Item) -> K,
        FV: FnMut(&I::Item) -> V,
    {
        debug!(
            field = %self.field.path(),
            skip_unchanged = self.config.skip_unchanged,
            "building change events"
        );
        ChangeEvents {
            field: self.field.clone(),
            current: baseline,
            observations: observations.into_iter(),
            key_fn,
            value_fn,
            skip_unchanged: self.config.skip_unchanged,
            _key: PhantomData,
        }
    }

    /// Sort observations by time, then chain them. See the
    /// [module docs](self).
    pub fn ordered_changes<K, Tm, I, FK, FV, FT>(
        &self,
        baseline: V,
        observations: I,
        mut key_fn: FK,
        mut value_fn: FV,
        mut time_fn: FT,
    ) -> OrderedChangeEvents<T, K, V, Tm>
    where
        Tm: Ord,
        I: IntoIterator,
        FK: FnMut(&I::Item) -> K,
        FV: FnMut(&I::Item) -> V,
        FT: FnMut(&I::Item) -> Tm,
    {
        let mut pending: Vec<Pending<K, V, Tm>> = observations
            .into_iter()
            .map(|obs| Pending {
                timestamp: time_fn(&obs),
                key: key_fn(&obs),
                value: value_fn(&obs),
            })
            .collect();
        // `sort_by` is stable: equal timestamps keep arrival order.
        pending.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        debug!(
            field = %self.field.path(),
            observations = pending.len(),
            skip_unchanged = self.config.skip_unchanged,
            "building ordered change events"
        );
        OrderedChangeEvents {
            field: self.field.clone(),
            current: baseline,
            pending: pending.into_iter(),
            skip_unchanged: self.config.skip_unchanged,
        }
    }
}

impl<T, V> Clone for ChangeFactory<T, V> {
    fn clone(&self) -> Self {
        Self {
            field: self.field.clone(),
            config: self.config,
        }
    }
}

impl<T, V> std::fmt::Debug for ChangeFactory<T, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeFactory")
            .field("field", &self.field)
            .field("config", &self.config)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ChangeEvents (arrival order)
// ---------------------------------------------------------------------------

/// Lazy sequence of [`Change`]s in arrival order.
pub struct ChangeEvents<T, K, V, I, FK, FV> {
    field: Accessor<T, V>,
    /// Value of the field after the last emitted record.
    current: V,
    observations: I,
    key_fn: FK,
    value_fn: FV,
    skip_unchanged: bool,
    _key: PhantomData<fn() -> K>,
}

impl<T, K, V, I, FK, FV> Iterator for ChangeEvents<T, K, V, I, FK, FV>
where
    T: 'static,
    V: Clone + PartialEq + 'static,
    I: Iterator,
    FK: FnMut(&I::Item) -> K,
    FV: FnMut(&I::Item) -> V,
{
    type Item = Change<T, K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let observation = self.observations.next()?;
            let value = (self.value_fn)(&observation);
            if self.skip_unchanged && value == self.current {
                trace!(field = %self.field.path(), "skipping unchanged observation");
                continue;
            }
            let key = (self.key_fn)(&observation);
            let old_value = std::mem::replace(&mut self.current, value.clone());
            trace!(field = %self.field.path(), "emit change");
            return Some(Change::new(key, self.field.clone(), old_value, value));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (lower, upper) = self.observations.size_hint();
        if self.skip_unchanged {
            (0, upper)
        } else {
            (lower, upper)
        }
    }
}

impl<T, K, V, I, FK, FV> Clone for ChangeEvents<T, K, V, I, FK, FV>
where
    V: Clone,
    I: Clone,
    FK: Clone,
    FV: Clone,
{
    fn clone(&self) -> Self {
        Self {
            field: self.field.clone(),
            current: self.current.clone(),
            observations: self.observations.clone(),
            key_fn: self.key_fn.clone(),
            value_fn: self.value_fn.clone(),
            skip_unchanged: self.skip_unchanged,
            _key: PhantomData,
        }
    }
}

// ---------------------------------------------------------------------------
// OrderedChangeEvents (time order)
// ---------------------------------------------------------------------------

struct Pending<K, V, Tm> {
    timestamp: Tm,
    key: K,
    value: V,
}

impl<K: Clone, V: Clone, Tm: Clone> Clone for Pending<K, V, Tm> {
    fn clone(&self) -> Self {
        Self {
            timestamp: self.timestamp.clone(),
            key: self.key.clone(),
            value: self.value.clone(),
        }
    }
}

/// Lazy sequence of [`TimedChange`]s in non-decreasing timestamp order.
pub struct OrderedChangeEvents<T, K, V, Tm> {
    field: Accessor<T, V>,
    current: V,
    pending: std::vec::IntoIter<Pending<K, V, Tm>>,
    skip_unchanged: bool,
}

impl<T, K, V, Tm> Iterator for OrderedChangeEvents<T, K, V, Tm>
where
    T: 'static,
    V: Clone + PartialEq + 'static,
{
    type Item = TimedChange<T, K, V, Tm>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Pending {
                timestamp,
                key,
                value,
            } = self.pending.next()?;
            if self.skip_unchanged && value == self.current {
                trace!(field = %self.field.path(), "skipping unchanged observation");
                continue;
            }
            let old_value = std::mem::replace(&mut self.current, value.clone());
            trace!(field = %self.field.path(), "emit timed change");
            return Some(Change::new(key, self.field.clone(), old_value, value).at(timestamp));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.pending.len();
        if self.skip_unchanged {
            (0, Some(remaining))
        } else {
            (remaining, Some(remaining))
        }
    }
}

impl<T, K: Clone, V: Clone, Tm: Clone> Clone for OrderedChangeEvents<T, K, V, Tm> {
    fn clone(&self) -> Self {
        Self {
            field: self.field.clone(),
            current: self.current.clone(),
            pending: self.pending.clone(),
            skip_unchanged: self.skip_unchanged,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
