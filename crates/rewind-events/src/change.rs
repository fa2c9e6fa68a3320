//! Reversible change records.
//!
//! A [`Change`] captures one transition of one field on one entity: the key of
//! the entity it belongs to, the field accessor, and the value before and after
//! the transition. [`TimedChange`] adds the point in time the transition was
//! observed at.
//!
//! Changes are immutable once built. [`Reversible::apply`] writes the new value
//! and [`Reversible::revert`] writes the old value; both are idempotent, since
//! they overwrite rather than accumulate. The caller supplies the entity
//! instance matching [`Keyed::key`] -- changes never look entities up.
//!
//! # Example
//!
//! ```
//! use rewind_events::change::{Change, Reversible};
//! use rewind_reflect::selector;
//!
//! struct Product { available: i32 }
//!
//! let change = Change::new("P1", selector!(Product, available), 15, 10);
//! let mut product = Product { available: 15 };
//!
//! change.apply(&mut product).unwrap();
//! assert_eq!(product.available, 10);
//! change.revert(&mut product).unwrap();
//! assert_eq!(product.available, 15);
//! ```

use std::fmt;

use rewind_reflect::accessor::Accessor;
use rewind_reflect::schema::Schema;
use rewind_reflect::ReflectError;
use serde::{Deserialize, Serialize};
use tracing::trace;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A transition that can be replayed onto, or undone from, an entity `T`.
pub trait Reversible<T> {
    /// Move the entity's field to the post-transition value.
    fn apply(&self, entity: &mut T) -> Result<(), ReflectError>;

    /// Move the entity's field back to the pre-transition value.
    fn revert(&self, entity: &mut T) -> Result<(), ReflectError>;
}

/// A record that targets one entity instance, identified by key.
pub trait Keyed {
    type Key;

    fn key(&self) -> &Self::Key;
}

// ---------------------------------------------------------------------------
// Change
// ---------------------------------------------------------------------------

/// One field transition `old_value -> new_value` for the entity `key`.
pub struct Change<T, K, V> {
    key: K,
    field: Accessor<T, V>,
    old_value: V,
    new_value: V,
}

impl<T: 'static, K, V: 'static> Change<T, K, V> {
    pub fn new(key: K, field: Accessor<T, V>, old_value: V, new_value: V) -> Self {
        Self {
            key,
            field,
            old_value,
            new_value,
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    /// The accessor this change writes through.
    pub fn field(&self) -> &Accessor<T, V> {
        &self.field
    }

    pub fn old_value(&self) -> &V {
        &self.old_value
    }

    pub fn new_value(&self) -> &V {
        &self.new_value
    }

    /// Attach the time the transition was observed at.
    pub fn at<Tm>(self, timestamp: Tm) -> TimedChange<T, K, V, Tm> {
        TimedChange {
            change: self,
            timestamp,
        }
    }

    /// Serializable projection for external storage.
    pub fn to_entry(&self) -> Result<ChangeEntry, serde_json::Error>
    where
        K: Serialize,
        V: Serialize,
    {
        Ok(ChangeEntry {
            field: self.field.path().to_string(),
            key: serde_json::to_value(&self.key)?,
            old_value: serde_json::to_value(&self.old_value)?,
            new_value: serde_json::to_value(&self.new_value)?,
            timestamp: None,
        })
    }
}

impl<T: 'static, K, V: Clone + 'static> Reversible<T> for Change<T, K, V> {
    fn apply(&self, entity: &mut T) -> Result<(), ReflectError> {
        trace!(field = %self.field.path(), "apply change");
        self.field.set(entity, self.new_value.clone())
    }

    fn revert(&self, entity: &mut T) -> Result<(), ReflectError> {
        trace!(field = %self.field.path(), "revert change");
        self.field.set(entity, self.old_value.clone())
    }
}

impl<T, K, V> Keyed for Change<T, K, V> {
    type Key = K;

    fn key(&self) -> &K {
        &self.key
    }
}

impl<T, K: Clone, V: Clone> Clone for Change<T, K, V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            field: self.field.clone(),
            old_value: self.old_value.clone(),
            new_value: self.new_value.clone(),
        }
    }
}

impl<T, K: fmt::Debug, V: fmt::Debug> fmt::Debug for Change<T, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Change")
            .field("key", &self.key)
            .field("field", &self.field.path())
            .field("old_value", &self.old_value)
            .field("new_value", &self.new_value)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// TimedChange
// ---------------------------------------------------------------------------

/// A [`Change`] with the timestamp of the observation that produced it.
pub struct TimedChange<T, K, V, Tm> {
    change: Change<T, K, V>,
    timestamp: Tm,
}

impl<T: 'static, K, V: 'static, Tm> TimedChange<T, K, V, Tm> {
    pub fn timestamp(&self) -> &Tm {
        &self.timestamp
    }

    /// The untimed transition.
    pub fn change(&self) -> &Change<T, K, V> {
        &self.change
    }

    pub fn key(&self) -> &K {
        self.change.key()
    }

    pub fn field(&self) -> &Accessor<T, V> {
        self.change.field()
    }

    pub fn old_value(&self) -> &V {
        self.change.old_value()
    }

    pub fn new_value(&self) -> &V {
        self.change.new_value()
    }

    pub fn into_parts(self) -> (Change<T, K, V>, Tm) {
        (self.change, self.timestamp)
    }

    /// Serializable projection for external storage, timestamp included.
    pub fn to_entry(&self) -> Result<ChangeEntry, serde_json::Error>
    where
        K: Serialize,
        V: Serialize,
        Tm: Serialize,
    {
        let mut entry = self.change.to_entry()?;
        entry.timestamp = Some(serde_json::to_value(&self.timestamp)?);
        Ok(entry)
    }
}

impl<T: 'static, K, V: Clone + 'static, Tm> Reversible<T> for TimedChange<T, K, V, Tm> {
    fn apply(&self, entity: &mut T) -> Result<(), ReflectError> {
        self.change.apply(entity)
    }

    fn revert(&self, entity: &mut T) -> Result<(), ReflectError> {
        self.change.revert(entity)
    }
}

impl<T, K, V, Tm> Keyed for TimedChange<T, K, V, Tm> {
    type Key = K;

    fn key(&self) -> &K {
        &self.change.key
    }
}

impl<T, K: Clone, V: Clone, Tm: Clone> Clone for TimedChange<T, K, V, Tm> {
    fn clone(&self) -> Self {
        Self {
            change: self.change.clone(),
            timestamp: self.timestamp.clone(),
        }
    }
}

impl<T, K: fmt::Debug, V: fmt::Debug, Tm: fmt::Debug> fmt::Debug for TimedChange<T, K, V, Tm> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedChange")
            .field("key", &self.change.key)
            .field("field", &self.change.field.path())
            .field("old_value", &self.change.old_value)
            .field("new_value", &self.change.new_value)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ChangeEntry
// ---------------------------------------------------------------------------

/// A change flattened to JSON values, for persistence and transport.
///
/// Entries address their field by path, so they can be replayed against any
/// entity whose [`Schema`] declares that path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    /// Dotted field path, e.g. `"price"` or `"stock.on_hand"`.
    pub field: String,
    /// Key of the target entity.
    pub key: serde_json::Value,
    pub old_value: serde_json::Value,
    pub new_value: serde_json::Value,
    /// Observation time, for changes produced from a timed history.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timestamp: Option<serde_json::Value>,
}

impl ChangeEntry {
    /// Write `new_value` into `entity` by field path.
    pub fn apply_with<T: 'static>(&self, schema: &Schema, entity: &mut T) -> Result<(), ReflectError> {
        schema.set_json(entity, &self.field, &self.new_value)
    }

    /// Write `old_value` into `entity` by field path.
    pub fn revert_with<T: 'static>(
        &self,
        schema: &Schema,
        entity: &mut T,
    ) -> Result<(), ReflectError> {
        schema.set_json(entity, &self.field, &self.old_value)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rewind_reflect::prelude::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        available: i32,
        price: f64,
    }

    impl Reflect for Item {
        fn describe(fields: &mut SchemaBuilder<Self>) {
            fields
                .field("available", |i| &i.available, |i| &mut i.available)
                .field("price", |i| &i.price, |i| &mut i.price);
        }
    }

    fn item() -> Item {
        Item {
            available: 10,
            price: 1.0,
        }
    }

    fn available_change(old: i32, new: i32) -> Change<Item, &'static str, i32> {
        Change::new("P1", selector!(Item, available), old, new)
    }

    #[test]
    fn apply_and_revert_write_endpoints() {
        let change = available_change(15, 20);
        let mut i = item();

        change.apply(&mut i).unwrap();
        assert_eq!(i.available, 20);
        change.revert(&mut i).unwrap();
        assert_eq!(i.available, 15);
    }

    #[test]
    fn apply_is_idempotent() {
        let change = available_change(15, 20);
        let mut i = item();
        change.apply(&mut i).unwrap();
        change.apply(&mut i).unwrap();
        assert_eq!(i.available, 20);
        change.revert(&mut i).unwrap();
        change.revert(&mut i).unwrap();
        assert_eq!(i.available, 15);
    }

    #[test]
    fn change_touches_only_its_field() {
        let change = available_change(15, 20);
        let mut i = item();
        change.apply(&mut i).unwrap();
        assert_eq!(i.price, 1.0);
    }

    #[test]
    fn timed_change_forwards_to_change() {
        let change = available_change(1, 2).at(42u64);
        assert_eq!(*change.timestamp(), 42);
        assert_eq!(*change.key(), "P1");
        assert_eq!(*change.old_value(), 1);
        assert_eq!(*change.new_value(), 2);

        let mut i = item();
        change.apply(&mut i).unwrap();
        assert_eq!(i.available, 2);

        let (untimed, ts) = change.into_parts();
        assert_eq!(ts, 42);
        untimed.revert(&mut i).unwrap();
        assert_eq!(i.available, 1);
    }

    #[test]
    fn entry_replays_by_field_name() {
        let change = Change::new("P1", selector!(Item, price), 0.8, 1.25).at(7u32);
        let entry = change.to_entry().unwrap();
        assert_eq!(entry.field, "price");
        assert_eq!(entry.key, serde_json::json!("P1"));
        assert_eq!(entry.timestamp, Some(serde_json::json!(7)));

        let json = serde_json::to_string(&entry).unwrap();
        let restored: ChangeEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, entry);

        let schema = Item::schema();
        let mut i = item();
        restored.revert_with(&schema, &mut i).unwrap();
        assert_eq!(i.price, 0.8);
        restored.apply_with(&schema, &mut i).unwrap();
        assert_eq!(i.price, 1.25);
    }

    #[test]
    fn untimed_entry_omits_timestamp() {
        let entry = available_change(1, 2).to_entry().unwrap();
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("timestamp").is_none());
    }

    #[test]
    fn debug_shows_path_and_values() {
        let rendered = format!("{:?}", available_change(1, 2));
        assert!(rendered.contains("available"));
        assert!(rendered.contains("old_value: 1"));
    }
}
