//! Typed, reusable field accessors.
//!
//! An [`Accessor<T, V>`] is a field reference that has already been resolved:
//! the path is validated and turned into a [`Lens`] exactly once, after which
//! every `get`/`set` is a direct borrow. Accessors are cheap to clone and hold
//! no state beyond the resolved path, so any number of them may target the
//! same field.
//!
//! There are three ways to obtain one:
//!
//! - [`resolve_by_name`] against a [`Schema`] (the type descriptor),
//! - [`resolve_by_instance`], inferring the type from a value,
//! - [`resolve_by_selector`] from selector text, or the compile-time checked
//!   [`selector!`](crate::selector) macro.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::lens::{Compose, Lens, OptionalProject, Project};
use crate::path::FieldPath;
use crate::schema::{Reflect, Schema};
use crate::ReflectError;

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve a field of `T` by name using its type descriptor.
///
/// `name` may be a dotted path into nested value objects.
pub fn resolve_by_name<T: 'static, V: 'static>(
    schema: &Schema,
    name: &str,
) -> Result<Accessor<T, V>, ReflectError> {
    let path = schema.parse_name(name)?;
    schema.resolve(&path)
}

/// Resolve a field by name, taking the entity type from `instance`.
///
/// Only the static shape of `T` is consulted; the instance's values are never
/// read.
pub fn resolve_by_instance<T: Reflect, V: 'static>(
    _instance: &T,
    name: &str,
) -> Result<Accessor<T, V>, ReflectError> {
    resolve_by_name(&T::schema(), name)
}

/// Resolve a selector such as `"x => x.inner.count"` or `"inner.count"`.
///
/// Fails with [`ReflectError::InvalidPath`] when the selector is empty or is
/// not a chain of pure field projections.
pub fn resolve_by_selector<T: Reflect, V: 'static>(
    selector: &str,
) -> Result<Accessor<T, V>, ReflectError> {
    let path = FieldPath::parse(selector)?;
    T::schema().resolve(&path)
}

// ---------------------------------------------------------------------------
// Accessor
// ---------------------------------------------------------------------------

/// Resolved getter/setter pair for one field of `T` with value type `V`.
pub struct Accessor<T, V> {
    path: FieldPath,
    lens: Arc<dyn Lens<T, V>>,
}

impl<T: 'static, V: 'static> Accessor<T, V> {
    /// Wrap an arbitrary lens.
    pub fn from_lens(path: FieldPath, lens: impl Lens<T, V> + 'static) -> Self {
        Self {
            path,
            lens: Arc::new(lens),
        }
    }

    /// Accessor over a direct projection.
    pub fn project(path: FieldPath, get: fn(&T) -> &V, get_mut: fn(&mut T) -> &mut V) -> Self {
        Self::from_lens(path, Project::new(get, get_mut))
    }

    /// Accessor over an optional value object; absent values fail with
    /// [`ReflectError::NullIntermediate`].
    pub fn optional(
        name: &str,
        get: fn(&T) -> Option<&V>,
        get_mut: fn(&mut T) -> Option<&mut V>,
    ) -> Self {
        Self::from_lens(FieldPath::single(name), OptionalProject::new(name, get, get_mut))
    }

    /// Borrow the field.
    pub fn get_ref<'a>(&self, entity: &'a T) -> Result<&'a V, ReflectError> {
        self.lens.view(entity).map_err(|e| e.located(&self.path))
    }

    /// Read the field.
    pub fn get(&self, entity: &T) -> Result<V, ReflectError>
    where
        V: Clone,
    {
        self.get_ref(entity).cloned()
    }

    /// Read the field as JSON.
    pub fn get_json(&self, entity: &T) -> Result<serde_json::Value, ReflectError>
    where
        V: Serialize,
    {
        let value = self.get_ref(entity)?;
        serde_json::to_value(value).map_err(|source| ReflectError::Json {
            path: self.path.to_string(),
            source,
        })
    }

    /// Overwrite the field in place.
    pub fn set(&self, entity: &mut T, value: V) -> Result<(), ReflectError> {
        let slot = self
            .lens
            .view_mut(entity)
            .map_err(|e| e.located(&self.path))?;
        *slot = value;
        Ok(())
    }

    /// Bind `value` now and return a setter that only needs the entity.
    ///
    /// ```
    /// use rewind_reflect::prelude::*;
    ///
    /// struct Counter { hits: u32 }
    ///
    /// let hits = selector!(Counter, hits);
    /// let reset = hits.set_expression(0);
    ///
    /// let mut c = Counter { hits: 17 };
    /// reset.call(&mut c).unwrap();
    /// assert_eq!(c.hits, 0);
    /// ```
    pub fn set_expression(&self, value: V) -> BoundSetter<T>
    where
        V: Clone + Send + Sync,
    {
        let accessor = self.clone();
        BoundSetter {
            path: self.path.clone(),
            write: Arc::new(move |entity: &mut T| accessor.set(entity, value.clone())),
        }
    }

    /// Continue into a field of this field's value.
    pub fn then<W: 'static>(&self, inner: &Accessor<V, W>) -> Accessor<T, W> {
        Accessor {
            path: self.path.join(&inner.path),
            lens: Arc::new(Compose::new(
                Arc::clone(&self.lens),
                Arc::clone(&inner.lens),
            )),
        }
    }
}

impl<T, V> Accessor<T, V> {
    /// The resolved path.
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Name of the innermost field.
    pub fn name(&self) -> &str {
        self.path.terminal()
    }
}

impl<T, V> Clone for Accessor<T, V> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            lens: Arc::clone(&self.lens),
        }
    }
}

impl<T, V> fmt::Debug for Accessor<T, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("path", &self.path)
            .field("entity", &std::any::type_name::<T>())
            .field("value", &std::any::type_name::<V>())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// BoundSetter
// ---------------------------------------------------------------------------

type WriteFn<T> = Arc<dyn Fn(&mut T) -> Result<(), ReflectError> + Send + Sync>;

/// A deferred "set this field to this value" action.
pub struct BoundSetter<T> {
    path: FieldPath,
    write: WriteFn<T>,
}

impl<T> BoundSetter<T> {
    /// Perform the write.
    pub fn call(&self, entity: &mut T) -> Result<(), ReflectError> {
        (self.write)(entity)
    }

    /// The path this setter writes.
    pub fn path(&self) -> &FieldPath {
        &self.path
    }
}

impl<T> Clone for BoundSetter<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            write: Arc::clone(&self.write),
        }
    }
}

impl<T> fmt::Debug for BoundSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundSetter")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
