//! Lenses: borrowed projections from an entity to one of its fields.
//!
//! A [`Lens`] is the resolved form of a field path. It never owns data; it
//! only knows how to borrow the field out of an entity, immutably or mutably.
//! [`Accessor`](crate::accessor::Accessor) wraps a lens together with the
//! path it was resolved from.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::ReflectError;

// ---------------------------------------------------------------------------
// Lens trait
// ---------------------------------------------------------------------------

/// Borrowing projection from `T` to a field of type `V`.
pub trait Lens<T: ?Sized, V: ?Sized>: Send + Sync {
    /// Borrow the field.
    fn view<'a>(&self, entity: &'a T) -> Result<&'a V, ReflectError>;

    /// Borrow the field mutably.
    fn view_mut<'a>(&self, entity: &'a mut T) -> Result<&'a mut V, ReflectError>;
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

/// Direct projection through a pair of plain functions. Cannot fail.
pub struct Project<T, V> {
    get: fn(&T) -> &V,
    get_mut: fn(&mut T) -> &mut V,
}

impl<T, V> Project<T, V> {
    pub fn new(get: fn(&T) -> &V, get_mut: fn(&mut T) -> &mut V) -> Self {
        Self { get, get_mut }
    }
}

impl<T, V> Lens<T, V> for Project<T, V> {
    fn view<'a>(&self, entity: &'a T) -> Result<&'a V, ReflectError> {
        Ok((self.get)(entity))
    }

    fn view_mut<'a>(&self, entity: &'a mut T) -> Result<&'a mut V, ReflectError> {
        Ok((self.get_mut)(entity))
    }
}

// ---------------------------------------------------------------------------
// OptionalProject
// ---------------------------------------------------------------------------

/// Projection through an optional value object.
///
/// An absent value is reported as [`ReflectError::NullIntermediate`] for both
/// reads and writes; it is never created on demand.
pub struct OptionalProject<T, V> {
    segment: String,
    get: fn(&T) -> Option<&V>,
    get_mut: fn(&mut T) -> Option<&mut V>,
}

impl<T, V> OptionalProject<T, V> {
    pub fn new(
        segment: &str,
        get: fn(&T) -> Option<&V>,
        get_mut: fn(&mut T) -> Option<&mut V>,
    ) -> Self {
        Self {
            segment: segment.to_owned(),
            get,
            get_mut,
        }
    }

    fn absent(&self) -> ReflectError {
        ReflectError::NullIntermediate {
            path: self.segment.clone(),
            segment: self.segment.clone(),
        }
    }
}

impl<T, V> Lens<T, V> for OptionalProject<T, V> {
    fn view<'a>(&self, entity: &'a T) -> Result<&'a V, ReflectError> {
        (self.get)(entity).ok_or_else(|| self.absent())
    }

    fn view_mut<'a>(&self, entity: &'a mut T) -> Result<&'a mut V, ReflectError> {
        match (self.get_mut)(entity) {
            Some(value) => Ok(value),
            None => Err(self.absent()),
        }
    }
}

// ---------------------------------------------------------------------------
// Compose
// ---------------------------------------------------------------------------

/// `outer` followed by `inner`.
pub struct Compose<T, M, V> {
    outer: Arc<dyn Lens<T, M>>,
    inner: Arc<dyn Lens<M, V>>,
}

impl<T, M, V> Compose<T, M, V> {
    pub fn new(outer: Arc<dyn Lens<T, M>>, inner: Arc<dyn Lens<M, V>>) -> Self {
        Self { outer, inner }
    }
}

impl<T, M: 'static, V> Lens<T, V> for Compose<T, M, V> {
    fn view<'a>(&self, entity: &'a T) -> Result<&'a V, ReflectError> {
        self.inner.view(self.outer.view(entity)?)
    }

    fn view_mut<'a>(&self, entity: &'a mut T) -> Result<&'a mut V, ReflectError> {
        self.inner.view_mut(self.outer.view_mut(entity)?)
    }
}

// ---------------------------------------------------------------------------
// Type-erased hops (schema walking)
// ---------------------------------------------------------------------------

/// A lens whose source and target types are only known at runtime.
///
/// Schemas store one of these per declared field so that a dotted path can be
/// walked across nested types without knowing them statically.
pub(crate) trait AnyLens: Send + Sync {
    fn view_any<'a>(
        &self,
        entity: &'a (dyn Any + 'static),
    ) -> Result<&'a (dyn Any + 'static), ReflectError>;

    fn view_any_mut<'a>(
        &self,
        entity: &'a mut (dyn Any + 'static),
    ) -> Result<&'a mut (dyn Any + 'static), ReflectError>;
}

/// Adapts a typed lens to [`AnyLens`] by downcasting its input.
pub(crate) struct Erased<T, V> {
    segment: String,
    lens: Arc<dyn Lens<T, V>>,
}

impl<T: 'static, V: 'static> Erased<T, V> {
    pub(crate) fn new(segment: &str, lens: Arc<dyn Lens<T, V>>) -> Self {
        Self {
            segment: segment.to_owned(),
            lens,
        }
    }

    fn wrong_owner(&self) -> ReflectError {
        ReflectError::TypeMismatch {
            path: self.segment.clone(),
            declared: std::any::type_name::<T>(),
            requested: "a value of another type",
        }
    }
}

impl<T: 'static, V: 'static> AnyLens for Erased<T, V> {
    fn view_any<'a>(
        &self,
        entity: &'a (dyn Any + 'static),
    ) -> Result<&'a (dyn Any + 'static), ReflectError> {
        let owner = entity
            .downcast_ref::<T>()
            .ok_or_else(|| self.wrong_owner())?;
        let field: &'a V = self.lens.view(owner)?;
        Ok(field)
    }

    fn view_any_mut<'a>(
        &self,
        entity: &'a mut (dyn Any + 'static),
    ) -> Result<&'a mut (dyn Any + 'static), ReflectError> {
        let Some(owner) = entity.downcast_mut::<T>() else {
            return Err(self.wrong_owner());
        };
        let field: &'a mut V = self.lens.view_mut(owner)?;
        Ok(field)
    }
}

/// Walks a chain of erased hops and downcasts the final borrow to `V`.
pub(crate) struct SchemaLens<V> {
    hops: Vec<Arc<dyn AnyLens>>,
    terminal: String,
    _value: PhantomData<fn() -> V>,
}

impl<V> SchemaLens<V> {
    pub(crate) fn new(hops: Vec<Arc<dyn AnyLens>>, terminal: &str) -> Self {
        Self {
            hops,
            terminal: terminal.to_owned(),
            _value: PhantomData,
        }
    }
}

impl<V: 'static> SchemaLens<V> {
    fn wrong_terminal(&self) -> ReflectError {
        ReflectError::TypeMismatch {
            path: self.terminal.clone(),
            declared: "a value of another type",
            requested: std::any::type_name::<V>(),
        }
    }
}

impl<T: 'static, V: 'static> Lens<T, V> for SchemaLens<V> {
    fn view<'a>(&self, entity: &'a T) -> Result<&'a V, ReflectError> {
        let mut current: &'a (dyn Any + 'static) = entity;
        for hop in &self.hops {
            current = hop.view_any(current)?;
        }
        current
            .downcast_ref::<V>()
            .ok_or_else(|| self.wrong_terminal())
    }

    fn view_mut<'a>(&self, entity: &'a mut T) -> Result<&'a mut V, ReflectError> {
        let mut current: &'a mut (dyn Any + 'static) = entity;
        for hop in &self.hops {
            current = hop.view_any_mut(current)?;
        }
        match current.downcast_mut::<V>() {
            Some(value) => Ok(value),
            None => Err(self.wrong_terminal()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
