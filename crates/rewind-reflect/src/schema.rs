//! Type descriptors: the named fields of an entity type.
//!
//! Every entity type that should be addressable by field *name* implements
//! [`Reflect`] and declares its fields once through a [`SchemaBuilder`]. The
//! resulting [`Schema`] maps names to type-erased lenses, declared value types
//! and JSON codecs, so that a dotted path can be resolved into a typed
//! [`Accessor`] or read/written as a `serde_json::Value`.
//!
//! Resolution only ever looks at the declared shape. It never inspects the
//! values of an entity.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::accessor::Accessor;
use crate::lens::{AnyLens, Erased, Lens, OptionalProject, Project, SchemaLens};
use crate::path::FieldPath;
use crate::ReflectError;

// ---------------------------------------------------------------------------
// Reflect
// ---------------------------------------------------------------------------

/// An entity type whose fields can be resolved by name.
///
/// ```
/// use rewind_reflect::prelude::*;
///
/// #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
/// struct Product { available: i32, price: f64 }
///
/// impl Reflect for Product {
///     fn describe(fields: &mut SchemaBuilder<Self>) {
///         fields
///             .field("available", |p| &p.available, |p| &mut p.available)
///             .field("price", |p| &p.price, |p| &mut p.price);
///     }
/// }
///
/// let schema = Product::schema();
/// assert_eq!(schema.field_names(), vec!["available", "price"]);
/// ```
pub trait Reflect: Sized + Send + Sync + 'static {
    /// Declare the fields of `Self`.
    fn describe(fields: &mut SchemaBuilder<Self>);

    /// Build the type descriptor for `Self`.
    fn schema() -> Schema {
        let mut builder = SchemaBuilder::new();
        Self::describe(&mut builder);
        builder.build()
    }
}

// ---------------------------------------------------------------------------
// FieldInfo
// ---------------------------------------------------------------------------

/// How a declared field participates in path resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A plain value; always the last segment of a path.
    Value,
    /// An embedded value object whose own fields can be addressed.
    Nested,
    /// An optional value object. Walking through it while it is absent fails
    /// with [`ReflectError::NullIntermediate`].
    OptionalNested,
}

/// Metadata about one declared field.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    /// Field name as used in paths.
    pub name: String,
    /// `std::any::type_name` of the declared type.
    pub type_name: &'static str,
    /// Rust `TypeId` for resolve-time type checking.
    pub type_id: TypeId,
    /// Value, nested or optional-nested.
    pub kind: FieldKind,
}

// ---------------------------------------------------------------------------
// Field entries
// ---------------------------------------------------------------------------

type EncodeFn = fn(&(dyn Any + 'static), &FieldPath) -> Result<serde_json::Value, ReflectError>;
type DecodeFn =
    fn(&mut (dyn Any + 'static), &serde_json::Value, &FieldPath) -> Result<(), ReflectError>;

#[derive(Clone, Copy)]
struct JsonCodec {
    encode: EncodeFn,
    decode: DecodeFn,
}

struct FieldEntry {
    info: FieldInfo,
    hop: Arc<dyn AnyLens>,
    /// Present for scalar values only.
    codec: Option<JsonCodec>,
    /// Present for nested value objects only.
    nested: Option<fn() -> Schema>,
}

fn encode<V: Serialize + 'static>(
    value: &(dyn Any + 'static),
    path: &FieldPath,
) -> Result<serde_json::Value, ReflectError> {
    let typed = value
        .downcast_ref::<V>()
        .ok_or_else(|| mismatch::<V>(path))?;
    serde_json::to_value(typed).map_err(|source| ReflectError::Json {
        path: path.to_string(),
        source,
    })
}

fn decode<V: DeserializeOwned + 'static>(
    slot: &mut (dyn Any + 'static),
    value: &serde_json::Value,
    path: &FieldPath,
) -> Result<(), ReflectError> {
    // Decode fully before touching the slot so a bad value leaves it intact.
    let typed: V = serde_json::from_value(value.clone()).map_err(|source| ReflectError::Json {
        path: path.to_string(),
        source,
    })?;
    let Some(target) = slot.downcast_mut::<V>() else {
        return Err(mismatch::<V>(path));
    };
    *target = typed;
    Ok(())
}

fn mismatch<V>(path: &FieldPath) -> ReflectError {
    ReflectError::TypeMismatch {
        path: path.to_string(),
        declared: "a value of another type",
        requested: std::any::type_name::<V>(),
    }
}

// ---------------------------------------------------------------------------
// SchemaBuilder
// ---------------------------------------------------------------------------

/// Collects field declarations for `T`. See [`Reflect`].
pub struct SchemaBuilder<T> {
    entries: Vec<FieldEntry>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Reflect> SchemaBuilder<T> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            _entity: PhantomData,
        }
    }

    /// Declare a plain value field.
    ///
    /// # Panics
    ///
    /// Panics if `name` is already declared on this type.
    pub fn field<V>(
        &mut self,
        name: &str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
    ) -> &mut Self
    where
        V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let lens: Arc<dyn Lens<T, V>> = Arc::new(Project::new(get, get_mut));
        self.push(FieldEntry {
            info: info::<V>(name, FieldKind::Value),
            hop: Arc::new(Erased::new(name, lens)),
            codec: Some(JsonCodec {
                encode: encode::<V>,
                decode: decode::<V>,
            }),
            nested: None,
        })
    }

    /// Declare an embedded value object whose fields are addressable as
    /// `name.<field>`.
    pub fn nested<M: Reflect>(
        &mut self,
        name: &str,
        get: fn(&T) -> &M,
        get_mut: fn(&mut T) -> &mut M,
    ) -> &mut Self {
        let lens: Arc<dyn Lens<T, M>> = Arc::new(Project::new(get, get_mut));
        self.push(FieldEntry {
            info: info::<M>(name, FieldKind::Nested),
            hop: Arc::new(Erased::new(name, lens)),
            codec: None,
            nested: Some(M::schema),
        })
    }

    /// Declare an optional value object. The declared type is `M`, not
    /// `Option<M>`: paths address the object itself when it is present.
    pub fn optional<M: Reflect>(
        &mut self,
        name: &str,
        get: fn(&T) -> Option<&M>,
        get_mut: fn(&mut T) -> Option<&mut M>,
    ) -> &mut Self {
        let lens: Arc<dyn Lens<T, M>> = Arc::new(OptionalProject::new(name, get, get_mut));
        self.push(FieldEntry {
            info: info::<M>(name, FieldKind::OptionalNested),
            hop: Arc::new(Erased::new(name, lens)),
            codec: None,
            nested: Some(M::schema),
        })
    }

    fn push(&mut self, entry: FieldEntry) -> &mut Self {
        if self.entries.iter().any(|e| e.info.name == entry.info.name) {
            panic!(
                "field '{}' is declared twice on '{}'",
                entry.info.name,
                std::any::type_name::<T>()
            );
        }
        self.entries.push(entry);
        self
    }

    fn build(self) -> Schema {
        let by_name = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.info.name.clone(), i))
            .collect();
        Schema {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
            entries: self.entries,
            by_name,
        }
    }
}

fn info<V: 'static>(name: &str, kind: FieldKind) -> FieldInfo {
    FieldInfo {
        name: name.to_owned(),
        type_name: std::any::type_name::<V>(),
        type_id: TypeId::of::<V>(),
        kind,
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// The resolved path: erased hops plus the terminal field's metadata.
struct Walk {
    hops: Vec<Arc<dyn AnyLens>>,
    terminal: FieldInfo,
    codec: Option<JsonCodec>,
}

/// Descriptor of an entity type's named fields.
pub struct Schema {
    type_name: &'static str,
    type_id: TypeId,
    /// Declaration order.
    entries: Vec<FieldEntry>,
    /// Name -> index into `entries`.
    by_name: HashMap<String, usize>,
}

impl Schema {
    /// Shorthand for [`Reflect::schema`].
    pub fn of<T: Reflect>() -> Schema {
        T::schema()
    }

    /// `std::any::type_name` of the described type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// `TypeId` of the described type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Metadata for a top-level field.
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.by_name.get(name).map(|&i| &self.entries[i].info)
    }

    /// Top-level fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldInfo> {
        self.entries.iter().map(|e| &e.info)
    }

    /// Names of all top-level fields, sorted.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve `path` into a typed accessor.
    ///
    /// Fails with [`ReflectError::FieldNotFound`] when a segment is not
    /// declared, and with [`ReflectError::TypeMismatch`] when `T` is not the
    /// described type or `V` is not the terminal field's declared type.
    pub fn resolve<T: 'static, V: 'static>(
        &self,
        path: &FieldPath,
    ) -> Result<Accessor<T, V>, ReflectError> {
        self.check_entity::<T>(path)?;
        let walk = self.walk(path)?;
        if walk.terminal.type_id != TypeId::of::<V>() {
            return Err(ReflectError::TypeMismatch {
                path: path.to_string(),
                declared: walk.terminal.type_name,
                requested: std::any::type_name::<V>(),
            });
        }
        tracing::trace!(
            entity = self.type_name,
            path = %path,
            value = walk.terminal.type_name,
            "resolved field accessor"
        );
        Ok(Accessor::from_lens(
            path.clone(),
            SchemaLens::<V>::new(walk.hops, &walk.terminal.name),
        ))
    }

    /// Read the field at `path` as JSON.
    pub fn get_json<T: 'static>(
        &self,
        entity: &T,
        path: &str,
    ) -> Result<serde_json::Value, ReflectError> {
        let path = self.parse_name(path)?;
        self.check_entity::<T>(&path)?;
        let walk = self.walk(&path)?;
        let codec = walk.codec.ok_or_else(|| ReflectError::NotAValue {
            path: path.to_string(),
        })?;

        let mut current: &(dyn Any + 'static) = entity;
        for hop in &walk.hops {
            current = hop.view_any(current).map_err(|e| e.located(&path))?;
        }
        (codec.encode)(current, &path)
    }

    /// Decode `value` into the declared type of the field at `path` and store
    /// it on `entity`. The entity is untouched if decoding fails.
    pub fn set_json<T: 'static>(
        &self,
        entity: &mut T,
        path: &str,
        value: &serde_json::Value,
    ) -> Result<(), ReflectError> {
        let path = self.parse_name(path)?;
        self.check_entity::<T>(&path)?;
        let walk = self.walk(&path)?;
        let codec = walk.codec.ok_or_else(|| ReflectError::NotAValue {
            path: path.to_string(),
        })?;

        let mut current: &mut (dyn Any + 'static) = entity;
        for hop in &walk.hops {
            current = hop.view_any_mut(current).map_err(|e| e.located(&path))?;
        }
        (codec.decode)(current, value, &path)
    }

    /// Names are looked up verbatim; anything that is not a dotted chain of
    /// identifiers cannot name a field.
    pub(crate) fn parse_name(&self, name: &str) -> Result<FieldPath, ReflectError> {
        FieldPath::parse(name).map_err(|_| self.not_found(name))
    }

    fn check_entity<T: 'static>(&self, path: &FieldPath) -> Result<(), ReflectError> {
        if TypeId::of::<T>() == self.type_id {
            Ok(())
        } else {
            Err(ReflectError::TypeMismatch {
                path: path.to_string(),
                declared: self.type_name,
                requested: std::any::type_name::<T>(),
            })
        }
    }

    fn not_found(&self, field: &str) -> ReflectError {
        ReflectError::FieldNotFound {
            type_name: self.type_name,
            field: field.to_owned(),
            available: self.field_names().join(", "),
        }
    }

    fn walk(&self, path: &FieldPath) -> Result<Walk, ReflectError> {
        let mut hops = Vec::with_capacity(path.depth());
        let (terminal, codec) = self.walk_into(path.raw_segments(), path, &mut hops)?;
        Ok(Walk {
            hops,
            terminal,
            codec,
        })
    }

    fn walk_into(
        &self,
        segments: &[String],
        full: &FieldPath,
        hops: &mut Vec<Arc<dyn AnyLens>>,
    ) -> Result<(FieldInfo, Option<JsonCodec>), ReflectError> {
        let Some((head, rest)) = segments.split_first() else {
            return Err(ReflectError::InvalidPath {
                selector: full.to_string(),
                reason: "selector is empty".to_owned(),
            });
        };
        let entry = self
            .by_name
            .get(head)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| self.not_found(head))?;
        hops.push(Arc::clone(&entry.hop));

        if rest.is_empty() {
            return Ok((entry.info.clone(), entry.codec));
        }
        match entry.nested {
            Some(child) => child().walk_into(rest, full, hops),
            None => Err(ReflectError::InvalidPath {
                selector: full.to_string(),
                reason: format!("'{head}' is a value field and has no nested fields"),
            }),
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("type_name", &self.type_name)
            .field("fields", &self.field_names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
