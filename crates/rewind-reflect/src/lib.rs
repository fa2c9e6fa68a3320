//! Rewind Reflect -- resolve named fields of arbitrary entity types into typed
//! getters and setters.
//!
//! Field references are resolved once into an [`Accessor`](accessor::Accessor)
//! and reused for every read and write afterwards. References can be given by
//! name against a type descriptor, by name against an instance, as selector
//! text, or as a compile-time checked path with [`selector!`].
//!
//! # Quick Start
//!
//! ```
//! use rewind_reflect::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
//! struct Stock { on_hand: u32 }
//!
//! #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
//! struct Product { name: String, stock: Stock }
//!
//! impl Reflect for Stock {
//!     fn describe(fields: &mut SchemaBuilder<Self>) {
//!         fields.field("on_hand", |s| &s.on_hand, |s| &mut s.on_hand);
//!     }
//! }
//!
//! impl Reflect for Product {
//!     fn describe(fields: &mut SchemaBuilder<Self>) {
//!         fields
//!             .field("name", |p| &p.name, |p| &mut p.name)
//!             .nested("stock", |p| &p.stock, |p| &mut p.stock);
//!     }
//! }
//!
//! let mut product = Product { name: "bolt".into(), stock: Stock { on_hand: 3 } };
//!
//! let by_name = resolve_by_selector::<Product, u32>("x => x.stock.on_hand").unwrap();
//! let by_macro = selector!(Product, stock.on_hand);
//!
//! by_name.set(&mut product, 8).unwrap();
//! assert_eq!(by_macro.get(&product).unwrap(), 8);
//! ```

#![deny(unsafe_code)]

pub mod accessor;
pub mod lens;
pub mod path;
pub mod schema;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while resolving or using field accessors.
#[derive(Debug, thiserror::Error)]
pub enum ReflectError {
    /// No field with this name is declared on the type.
    #[error("type '{type_name}' has no field '{field}'. Declared fields: [{available}]")]
    FieldNotFound {
        type_name: &'static str,
        field: String,
        available: String,
    },

    /// The declared type of the field differs from the requested one.
    #[error("field '{path}' is declared as {declared} but was requested as {requested}")]
    TypeMismatch {
        path: String,
        declared: &'static str,
        requested: &'static str,
    },

    /// The selector is empty or is not a chain of field projections.
    #[error("invalid field selector '{selector}': {reason}")]
    InvalidPath { selector: String, reason: String },

    /// A nested path crossed an absent optional value object.
    #[error("cannot access '{path}': intermediate value '{segment}' is absent")]
    NullIntermediate { path: String, segment: String },

    /// The path ends on a nested object where a plain value was required.
    #[error("'{path}' refers to a nested object, not a value")]
    NotAValue { path: String },

    /// A field value could not be converted to or from JSON.
    #[error("JSON conversion failed for field '{path}': {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ReflectError {
    /// Attach the full accessor path to a hop-level failure.
    pub(crate) fn located(self, path: &path::FieldPath) -> Self {
        match self {
            ReflectError::NullIntermediate { segment, .. } => ReflectError::NullIntermediate {
                path: path.to_string(),
                segment,
            },
            other => other,
        }
    }
}

// ---------------------------------------------------------------------------
// Selector macro
// ---------------------------------------------------------------------------

/// Build an [`Accessor`](accessor::Accessor) from a field path checked by the
/// compiler.
///
/// `selector!(Product, stock.on_hand)` projects `product.stock.on_hand`. Only
/// dotted field names are accepted, so a comparison or a method call fails
/// to compile instead of producing an accessor.
#[macro_export]
macro_rules! selector {
    ($entity:ty, $($segment:ident).+) => {
        $crate::accessor::Accessor::<$entity, _>::project(
            $crate::path::FieldPath::from_segments(&[$(stringify!($segment)),+]),
            |entity: &$entity| &entity.$($segment).+,
            |entity: &mut $entity| &mut entity.$($segment).+,
        )
    };
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::accessor::{
        resolve_by_instance, resolve_by_name, resolve_by_selector, Accessor, BoundSetter,
    };
    pub use crate::lens::Lens;
    pub use crate::path::FieldPath;
    pub use crate::schema::{FieldInfo, FieldKind, Reflect, Schema, SchemaBuilder};
    pub use crate::selector;
    pub use crate::ReflectError;
}
