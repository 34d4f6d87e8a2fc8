//! Typed extension data references and type-erased data values.

use serde::Serialize;
use std::any::{type_name, Any, TypeId};
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::sync::Arc;

/// Typed tag identifying one category of value an extension can produce.
///
/// At runtime a ref is its `id`, the `optional` flag and the `TypeId` of `T`,
/// so erased output sets can still reject values of the wrong type.
pub struct ExtensionDataRef<T> {
    id: String,
    optional: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ExtensionDataRef<T> {
    /// Creates a required data ref with a stable id, e.g. `core.routing.path`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            optional: false,
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Returns a copy of this ref that may be omitted from factory output.
    pub fn optional(&self) -> Self {
        Self {
            id: self.id.clone(),
            optional: true,
            _marker: PhantomData,
        }
    }
}

impl<T: 'static> ExtensionDataRef<T> {
    /// Erases the value type for use in output and input declarations.
    pub fn any(&self) -> AnyExtensionDataRef {
        AnyExtensionDataRef {
            id: self.id.clone(),
            optional: self.optional,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }
}

impl<T: Send + Sync + 'static> ExtensionDataRef<T> {
    /// Wraps one produced value under this ref's id.
    pub fn value(&self, value: T) -> ExtensionDataValue {
        ExtensionDataValue {
            id: self.id.clone(),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            value: Arc::new(value),
        }
    }
}

impl<T> Clone for ExtensionDataRef<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            optional: self.optional,
            _marker: PhantomData,
        }
    }
}

impl<T> Debug for ExtensionDataRef<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionDataRef")
            .field("id", &self.id)
            .field("optional", &self.optional)
            .finish()
    }
}

impl<T> PartialEq for ExtensionDataRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.optional == other.optional
    }
}

impl<T> Eq for ExtensionDataRef<T> {}

/// Type-erased data ref used in declarations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AnyExtensionDataRef {
    pub id: String,
    pub optional: bool,
    #[serde(skip)]
    type_id: TypeId,
    #[serde(rename = "type")]
    type_name: &'static str,
}

impl AnyExtensionDataRef {
    /// Returns whether `value` was produced under this ref's id and type.
    pub fn accepts(&self, value: &ExtensionDataValue) -> bool {
        self.id == value.id && self.type_id == value.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// One produced value tagged with the id of the ref that created it.
#[derive(Clone)]
pub struct ExtensionDataValue {
    id: String,
    type_id: TypeId,
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl ExtensionDataValue {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Downcasts the payload; `None` when `T` is not the stored type.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl Debug for ExtensionDataValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionDataValue")
            .field("id", &self.id)
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}
