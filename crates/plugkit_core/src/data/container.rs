//! Validated container for factory output.
//!
//! # Invariants
//! - Every contained value was declared, with its value type, by the output
//!   set it was built for.
//! - Each data id appears at most once.
//! - Every non-optional declared ref is present.

use crate::data::data_ref::{AnyExtensionDataRef, ExtensionDataRef, ExtensionDataValue};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Factory output validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    /// A value was produced for an id the output set does not declare.
    Undeclared(String),
    /// The same data id was produced more than once.
    Duplicate(String),
    /// A required data ref was not produced.
    MissingRequired(String),
    /// A value was produced under a declared id with a different value type.
    TypeMismatch {
        id: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl Display for DataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undeclared(id) => {
                write!(f, "extension data `{id}` was provided but not declared")
            }
            Self::Duplicate(id) => write!(f, "extension data `{id}` was provided more than once"),
            Self::MissingRequired(id) => {
                write!(f, "missing required extension data output `{id}`")
            }
            Self::TypeMismatch {
                id,
                expected,
                found,
            } => write!(
                f,
                "extension data `{id}` was provided as `{found}` but declared as `{expected}`"
            ),
        }
    }
}

impl Error for DataError {}

/// Ordered, validated set of extension data values.
#[derive(Debug, Clone, Default)]
pub struct ExtensionDataContainer {
    values: Vec<ExtensionDataValue>,
}

impl ExtensionDataContainer {
    /// Builds a container from raw factory output, checking it against the
    /// declared output set.
    pub fn from_values(
        values: impl IntoIterator<Item = ExtensionDataValue>,
        declared: &[AnyExtensionDataRef],
    ) -> Result<Self, DataError> {
        let mut collected: Vec<ExtensionDataValue> = Vec::new();
        for value in values {
            let Some(data_ref) = declared.iter().find(|data_ref| data_ref.id == value.id()) else {
                return Err(DataError::Undeclared(value.id().to_string()));
            };
            if !data_ref.accepts(&value) {
                return Err(DataError::TypeMismatch {
                    id: value.id().to_string(),
                    expected: data_ref.type_name(),
                    found: value.type_name(),
                });
            }
            if collected.iter().any(|existing| existing.id() == value.id()) {
                return Err(DataError::Duplicate(value.id().to_string()));
            }
            collected.push(value);
        }

        for data_ref in declared {
            if data_ref.optional {
                continue;
            }
            if !collected.iter().any(|value| value.id() == data_ref.id) {
                return Err(DataError::MissingRequired(data_ref.id.clone()));
            }
        }

        Ok(Self { values: collected })
    }

    /// Returns the typed value for `data_ref`, if present.
    pub fn get<T: 'static>(&self, data_ref: &ExtensionDataRef<T>) -> Option<&T> {
        self.values
            .iter()
            .find(|value| value.id() == data_ref.id())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.values.iter().any(|value| value.id() == id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtensionDataValue> {
        self.values.iter()
    }

    /// Returns produced data ids in output order.
    pub fn ids(&self) -> Vec<&str> {
        self.values.iter().map(|value| value.id()).collect()
    }

    /// Consumes the container, returning values for re-emission.
    pub fn into_values(self) -> Vec<ExtensionDataValue> {
        self.values
    }
}

impl IntoIterator for ExtensionDataContainer {
    type Item = ExtensionDataValue;
    type IntoIter = std::vec::IntoIter<ExtensionDataValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
