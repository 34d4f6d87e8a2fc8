//! Extension input slots, resolved inputs and input override resolution.
//!
//! # Responsibility
//! - Declare which data an extension expects from attached children.
//! - Replace resolved input data with caller-provided overrides while
//!   keeping the original node identity.
//!
//! # Invariants
//! - A singleton override requires the original singleton input to exist.
//! - A multiple-input override must supply exactly one entry per original
//!   attachment, in order.
//! - Inputs without an override pass through unchanged.

use crate::data::container::{DataError, ExtensionDataContainer};
use crate::data::data_ref::{AnyExtensionDataRef, ExtensionDataRef, ExtensionDataValue};
use crate::extension::definition::AppNode;
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Declared input slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionInput {
    /// Data every attached child must provide.
    pub extension_data: Vec<AnyExtensionDataRef>,
    /// At most one child may attach.
    pub singleton: bool,
    /// For singleton inputs, whether the child may be absent.
    pub optional: bool,
}

impl ExtensionInput {
    pub fn new(extension_data: impl IntoIterator<Item = AnyExtensionDataRef>) -> Self {
        Self {
            extension_data: extension_data.into_iter().collect(),
            singleton: false,
            optional: false,
        }
    }

    pub fn singleton(mut self) -> Self {
        self.singleton = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Named input slot declarations.
pub type ExtensionInputs = BTreeMap<String, ExtensionInput>;

/// Output of one attached child, as seen by its parent.
#[derive(Debug, Clone)]
pub struct ResolvedInputItem {
    pub node: AppNode,
    pub data: ExtensionDataContainer,
}

impl ResolvedInputItem {
    pub fn new(node: AppNode, data: ExtensionDataContainer) -> Self {
        Self { node, data }
    }

    pub fn get<T: 'static>(&self, data_ref: &ExtensionDataRef<T>) -> Option<&T> {
        self.data.get(data_ref)
    }
}

/// Resolved data for one input slot.
#[derive(Debug, Clone)]
pub enum ResolvedInput {
    Singleton(Option<ResolvedInputItem>),
    Multiple(Vec<ResolvedInputItem>),
}

impl ResolvedInput {
    pub fn is_singleton(&self) -> bool {
        matches!(self, Self::Singleton(_))
    }

    /// Attached items in order; zero or one for singleton inputs.
    pub fn items(&self) -> &[ResolvedInputItem] {
        match self {
            Self::Singleton(Some(item)) => std::slice::from_ref(item),
            Self::Singleton(None) => &[],
            Self::Multiple(items) => items.as_slice(),
        }
    }
}

/// Resolved data for every input slot of one extension instance.
#[derive(Debug, Clone, Default)]
pub struct ResolvedInputs {
    inputs: BTreeMap<String, ResolvedInput>,
}

impl ResolvedInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, name: impl Into<String>, input: ResolvedInput) -> Self {
        self.inputs.insert(name.into(), input);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, input: ResolvedInput) {
        self.inputs.insert(name.into(), input);
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedInput> {
        self.inputs.get(name)
    }

    /// The attached singleton item, if any.
    pub fn singleton(&self, name: &str) -> Option<&ResolvedInputItem> {
        match self.inputs.get(name) {
            Some(ResolvedInput::Singleton(item)) => item.as_ref(),
            _ => None,
        }
    }

    /// Attached items of `name`; empty when the slot has nothing attached.
    pub fn items(&self, name: &str) -> &[ResolvedInputItem] {
        self.inputs
            .get(name)
            .map(ResolvedInput::items)
            .unwrap_or(&[])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inputs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// Replacement data for one input slot.
#[derive(Debug, Clone)]
pub enum InputOverride {
    Singleton(Vec<ExtensionDataValue>),
    Multiple(Vec<Vec<ExtensionDataValue>>),
}

/// Named input overrides supplied to an original factory call.
pub type InputOverrides = BTreeMap<String, InputOverride>;

/// Returns `inputs` with the data of every overridden slot replaced.
///
/// # Errors
/// - `Undeclared` when an override names a slot not in `declared`.
/// - `ShapeMismatch` when the override kind does not match the slot kind.
/// - `NotPresent` when a singleton override has no original to replace.
/// - `LengthMismatch` when a multiple override has the wrong entry count.
/// - `Data` when override values do not satisfy the slot's data refs.
pub fn resolve_input_overrides(
    declared: &ExtensionInputs,
    inputs: &ResolvedInputs,
    overrides: Option<&InputOverrides>,
) -> Result<ResolvedInputs, InputError> {
    let Some(overrides) = overrides else {
        return Ok(inputs.clone());
    };

    let mut resolved = inputs.clone();
    for (name, input_override) in overrides {
        let Some(slot) = declared.get(name.as_str()) else {
            return Err(InputError::Undeclared(name.clone()));
        };

        let replacement = match (slot.singleton, input_override) {
            (true, InputOverride::Singleton(values)) => {
                let original = inputs
                    .singleton(name)
                    .ok_or_else(|| InputError::NotPresent(name.clone()))?;
                let data = build_container(name, values.clone(), slot)?;
                ResolvedInput::Singleton(Some(ResolvedInputItem::new(
                    original.node.clone(),
                    data,
                )))
            }
            (false, InputOverride::Multiple(entries)) => {
                let originals = inputs.items(name);
                if originals.len() != entries.len() {
                    return Err(InputError::LengthMismatch {
                        name: name.clone(),
                        expected: originals.len(),
                        actual: entries.len(),
                    });
                }
                let mut items = Vec::with_capacity(entries.len());
                for (original, values) in originals.iter().zip(entries) {
                    let data = build_container(name, values.clone(), slot)?;
                    items.push(ResolvedInputItem::new(original.node.clone(), data));
                }
                ResolvedInput::Multiple(items)
            }
            (true, InputOverride::Multiple(_)) => {
                return Err(InputError::ShapeMismatch {
                    name: name.clone(),
                    expected: "singleton",
                })
            }
            (false, InputOverride::Singleton(_)) => {
                return Err(InputError::ShapeMismatch {
                    name: name.clone(),
                    expected: "multiple",
                })
            }
        };
        resolved.insert(name.clone(), replacement);
    }
    Ok(resolved)
}

fn build_container(
    name: &str,
    values: Vec<ExtensionDataValue>,
    slot: &ExtensionInput,
) -> Result<ExtensionDataContainer, InputError> {
    ExtensionDataContainer::from_values(values, &slot.extension_data).map_err(|source| {
        InputError::Data {
            name: name.to_string(),
            source,
        }
    })
}

/// Input declaration and resolution errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    Undeclared(String),
    ShapeMismatch {
        name: String,
        expected: &'static str,
    },
    NotPresent(String),
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    MissingRequired(String),
    Data {
        name: String,
        source: DataError,
    },
}

impl Display for InputError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Undeclared(name) => write!(f, "input `{name}` is not declared"),
            Self::ShapeMismatch { name, expected } => {
                write!(f, "override for input `{name}` must be {expected}")
            }
            Self::NotPresent(name) => write!(
                f,
                "attempted to override data of input `{name}` but it is not present in the original inputs"
            ),
            Self::LengthMismatch {
                name,
                expected,
                actual,
            } => write!(
                f,
                "override data provided for input `{name}` must match the length of the original inputs: expected {expected}, got {actual}"
            ),
            Self::MissingRequired(name) => {
                write!(f, "expected exactly one `{name}` input but received none")
            }
            Self::Data { name, source } => write!(f, "invalid data for input `{name}`: {source}"),
        }
    }
}

impl Error for InputError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Data { source, .. } => Some(source),
            _ => None,
        }
    }
}
