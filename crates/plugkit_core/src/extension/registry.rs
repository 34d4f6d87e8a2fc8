//! In-process registry of extension definitions.

use crate::extension::definition::{ExtensionAttachTo, ExtensionDefinition, ExtensionError};
use log::info;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Registered definition snapshot.
#[derive(Debug, Clone)]
pub struct RegisteredExtension {
    /// Resolved `kind:namespace/name` id.
    pub id: String,
    /// Owning plugin, used as the namespace fallback during id resolution.
    pub plugin_id: Option<String>,
    pub definition: ExtensionDefinition,
}

/// Extension definitions keyed by resolved id.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    entries: BTreeMap<String, RegisteredExtension>,
    kind_index: BTreeMap<String, BTreeSet<String>>,
    attachment_index: BTreeMap<(String, String), BTreeSet<String>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one definition and returns its resolved id.
    pub fn register(
        &mut self,
        definition: ExtensionDefinition,
        plugin_id: Option<&str>,
    ) -> Result<String, RegistryError> {
        let id = definition.resolve_id(plugin_id)?;
        if self.entries.contains_key(id.as_str()) {
            return Err(RegistryError::DuplicateExtensionId(id));
        }

        if let Some(kind) = definition.kind() {
            self.kind_index
                .entry(kind.to_string())
                .or_default()
                .insert(id.clone());
        }
        let attach_to = definition.attach_to();
        self.attachment_index
            .entry((attach_to.id.clone(), attach_to.input.clone()))
            .or_default()
            .insert(id.clone());

        info!(
            "event=extension_register module=registry status=ok id={} attach_to={}/{}",
            id, attach_to.id, attach_to.input
        );
        self.entries.insert(
            id.clone(),
            RegisteredExtension {
                id: id.clone(),
                plugin_id: plugin_id.map(str::to_string),
                definition,
            },
        );
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, extension_id: &str) -> Option<&RegisteredExtension> {
        self.entries.get(extension_id)
    }

    /// Returns sorted extension ids.
    pub fn ids(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn list_by_kind(&self, kind: &str) -> Vec<&RegisteredExtension> {
        let Some(ids) = self.kind_index.get(kind) else {
            return vec![];
        };
        ids.iter().filter_map(|id| self.entries.get(id)).collect()
    }

    /// Extensions attached to one parent input, sorted by id.
    pub fn list_attached_to(&self, attach_to: &ExtensionAttachTo) -> Vec<&RegisteredExtension> {
        let key = (attach_to.id.clone(), attach_to.input.clone());
        let Some(ids) = self.attachment_index.get(&key) else {
            return vec![];
        };
        ids.iter().filter_map(|id| self.entries.get(id)).collect()
    }
}

/// Registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidDefinition(ExtensionError),
    DuplicateExtensionId(String),
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDefinition(err) => write!(f, "invalid extension definition: {err}"),
            Self::DuplicateExtensionId(value) => {
                write!(f, "extension id already registered: {value}")
            }
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidDefinition(err) => Some(err),
            Self::DuplicateExtensionId(_) => None,
        }
    }
}

impl From<ExtensionError> for RegistryError {
    fn from(value: ExtensionError) -> Self {
        Self::InvalidDefinition(value)
    }
}
