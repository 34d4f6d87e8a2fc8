//! Capability lookup for extension factories.
//!
//! Extensions fetch shared services through an `ApiHolder` using typed
//! `ApiRef`s. The holder is opaque to the blueprint layer; it is threaded
//! through factory contexts unchanged.

use once_cell::sync::Lazy;
use regex::Regex;
use std::any::Any;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::marker::PhantomData;
use std::sync::Arc;

static API_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9]*(?:-[a-z0-9]+)*(?:\.[a-z][a-z0-9]*(?:-[a-z0-9]+)*)*$")
        .expect("valid api id regex")
});

/// Typed reference to one shared service implementation.
pub struct ApiRef<T: ?Sized> {
    id: String,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized> ApiRef<T> {
    /// Creates an api ref with a dot-separated lowercase id, e.g.
    /// `core.config` or `plugin.catalog-client`.
    pub fn new(id: impl Into<String>) -> Result<Self, ApiRefError> {
        let id = id.into();
        let normalized = id.trim();
        if normalized.is_empty() {
            return Err(ApiRefError::EmptyId);
        }
        if !API_ID_RE.is_match(normalized) {
            return Err(ApiRefError::InvalidId(normalized.to_string()));
        }
        Ok(Self {
            id: normalized.to_string(),
            _marker: PhantomData,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<T: ?Sized> Clone for ApiRef<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> Debug for ApiRef<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiRef{{{}}}", self.id)
    }
}

/// Api ref construction errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRefError {
    EmptyId,
    InvalidId(String),
}

impl Display for ApiRefError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "api id must not be empty"),
            Self::InvalidId(value) => write!(
                f,
                "api id is invalid: {value} (expected dot-separated lowercase segments)"
            ),
        }
    }
}

impl Error for ApiRefError {}

/// Runtime service lookup used by extension factories.
pub trait ApiHolder: Send + Sync {
    /// Returns the erased implementation registered under `id`.
    ///
    /// Implementations store an `Arc<T>` inside the erased value.
    fn get_erased(&self, id: &str) -> Option<Arc<dyn Any + Send + Sync>>;
}

impl<'a> dyn ApiHolder + 'a {
    /// Typed lookup; `None` when missing or registered with another type.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self, api_ref: &ApiRef<T>) -> Option<Arc<T>> {
        let erased = self.get_erased(api_ref.id())?;
        erased.downcast_ref::<Arc<T>>().cloned()
    }
}

/// In-process api implementation registry.
#[derive(Default)]
pub struct ApiRegistry {
    apis: BTreeMap<String, Arc<dyn Any + Send + Sync>>,
}

impl ApiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one implementation for `api_ref`.
    pub fn register<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        api_ref: &ApiRef<T>,
        implementation: Arc<T>,
    ) -> Result<(), ApiRegistryError> {
        if self.apis.contains_key(api_ref.id()) {
            return Err(ApiRegistryError::DuplicateApiId(api_ref.id().to_string()));
        }
        self.apis
            .insert(api_ref.id().to_string(), Arc::new(implementation));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.apis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apis.is_empty()
    }

    /// Returns sorted registered api ids.
    pub fn api_ids(&self) -> Vec<String> {
        self.apis.keys().cloned().collect()
    }
}

impl ApiHolder for ApiRegistry {
    fn get_erased(&self, id: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.apis.get(id).cloned()
    }
}

impl Debug for ApiRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRegistry")
            .field("apis", &self.apis.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Api registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRegistryError {
    DuplicateApiId(String),
}

impl Display for ApiRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateApiId(value) => write!(f, "api id already registered: {value}"),
        }
    }
}

impl Error for ApiRegistryError {}
