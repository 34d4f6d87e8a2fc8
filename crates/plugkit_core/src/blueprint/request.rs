//! Per-instance requests accepted by `make` and `make_with_overrides`.

use crate::blueprint::original::OriginalFactory;
use crate::config::schema::{ConfigField, ConfigSchema};
use crate::data::data_ref::AnyExtensionDataRef;
use crate::extension::definition::{ExtensionAttachTo, ExtensionFactoryContext, FactoryResult};
use crate::extension::input::{ExtensionInput, ExtensionInputs};
use std::sync::Arc;

/// Arguments of `ExtensionBlueprint::make`.
///
/// Every `None` field falls back to the blueprint's own value.
#[derive(Debug, Clone)]
pub struct MakeRequest<P> {
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub attach_to: Option<ExtensionAttachTo>,
    pub disabled: Option<bool>,
    pub params: P,
}

impl<P> MakeRequest<P> {
    pub fn new(params: P) -> Self {
        Self {
            namespace: None,
            name: None,
            attach_to: None,
            disabled: None,
            params,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_attach_to(mut self, attach_to: ExtensionAttachTo) -> Self {
        self.attach_to = Some(attach_to);
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }
}

/// Override factory: receives the bound original factory and the runtime
/// context of the produced extension.
pub type OverrideFactory<P> =
    Arc<dyn Fn(&OriginalFactory<'_, P>, &ExtensionFactoryContext) -> FactoryResult + Send + Sync>;

/// Arguments of `ExtensionBlueprint::make_with_overrides`.
pub struct OverrideRequest<P> {
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub attach_to: Option<ExtensionAttachTo>,
    pub disabled: Option<bool>,
    /// Params used when the override calls the original factory without
    /// explicit params.
    pub params: Option<P>,
    /// Input slots added on top of the blueprint's.
    pub inputs: ExtensionInputs,
    /// Replacement output list; `None` keeps the blueprint's.
    pub output: Option<Vec<AnyExtensionDataRef>>,
    /// Config entries added on top of the blueprint's schema.
    pub config_schema: Option<ConfigSchema>,
    pub factory: OverrideFactory<P>,
}

impl<P> OverrideRequest<P> {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&OriginalFactory<'_, P>, &ExtensionFactoryContext) -> FactoryResult
            + Send
            + Sync
            + 'static,
    {
        Self {
            namespace: None,
            name: None,
            attach_to: None,
            disabled: None,
            params: None,
            inputs: ExtensionInputs::new(),
            output: None,
            config_schema: None,
            factory: Arc::new(factory),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_attach_to(mut self, attach_to: ExtensionAttachTo) -> Self {
        self.attach_to = Some(attach_to);
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    pub fn with_params(mut self, params: P) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, input: ExtensionInput) -> Self {
        self.inputs.insert(name.into(), input);
        self
    }

    pub fn with_output(mut self, output: impl IntoIterator<Item = AnyExtensionDataRef>) -> Self {
        self.output = Some(output.into_iter().collect());
        self
    }

    pub fn with_config_field(mut self, key: impl Into<String>, field: ConfigField) -> Self {
        let schema = self.config_schema.take().unwrap_or_default();
        self.config_schema = Some(schema.with_field(key, field));
        self
    }
}
