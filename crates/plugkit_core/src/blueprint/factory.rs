//! Extension blueprints: reusable, parameterized extension templates.
//!
//! # Responsibility
//! - Capture a fixed kind plus default wiring (attachment, inputs, output,
//!   config schema) and a parameterized factory.
//! - Produce extension definitions with `make` (fixed params) and
//!   `make_with_overrides` (layered inputs, output, config and factory).
//!
//! # Invariants
//! - The blueprint kind is carried unchanged by every produced definition.
//! - Only namespace/name/attach_to/disabled/params vary per instance.
//! - `make_with_overrides` never silently drops or shadows a blueprint input
//!   or config key: collisions are reported as `BlueprintError`.

use crate::blueprint::original::OriginalFactory;
use crate::blueprint::request::{MakeRequest, OverrideRequest};
use crate::config::schema::{ConfigError, ConfigField, ConfigSchema};
use crate::data::data_ref::AnyExtensionDataRef;
use crate::extension::definition::{
    create_extension, ExtensionAttachTo, ExtensionDefinition, ExtensionError, ExtensionFactory,
    ExtensionFactoryContext, ExtensionOptions, FactoryResult,
};
use crate::extension::input::{ExtensionInput, ExtensionInputs};
use log::debug;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::marker::PhantomData;
use std::sync::Arc;

/// Parameterized blueprint factory.
pub type BlueprintFactory<P> =
    Arc<dyn Fn(&P, &ExtensionFactoryContext) -> FactoryResult + Send + Sync>;

/// Declared shape shared by a blueprint and the definitions it produces.
pub(crate) struct BlueprintShape<P> {
    pub(crate) kind: String,
    pub(crate) namespace: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) attach_to: ExtensionAttachTo,
    pub(crate) disabled: bool,
    pub(crate) inputs: ExtensionInputs,
    pub(crate) output: Vec<AnyExtensionDataRef>,
    pub(crate) config_schema: Option<ConfigSchema>,
    pub(crate) data_refs: BTreeMap<String, AnyExtensionDataRef>,
    pub(crate) factory: BlueprintFactory<P>,
}

/// Reusable extension template with params of type `P`.
pub struct ExtensionBlueprint<P> {
    shape: Arc<BlueprintShape<P>>,
}

impl<P> Clone for ExtensionBlueprint<P> {
    fn clone(&self) -> Self {
        Self {
            shape: Arc::clone(&self.shape),
        }
    }
}

impl<P> Debug for ExtensionBlueprint<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionBlueprint")
            .field("kind", &self.shape.kind)
            .field("namespace", &self.shape.namespace)
            .field("name", &self.shape.name)
            .field("attach_to", &self.shape.attach_to)
            .field("disabled", &self.shape.disabled)
            .field("inputs", &self.shape.inputs)
            .field("output", &self.shape.output)
            .field("config_schema", &self.shape.config_schema)
            .finish_non_exhaustive()
    }
}

/// Builder returned by `ExtensionBlueprint::builder`; finished by `factory`.
pub struct ExtensionBlueprintBuilder<P> {
    kind: String,
    namespace: Option<String>,
    name: Option<String>,
    attach_to: ExtensionAttachTo,
    disabled: bool,
    inputs: ExtensionInputs,
    output: Vec<AnyExtensionDataRef>,
    config_schema: Option<ConfigSchema>,
    data_refs: BTreeMap<String, AnyExtensionDataRef>,
    _params: PhantomData<fn(&P)>,
}

impl<P> ExtensionBlueprintBuilder<P> {
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn input(mut self, name: impl Into<String>, input: ExtensionInput) -> Self {
        self.inputs.insert(name.into(), input);
        self
    }

    pub fn output(mut self, data_ref: AnyExtensionDataRef) -> Self {
        self.output.push(data_ref);
        self
    }

    pub fn config_field(mut self, key: impl Into<String>, field: ConfigField) -> Self {
        let schema = self.config_schema.take().unwrap_or_default();
        self.config_schema = Some(schema.with_field(key, field));
        self
    }

    /// Publishes an auxiliary data ref under `name`, e.g. for children.
    pub fn data_ref(mut self, name: impl Into<String>, data_ref: AnyExtensionDataRef) -> Self {
        self.data_refs.insert(name.into(), data_ref);
        self
    }

    /// Finishes the blueprint with its factory.
    pub fn factory<F>(self, factory: F) -> ExtensionBlueprint<P>
    where
        F: Fn(&P, &ExtensionFactoryContext) -> FactoryResult + Send + Sync + 'static,
    {
        ExtensionBlueprint {
            shape: Arc::new(BlueprintShape {
                kind: self.kind,
                namespace: self.namespace,
                name: self.name,
                attach_to: self.attach_to,
                disabled: self.disabled,
                inputs: self.inputs,
                output: self.output,
                config_schema: self.config_schema,
                data_refs: self.data_refs,
                factory: Arc::new(factory),
            }),
        }
    }
}

impl<P> ExtensionBlueprint<P> {
    /// Starts declaring a blueprint of `kind` attached to `attach_to`.
    pub fn builder(
        kind: impl Into<String>,
        attach_to: ExtensionAttachTo,
    ) -> ExtensionBlueprintBuilder<P> {
        ExtensionBlueprintBuilder {
            kind: kind.into(),
            namespace: None,
            name: None,
            attach_to,
            disabled: false,
            inputs: ExtensionInputs::new(),
            output: Vec::new(),
            config_schema: None,
            data_refs: BTreeMap::new(),
            _params: PhantomData,
        }
    }

    pub fn kind(&self) -> &str {
        &self.shape.kind
    }

    pub fn namespace(&self) -> Option<&str> {
        self.shape.namespace.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.shape.name.as_deref()
    }

    pub fn attach_to(&self) -> &ExtensionAttachTo {
        &self.shape.attach_to
    }

    pub fn disabled(&self) -> bool {
        self.shape.disabled
    }

    pub fn inputs(&self) -> &ExtensionInputs {
        &self.shape.inputs
    }

    pub fn output(&self) -> &[AnyExtensionDataRef] {
        &self.shape.output
    }

    pub fn config_schema(&self) -> Option<&ConfigSchema> {
        self.shape.config_schema.as_ref()
    }

    pub fn data_refs(&self) -> &BTreeMap<String, AnyExtensionDataRef> {
        &self.shape.data_refs
    }

    pub fn data_ref(&self, name: &str) -> Option<&AnyExtensionDataRef> {
        self.shape.data_refs.get(name)
    }
}

impl<P: Send + Sync + 'static> ExtensionBlueprint<P> {
    /// Instantiates the blueprint with fixed params.
    ///
    /// Errors of the extension construction primitive propagate unchanged.
    pub fn make(&self, request: MakeRequest<P>) -> Result<ExtensionDefinition, ExtensionError> {
        let shape = &self.shape;
        let params = Arc::new(request.params);
        let blueprint_factory = Arc::clone(&shape.factory);
        let factory: ExtensionFactory = Arc::new(move |context: &ExtensionFactoryContext| {
            blueprint_factory(params.as_ref(), context)
        });

        let definition = create_extension(ExtensionOptions {
            kind: Some(shape.kind.clone()),
            namespace: request.namespace.or_else(|| shape.namespace.clone()),
            name: request.name.or_else(|| shape.name.clone()),
            attach_to: request
                .attach_to
                .unwrap_or_else(|| shape.attach_to.clone()),
            disabled: request.disabled.unwrap_or(shape.disabled),
            inputs: shape.inputs.clone(),
            output: shape.output.clone(),
            config_schema: shape.config_schema.clone(),
            factory,
        })?;

        debug!(
            "event=blueprint_make module=blueprint status=ok kind={} name={}",
            shape.kind,
            definition.name().unwrap_or("-")
        );
        Ok(definition)
    }

    /// Instantiates the blueprint with layered inputs, output, config and
    /// factory.
    ///
    /// # Errors
    /// - `InputConflict` when the request re-declares a blueprint input.
    /// - `ConfigConflict` when the request re-declares a blueprint config key.
    /// - `Extension` for errors of the extension construction primitive.
    pub fn make_with_overrides(
        &self,
        request: OverrideRequest<P>,
    ) -> Result<ExtensionDefinition, BlueprintError> {
        let shape = &self.shape;

        let mut inputs = shape.inputs.clone();
        for (name, input) in request.inputs {
            if inputs.contains_key(name.as_str()) {
                return Err(BlueprintError::InputConflict(name));
            }
            inputs.insert(name, input);
        }

        let config_schema = match (&shape.config_schema, &request.config_schema) {
            (Some(base), Some(extra)) => {
                Some(base.union(extra).map_err(BlueprintError::ConfigConflict)?)
            }
            (Some(base), None) => Some(base.clone()),
            (None, Some(extra)) => Some(extra.clone()),
            (None, None) => None,
        };

        let output = request.output.unwrap_or_else(|| shape.output.clone());

        let original_shape = Arc::clone(shape);
        let default_params = request.params.map(Arc::new);
        let override_factory = request.factory;
        let factory: ExtensionFactory = Arc::new(move |context: &ExtensionFactoryContext| {
            let original = OriginalFactory {
                shape: original_shape.as_ref(),
                default_params: default_params.as_deref(),
                context,
            };
            override_factory(&original, context)
        });

        let definition = create_extension(ExtensionOptions {
            kind: Some(shape.kind.clone()),
            namespace: request.namespace.or_else(|| shape.namespace.clone()),
            name: request.name.or_else(|| shape.name.clone()),
            attach_to: request
                .attach_to
                .unwrap_or_else(|| shape.attach_to.clone()),
            disabled: request.disabled.unwrap_or(shape.disabled),
            inputs,
            output,
            config_schema,
            factory,
        })?;

        debug!(
            "event=blueprint_make_with_overrides module=blueprint status=ok kind={} name={} inputs={}",
            shape.kind,
            definition.name().unwrap_or("-"),
            definition.inputs().len()
        );
        Ok(definition)
    }
}

/// Errors specific to layering overrides on a blueprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlueprintError {
    /// The override re-declares an input the blueprint already declares.
    InputConflict(String),
    /// The override re-declares a config key the blueprint already declares.
    ConfigConflict(ConfigError),
    Extension(ExtensionError),
}

impl Display for BlueprintError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InputConflict(name) => write!(
                f,
                "override input `{name}` is already declared by the blueprint"
            ),
            Self::ConfigConflict(err) => write!(f, "override config conflicts with blueprint: {err}"),
            Self::Extension(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BlueprintError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InputConflict(_) => None,
            Self::ConfigConflict(err) => Some(err),
            Self::Extension(err) => Some(err),
        }
    }
}

impl From<ExtensionError> for BlueprintError {
    fn from(value: ExtensionError) -> Self {
        Self::Extension(value)
    }
}
