//! Extension definitions and the extension construction primitive.
//!
//! # Responsibility
//! - Build attachable `ExtensionDefinition`s from declarations.
//! - Resolve stable extension ids (`kind:namespace/name`).
//! - Run one instantiation pass: parse config, check inputs, run the
//!   factory and validate its output.
//!
//! # Invariants
//! - A definition is immutable once created; clones share the factory.
//! - Factory output is always validated against the definition's declared
//!   output before it reaches callers of `instantiate`.

use crate::api::ApiHolder;
use crate::config::schema::{ConfigError, ConfigSchema, ConfigValues};
use crate::data::container::{DataError, ExtensionDataContainer};
use crate::data::data_ref::{AnyExtensionDataRef, ExtensionDataValue};
use crate::extension::input::{ExtensionInputs, InputError, ResolvedInputs};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// Parent extension and input slot an extension attaches to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtensionAttachTo {
    pub id: String,
    pub input: String,
}

impl ExtensionAttachTo {
    pub fn new(id: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            input: input.into(),
        }
    }
}

/// Opaque handle of one node in the host's extension tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppNode {
    pub id: String,
    pub attach_to: Option<ExtensionAttachTo>,
    pub disabled: bool,
}

impl AppNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attach_to: None,
            disabled: false,
        }
    }

    /// Builds the node handle for `definition` under its resolved id.
    pub fn for_definition(
        definition: &ExtensionDefinition,
        fallback_namespace: Option<&str>,
    ) -> Result<Self, ExtensionError> {
        Ok(Self {
            id: definition.resolve_id(fallback_namespace)?,
            attach_to: Some(definition.attach_to().clone()),
            disabled: definition.disabled(),
        })
    }
}

/// Runtime context handed to extension factories.
#[derive(Clone)]
pub struct ExtensionFactoryContext {
    pub node: AppNode,
    pub apis: Arc<dyn ApiHolder>,
    pub config: ConfigValues,
    pub inputs: ResolvedInputs,
}

impl Debug for ExtensionFactoryContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionFactoryContext")
            .field("node", &self.node)
            .field("config", &self.config)
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

/// Raw factory output, validated by the caller against a declared output.
pub type FactoryResult = Result<Vec<ExtensionDataValue>, ExtensionError>;

/// Shared extension factory.
pub type ExtensionFactory = Arc<dyn Fn(&ExtensionFactoryContext) -> FactoryResult + Send + Sync>;

/// Declaration accepted by `create_extension`.
pub struct ExtensionOptions {
    pub kind: Option<String>,
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub attach_to: ExtensionAttachTo,
    pub disabled: bool,
    pub inputs: ExtensionInputs,
    pub output: Vec<AnyExtensionDataRef>,
    pub config_schema: Option<ConfigSchema>,
    pub factory: ExtensionFactory,
}

/// Fully specified, attachable extension.
#[derive(Clone)]
pub struct ExtensionDefinition {
    kind: Option<String>,
    namespace: Option<String>,
    name: Option<String>,
    attach_to: ExtensionAttachTo,
    disabled: bool,
    inputs: ExtensionInputs,
    output: Vec<AnyExtensionDataRef>,
    config_schema: Option<ConfigSchema>,
    factory: ExtensionFactory,
}

/// Creates one extension definition from a declaration.
///
/// # Errors
/// - `InvalidKind` when `kind` is present but blank.
/// - `DuplicateOutput` when the output list names one data id twice.
/// - `DuplicateInputData` when an input slot names one data id twice.
pub fn create_extension(options: ExtensionOptions) -> Result<ExtensionDefinition, ExtensionError> {
    if let Some(kind) = options.kind.as_deref() {
        if kind.trim().is_empty() {
            return Err(ExtensionError::InvalidKind(kind.to_string()));
        }
    }

    let mut seen = BTreeSet::new();
    for data_ref in &options.output {
        if !seen.insert(data_ref.id.as_str()) {
            return Err(ExtensionError::DuplicateOutput(data_ref.id.clone()));
        }
    }

    for (input_name, input) in &options.inputs {
        let mut seen = BTreeSet::new();
        for data_ref in &input.extension_data {
            if !seen.insert(data_ref.id.as_str()) {
                return Err(ExtensionError::DuplicateInputData {
                    input: input_name.clone(),
                    id: data_ref.id.clone(),
                });
            }
        }
    }

    debug!(
        "event=extension_create module=extension status=ok kind={} attach_to={}/{} inputs={} outputs={}",
        options.kind.as_deref().unwrap_or("-"),
        options.attach_to.id,
        options.attach_to.input,
        options.inputs.len(),
        options.output.len()
    );

    Ok(ExtensionDefinition {
        kind: options.kind,
        namespace: options.namespace,
        name: options.name,
        attach_to: options.attach_to,
        disabled: options.disabled,
        inputs: options.inputs,
        output: options.output,
        config_schema: options.config_schema,
        factory: options.factory,
    })
}

/// Arguments for one instantiation pass.
pub struct InstantiateArgs<'a> {
    pub node: AppNode,
    pub apis: Arc<dyn ApiHolder>,
    /// Raw, unvalidated config for this instance.
    pub config: Option<&'a Value>,
    pub inputs: ResolvedInputs,
}

impl ExtensionDefinition {
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn attach_to(&self) -> &ExtensionAttachTo {
        &self.attach_to
    }

    pub fn disabled(&self) -> bool {
        self.disabled
    }

    pub fn inputs(&self) -> &ExtensionInputs {
        &self.inputs
    }

    pub fn output(&self) -> &[AnyExtensionDataRef] {
        &self.output
    }

    pub fn config_schema(&self) -> Option<&ConfigSchema> {
        self.config_schema.as_ref()
    }

    /// Resolves the extension id.
    ///
    /// `fallback_namespace` (usually the owning plugin id) is used when the
    /// definition declares no namespace of its own.
    pub fn resolve_id(&self, fallback_namespace: Option<&str>) -> Result<String, ExtensionError> {
        let namespace = self
            .namespace
            .as_deref()
            .or(fallback_namespace)
            .filter(|value| !value.trim().is_empty());
        let name = self.name.as_deref().filter(|value| !value.trim().is_empty());

        let name_part = match (namespace, name) {
            (Some(namespace), Some(name)) => format!("{namespace}/{name}"),
            (Some(namespace), None) => namespace.to_string(),
            (None, Some(name)) => name.to_string(),
            (None, None) => {
                return Err(ExtensionError::UnresolvableId {
                    kind: self.kind.clone(),
                })
            }
        };

        Ok(match self.kind.as_deref() {
            Some(kind) => format!("{kind}:{name_part}"),
            None => name_part,
        })
    }

    fn run_factory(&self, context: &ExtensionFactoryContext) -> FactoryResult {
        (self.factory)(context)
    }

    /// Runs one instantiation pass and returns the validated output.
    pub fn instantiate(
        &self,
        args: InstantiateArgs<'_>,
    ) -> Result<ExtensionDataContainer, ExtensionError> {
        let config = match &self.config_schema {
            Some(schema) => schema.parse(args.config)?,
            None => ConfigValues::new(),
        };

        for (name, slot) in &self.inputs {
            if slot.singleton && !slot.optional && args.inputs.singleton(name).is_none() {
                return Err(InputError::MissingRequired(name.clone()).into());
            }
        }

        let context = ExtensionFactoryContext {
            node: args.node,
            apis: args.apis,
            config,
            inputs: args.inputs,
        };
        let values = self.run_factory(&context)?;
        let container = ExtensionDataContainer::from_values(values, &self.output)?;

        debug!(
            "event=extension_instantiate module=extension status=ok node={} outputs={}",
            context.node.id,
            container.len()
        );
        Ok(container)
    }

    /// Serializable snapshot of the declared shape.
    pub fn summary(&self) -> ExtensionSummary {
        ExtensionSummary {
            kind: self.kind.clone(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
            attach_to: self.attach_to.clone(),
            disabled: self.disabled,
            inputs: self.inputs.clone(),
            output: self.output.clone(),
            config_schema: self.config_schema.clone(),
        }
    }
}

impl Debug for ExtensionDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionDefinition")
            .field("kind", &self.kind)
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("attach_to", &self.attach_to)
            .field("disabled", &self.disabled)
            .field("inputs", &self.inputs)
            .field("output", &self.output)
            .field("config_schema", &self.config_schema)
            .finish_non_exhaustive()
    }
}

/// Declared shape of one extension definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtensionSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub attach_to: ExtensionAttachTo,
    pub disabled: bool,
    pub inputs: ExtensionInputs,
    pub output: Vec<AnyExtensionDataRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_schema: Option<ConfigSchema>,
}

/// Extension construction and instantiation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionError {
    InvalidKind(String),
    UnresolvableId { kind: Option<String> },
    DuplicateOutput(String),
    DuplicateInputData { input: String, id: String },
    /// An original factory was invoked without explicit or default params.
    MissingParams { kind: String },
    Config(ConfigError),
    Data(DataError),
    Input(InputError),
    /// Failure reported by a user-supplied factory.
    Factory(String),
}

impl ExtensionError {
    pub fn factory(message: impl Into<String>) -> Self {
        Self::Factory(message.into())
    }
}

impl Display for ExtensionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKind(value) => write!(f, "extension kind is invalid: `{value}`"),
            Self::UnresolvableId { kind } => write!(
                f,
                "extension must declare an explicit namespace or name as it could not be resolved from context, kind={}",
                kind.as_deref().unwrap_or("-")
            ),
            Self::DuplicateOutput(id) => write!(f, "extension output is declared twice: {id}"),
            Self::DuplicateInputData { input, id } => {
                write!(f, "input `{input}` declares extension data `{id}` twice")
            }
            Self::MissingParams { kind } => write!(
                f,
                "original factory of blueprint `{kind}` was called without params and no default params exist"
            ),
            Self::Config(err) => write!(f, "invalid extension config: {err}"),
            Self::Data(err) => write!(f, "invalid extension output: {err}"),
            Self::Input(err) => write!(f, "invalid extension input: {err}"),
            Self::Factory(message) => write!(f, "extension factory failed: {message}"),
        }
    }
}

impl Error for ExtensionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Data(err) => Some(err),
            Self::Input(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigError> for ExtensionError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DataError> for ExtensionError {
    fn from(value: DataError) -> Self {
        Self::Data(value)
    }
}

impl From<InputError> for ExtensionError {
    fn from(value: InputError) -> Self {
        Self::Input(value)
    }
}
