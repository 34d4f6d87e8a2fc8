//! Bound original factory handed to override factories.
//!
//! # Invariants
//! - Output of the original factory is validated against the blueprint's
//!   own declared output, never the override's.
//! - Explicit params win over the request's default params.
//! - Config and input overrides win over the ambient context.

use crate::blueprint::factory::BlueprintShape;
use crate::config::schema::ConfigValues;
use crate::data::container::ExtensionDataContainer;
use crate::extension::definition::{ExtensionError, ExtensionFactoryContext};
use crate::extension::input::{resolve_input_overrides, InputOverrides};
use log::debug;
use std::sync::Arc;

/// Partial context overrides for one original factory call.
#[derive(Debug, Clone, Default)]
pub struct OriginalContext {
    /// Shallow-merged over the ambient config.
    pub config: Option<ConfigValues>,
    /// Replacement data for declared blueprint inputs.
    pub inputs: Option<InputOverrides>,
}

impl OriginalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: ConfigValues) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_inputs(mut self, inputs: InputOverrides) -> Self {
        self.inputs = Some(inputs);
        self
    }
}

/// Callable that re-invokes the blueprint factory inside an override.
///
/// Built fresh for every factory run; it borrows the ambient context of
/// that run.
pub struct OriginalFactory<'a, P> {
    pub(crate) shape: &'a BlueprintShape<P>,
    pub(crate) default_params: Option<&'a P>,
    pub(crate) context: &'a ExtensionFactoryContext,
}

impl<'a, P> OriginalFactory<'a, P> {
    /// Calls the original factory with default params and ambient context.
    pub fn call(&self) -> Result<ExtensionDataContainer, ExtensionError> {
        self.call_with(None, OriginalContext::default())
    }

    /// Calls the original factory with explicit params.
    pub fn call_with_params(&self, params: &P) -> Result<ExtensionDataContainer, ExtensionError> {
        self.call_with(Some(params), OriginalContext::default())
    }

    /// Calls the original factory with optional params and context overrides.
    ///
    /// # Errors
    /// - `MissingParams` when neither `params` nor default params exist.
    /// - `Input` when input overrides do not fit the blueprint's inputs.
    /// - Any error of the original factory, or `Data` when its output does
    ///   not match the blueprint's declared output.
    pub fn call_with(
        &self,
        params: Option<&P>,
        overrides: OriginalContext,
    ) -> Result<ExtensionDataContainer, ExtensionError> {
        let params = params
            .or(self.default_params)
            .ok_or_else(|| ExtensionError::MissingParams {
                kind: self.shape.kind.clone(),
            })?;

        let config = match &overrides.config {
            Some(config) => self.context.config.merged_with(config),
            None => self.context.config.clone(),
        };
        let inputs = resolve_input_overrides(
            &self.shape.inputs,
            &self.context.inputs,
            overrides.inputs.as_ref(),
        )?;

        let context = ExtensionFactoryContext {
            node: self.context.node.clone(),
            apis: Arc::clone(&self.context.apis),
            config,
            inputs,
        };
        let values = (self.shape.factory)(params, &context)?;
        let container = ExtensionDataContainer::from_values(values, &self.shape.output)?;

        debug!(
            "event=blueprint_original_call module=blueprint status=ok kind={} node={} outputs={}",
            self.shape.kind,
            context.node.id,
            container.len()
        );
        Ok(container)
    }
}
