//! Extension blueprint toolkit for plugin-based frontends.
//! This crate is the single source of truth for extension declaration,
//! override layering and output validation rules.

pub mod api;
pub mod blueprint;
pub mod config;
pub mod data;
pub mod extension;
pub mod logging;

pub use api::{ApiHolder, ApiRef, ApiRefError, ApiRegistry, ApiRegistryError};
pub use blueprint::factory::{
    BlueprintError, BlueprintFactory, ExtensionBlueprint, ExtensionBlueprintBuilder,
};
pub use blueprint::original::{OriginalContext, OriginalFactory};
pub use blueprint::request::{MakeRequest, OverrideFactory, OverrideRequest};
pub use config::schema::{ConfigError, ConfigField, ConfigFieldKind, ConfigSchema, ConfigValues};
pub use data::container::{DataError, ExtensionDataContainer};
pub use data::data_ref::{AnyExtensionDataRef, ExtensionDataRef, ExtensionDataValue};
pub use extension::definition::{
    create_extension, AppNode, ExtensionAttachTo, ExtensionDefinition, ExtensionError,
    ExtensionFactory, ExtensionFactoryContext, ExtensionOptions, ExtensionSummary, FactoryResult,
    InstantiateArgs,
};
pub use extension::input::{
    resolve_input_overrides, ExtensionInput, ExtensionInputs, InputError, InputOverride,
    InputOverrides, ResolvedInput, ResolvedInputItem, ResolvedInputs,
};
pub use extension::registry::{ExtensionRegistry, RegisteredExtension, RegistryError};
pub use logging::{default_log_level, init_logging, logging_status};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
