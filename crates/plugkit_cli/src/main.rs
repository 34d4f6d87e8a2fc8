//! CLI smoke entry point.
//!
//! # Responsibility
//! - Exercise `plugkit_core` end to end: declare a blueprint, make two
//!   definitions, register them and instantiate each once.
//! - Keep output deterministic for quick local sanity checks.

use log::info;
use plugkit_core::{
    ApiRegistry, AppNode, ConfigField, ExtensionAttachTo, ExtensionBlueprint, ExtensionDataRef,
    ExtensionFactoryContext, ExtensionRegistry, InstantiateArgs, MakeRequest, OverrideRequest,
    ResolvedInputs,
};
use serde_json::json;
use std::error::Error;
use std::sync::Arc;

const PLUGIN_ID: &str = "demo";

fn title_ref() -> ExtensionDataRef<String> {
    ExtensionDataRef::new("core.title")
}

fn title_blueprint() -> ExtensionBlueprint<String> {
    ExtensionBlueprint::builder("title", ExtensionAttachTo::new("app/header", "titles"))
        .output(title_ref().any())
        .config_field("prefix", ConfigField::string().with_default(json!("")))
        .factory(|text: &String, ctx: &ExtensionFactoryContext| {
            let prefix = ctx.config.get_str("prefix").unwrap_or_default();
            Ok(vec![title_ref().value(format!("{prefix}{text}"))])
        })
}

fn main() -> Result<(), Box<dyn Error>> {
    plugkit_core::init_logging(plugkit_core::default_log_level(), None)?;
    println!("plugkit_core version={}", plugkit_core::core_version());

    let blueprint = title_blueprint();
    let plain = blueprint.make(MakeRequest::new("Welcome".to_string()).with_name("plain"))?;
    let shouting = blueprint.make_with_overrides(
        OverrideRequest::<String>::new(|original, _ctx| {
            let base = original.call()?;
            let text = base.get(&title_ref()).cloned().unwrap_or_default();
            Ok(vec![title_ref().value(text.to_uppercase())])
        })
        .with_name("shouting")
        .with_params("Welcome".to_string()),
    )?;

    let mut registry = ExtensionRegistry::new();
    registry.register(plain, Some(PLUGIN_ID))?;
    registry.register(shouting, Some(PLUGIN_ID))?;

    let apis = Arc::new(ApiRegistry::new());
    let config = json!({ "prefix": "> " });
    for id in registry.ids() {
        let Some(entry) = registry.get(&id) else {
            continue;
        };
        let output = entry.definition.instantiate(InstantiateArgs {
            node: AppNode::for_definition(&entry.definition, Some(PLUGIN_ID))?,
            apis: apis.clone(),
            config: Some(&config),
            inputs: ResolvedInputs::new(),
        })?;
        let title = output.get(&title_ref()).cloned().unwrap_or_default();
        info!("event=cli_instantiate module=cli status=ok id={id}");
        println!(
            "{}",
            serde_json::to_string(&json!({
                "id": id,
                "definition": entry.definition.summary(),
                "title": title,
            }))?
        );
    }
    Ok(())
}
