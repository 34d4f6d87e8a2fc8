use plugkit_core::{
    ApiRegistry, AppNode, ExtensionAttachTo, ExtensionBlueprint, ExtensionDataRef,
    ExtensionFactoryContext, ExtensionRegistry, InstantiateArgs, MakeRequest, OverrideRequest,
    RegistryError, ResolvedInputs,
};
use std::sync::Arc;

fn route_ref() -> ExtensionDataRef<String> {
    ExtensionDataRef::new("core.route.path")
}

fn page_blueprint() -> ExtensionBlueprint<String> {
    ExtensionBlueprint::builder("page", ExtensionAttachTo::new("app/routes", "routes"))
        .output(route_ref().any())
        .factory(|path: &String, _ctx: &ExtensionFactoryContext| {
            Ok(vec![route_ref().value(path.clone())])
        })
}

#[test]
fn blueprint_definitions_register_under_plugin_namespace() {
    let blueprint = page_blueprint();
    let mut registry = ExtensionRegistry::new();

    let home = blueprint
        .make(MakeRequest::new("/".to_string()).with_name("home"))
        .expect("home definition");
    let settings = blueprint
        .make_with_overrides(
            OverrideRequest::<String>::new(|original, _ctx| Ok(original.call()?.into_values()))
                .with_name("settings")
                .with_params("/settings".to_string()),
        )
        .expect("settings definition");

    let home_id = registry
        .register(home, Some("catalog"))
        .expect("home registers");
    let settings_id = registry
        .register(settings, Some("catalog"))
        .expect("settings registers");

    assert_eq!(home_id, "page:catalog/home");
    assert_eq!(settings_id, "page:catalog/settings");
    assert_eq!(registry.len(), 2);
    assert_eq!(registry.list_by_kind("page").len(), 2);
    assert_eq!(
        registry
            .list_attached_to(&ExtensionAttachTo::new("app/routes", "routes"))
            .len(),
        2
    );

    let registered = registry.get(&settings_id).expect("settings entry");
    assert_eq!(registered.plugin_id.as_deref(), Some("catalog"));
    let node =
        AppNode::for_definition(&registered.definition, Some("catalog")).expect("node handle");
    let output = registered
        .definition
        .instantiate(InstantiateArgs {
            node,
            apis: Arc::new(ApiRegistry::new()),
            config: None,
            inputs: ResolvedInputs::new(),
        })
        .expect("instantiation");
    assert_eq!(
        output.get(&route_ref()).map(String::as_str),
        Some("/settings")
    );
}

#[test]
fn registering_the_same_instance_twice_is_rejected() {
    let blueprint = page_blueprint();
    let mut registry = ExtensionRegistry::new();
    let request = || MakeRequest::new("/".to_string()).with_name("home");

    registry
        .register(blueprint.make(request()).expect("first"), Some("catalog"))
        .expect("first registers");
    let err = registry
        .register(blueprint.make(request()).expect("second"), Some("catalog"))
        .expect_err("duplicate id must fail");
    assert_eq!(
        err,
        RegistryError::DuplicateExtensionId("page:catalog/home".to_string())
    );
}
