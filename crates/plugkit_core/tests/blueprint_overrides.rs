use plugkit_core::{
    ApiRegistry, AppNode, BlueprintError, ConfigField, ConfigSchema, ConfigValues, DataError,
    ExtensionAttachTo, ExtensionBlueprint, ExtensionDataContainer, ExtensionDataRef,
    ExtensionDefinition, ExtensionError, ExtensionFactoryContext, ExtensionInput,
    InputOverride, InputOverrides, InstantiateArgs, MakeRequest, OriginalContext,
    OverrideRequest, ResolvedInput, ResolvedInputItem, ResolvedInputs,
};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct CounterParams {
    n: i32,
}

fn x_ref() -> ExtensionDataRef<String> {
    ExtensionDataRef::new("test.x")
}

fn y_ref() -> ExtensionDataRef<u32> {
    ExtensionDataRef::new("test.y")
}

fn label_ref() -> ExtensionDataRef<String> {
    ExtensionDataRef::new("test.label")
}

fn counter_blueprint() -> ExtensionBlueprint<CounterParams> {
    ExtensionBlueprint::builder("counter", ExtensionAttachTo::new("app/root", "children"))
        .namespace("demo")
        .output(x_ref().any())
        .config_field("foo", ConfigField::string())
        .factory(|params: &CounterParams, ctx: &ExtensionFactoryContext| {
            let foo = ctx.config.get_str("foo").unwrap_or_default();
            Ok(vec![x_ref().value(format!("{foo}:{}", params.n))])
        })
}

fn instantiate_with_inputs(
    definition: &ExtensionDefinition,
    config: serde_json::Value,
    inputs: ResolvedInputs,
) -> Result<ExtensionDataContainer, ExtensionError> {
    definition.instantiate(InstantiateArgs {
        node: AppNode::new("counter:demo"),
        apis: Arc::new(ApiRegistry::new()),
        config: Some(&config),
        inputs,
    })
}

fn instantiate(
    definition: &ExtensionDefinition,
    config: serde_json::Value,
) -> Result<ExtensionDataContainer, ExtensionError> {
    instantiate_with_inputs(definition, config, ResolvedInputs::new())
}

fn label_item(node_id: &str, label: &str) -> ResolvedInputItem {
    let data = ExtensionDataContainer::from_values(
        vec![label_ref().value(label.to_string())],
        &[label_ref().any()],
    )
    .expect("valid input data");
    ResolvedInputItem::new(AppNode::new(node_id), data)
}

#[test]
fn pass_through_override_reproduces_make_output() {
    let blueprint = counter_blueprint();
    let direct = blueprint
        .make(MakeRequest::new(CounterParams { n: 1 }))
        .expect("make succeeds");
    let overridden = blueprint
        .make_with_overrides(
            OverrideRequest::<CounterParams>::new(|original, _ctx| {
                Ok(original.call()?.into_values())
            })
            .with_params(CounterParams { n: 1 }),
        )
        .expect("make_with_overrides succeeds");

    let direct_output = instantiate(&direct, json!({ "foo": "a" })).expect("direct instance");
    let overridden_output =
        instantiate(&overridden, json!({ "foo": "a" })).expect("overridden instance");

    assert_eq!(direct_output.ids(), overridden_output.ids());
    assert_eq!(
        direct_output.get(&x_ref()),
        overridden_output.get(&x_ref())
    );
    assert_eq!(overridden_output.get(&x_ref()).map(String::as_str), Some("a:1"));
    assert_eq!(overridden.kind(), direct.kind());
    assert_eq!(overridden.namespace(), direct.namespace());
    assert_eq!(overridden.attach_to(), direct.attach_to());
    assert_eq!(overridden.output(), direct.output());
    assert_eq!(overridden.config_schema(), direct.config_schema());
}

#[test]
fn original_call_defaults_to_request_params_and_accepts_explicit_params() {
    let blueprint = counter_blueprint();
    let definition = blueprint
        .make_with_overrides(
            OverrideRequest::<CounterParams>::new(|original, _ctx| {
                let defaulted = original.call()?;
                let explicit = original.call_with_params(&CounterParams { n: 9 })?;
                let joined = format!(
                    "{}|{}",
                    defaulted.get(&x_ref()).cloned().unwrap_or_default(),
                    explicit.get(&x_ref()).cloned().unwrap_or_default()
                );
                Ok(vec![x_ref().value(joined)])
            })
            .with_params(CounterParams { n: 4 }),
        )
        .expect("make_with_overrides succeeds");

    let output = instantiate(&definition, json!({ "foo": "a" })).expect("instance");
    assert_eq!(output.get(&x_ref()).map(String::as_str), Some("a:4|a:9"));
}

#[test]
fn original_call_without_any_params_reports_missing_params() {
    let definition = counter_blueprint()
        .make_with_overrides(OverrideRequest::<CounterParams>::new(|original, _ctx| {
            Ok(original.call()?.into_values())
        }))
        .expect("make_with_overrides succeeds");

    let err = instantiate(&definition, json!({ "foo": "a" })).expect_err("no params available");
    assert_eq!(
        err,
        ExtensionError::MissingParams {
            kind: "counter".to_string()
        }
    );
}

#[test]
fn override_inputs_are_unioned_with_blueprint_inputs() {
    let blueprint = ExtensionBlueprint::builder("panel", ExtensionAttachTo::new("app", "root"))
        .name("panel")
        .input("header", ExtensionInput::new([label_ref().any()]).singleton())
        .input("items", ExtensionInput::new([label_ref().any()]))
        .factory(|_params: &(), _ctx: &ExtensionFactoryContext| Ok(vec![]));

    let definition = blueprint
        .make_with_overrides(
            OverrideRequest::<()>::new(|original, _ctx| Ok(original.call()?.into_values()))
                .with_params(())
                .with_input("footer", ExtensionInput::new([label_ref().any()]).optional()),
        )
        .expect("make_with_overrides succeeds");

    let names: Vec<&str> = definition.inputs().keys().map(String::as_str).collect();
    assert_eq!(names, vec!["footer", "header", "items"]);
    assert_eq!(
        definition.inputs().get("header"),
        blueprint.inputs().get("header")
    );
    assert_eq!(
        definition.inputs().get("items"),
        blueprint.inputs().get("items")
    );
}

#[test]
fn override_input_conflicts_are_reported() {
    let blueprint = ExtensionBlueprint::builder("panel", ExtensionAttachTo::new("app", "root"))
        .input("items", ExtensionInput::new([label_ref().any()]))
        .factory(|_params: &(), _ctx: &ExtensionFactoryContext| Ok(vec![]));

    let err = blueprint
        .make_with_overrides(
            OverrideRequest::<()>::new(|original, _ctx| Ok(original.call()?.into_values()))
                .with_input("items", ExtensionInput::new([x_ref().any()])),
        )
        .expect_err("conflicting input must fail");
    assert_eq!(err, BlueprintError::InputConflict("items".to_string()));
}

#[test]
fn override_config_entries_extend_blueprint_schema() {
    let definition = counter_blueprint()
        .make_with_overrides(
            OverrideRequest::<CounterParams>::new(|original, ctx| {
                let suffix = ctx.config.get_str("suffix").unwrap_or_default().to_string();
                let base = original.call()?;
                let value = base.get(&x_ref()).cloned().unwrap_or_default();
                Ok(vec![x_ref().value(format!("{value}{suffix}"))])
            })
            .with_params(CounterParams { n: 2 })
            .with_config_field("suffix", ConfigField::string().with_default(json!("!"))),
        )
        .expect("make_with_overrides succeeds");

    let schema = definition.config_schema().expect("merged schema");
    assert!(schema.contains_key("foo"));
    assert!(schema.contains_key("suffix"));

    let output = instantiate(&definition, json!({ "foo": "a" })).expect("instance");
    assert_eq!(output.get(&x_ref()).map(String::as_str), Some("a:2!"));
}

#[test]
fn overlapping_config_keys_let_override_win_on_erased_paths() {
    let base = counter_blueprint()
        .config_schema()
        .cloned()
        .expect("blueprint schema");
    let overrides = ConfigSchema::new().with_field("foo", ConfigField::number());

    let overlaid = base.overlay(&overrides);
    assert_eq!(overlaid.get("foo"), Some(&ConfigField::number()));
    let parsed = overlaid
        .parse(Some(&json!({ "foo": 5 })))
        .expect("override schema applies");
    assert_eq!(parsed.get("foo"), Some(&json!(5)));

    let checked = counter_blueprint().make_with_overrides(
        OverrideRequest::<CounterParams>::new(|original, _ctx| {
            Ok(original.call()?.into_values())
        })
        .with_config_field("foo", ConfigField::number()),
    );
    assert!(matches!(checked, Err(BlueprintError::ConfigConflict(_))));
}

#[test]
fn inner_config_overrides_win_over_ambient_config() {
    let definition = counter_blueprint()
        .make_with_overrides(
            OverrideRequest::<CounterParams>::new(|original, _ctx| {
                let mut config = ConfigValues::new();
                config.insert("foo", json!("inner"));
                let container =
                    original.call_with(None, OriginalContext::new().with_config(config))?;
                Ok(container.into_values())
            })
            .with_params(CounterParams { n: 3 }),
        )
        .expect("make_with_overrides succeeds");

    let output = instantiate(&definition, json!({ "foo": "ambient" })).expect("instance");
    assert_eq!(output.get(&x_ref()).map(String::as_str), Some("inner:3"));
}

#[test]
fn original_output_is_scoped_to_blueprint_output() {
    let blueprint = counter_blueprint();
    let definition = blueprint
        .make_with_overrides(
            OverrideRequest::<CounterParams>::new(|original, _ctx| {
                let base = original.call()?;
                assert!(base.contains("test.x"));
                let length = base.get(&x_ref()).map(|value| value.len()).unwrap_or(0);
                Ok(vec![y_ref().value(length as u32)])
            })
            .with_params(CounterParams { n: 10 })
            .with_output([y_ref().any()]),
        )
        .expect("make_with_overrides succeeds");

    assert_eq!(definition.output(), &[y_ref().any()]);
    assert_eq!(blueprint.output(), &[x_ref().any()]);

    let output = instantiate(&definition, json!({ "foo": "ab" })).expect("instance");
    assert_eq!(output.get(&y_ref()), Some(&5));
    assert!(!output.contains("test.x"));
}

#[test]
fn re_yielding_base_output_under_replaced_output_fails_validation() {
    let definition = counter_blueprint()
        .make_with_overrides(
            OverrideRequest::<CounterParams>::new(|original, _ctx| {
                Ok(original.call()?.into_values())
            })
            .with_params(CounterParams { n: 1 })
            .with_output([y_ref().any()]),
        )
        .expect("make_with_overrides succeeds");

    let err = instantiate(&definition, json!({ "foo": "a" })).expect_err("x is not declared");
    assert_eq!(
        err,
        ExtensionError::Data(DataError::Undeclared("test.x".to_string()))
    );
}

#[test]
fn override_output_of_the_wrong_type_is_rejected() {
    let definition = counter_blueprint()
        .make_with_overrides(
            OverrideRequest::<CounterParams>::new(|original, _ctx| {
                let base = original.call()?;
                let length = base.get(&x_ref()).map(|value| value.len()).unwrap_or(0);
                Ok(vec![ExtensionDataRef::<u32>::new("test.x").value(length as u32)])
            })
            .with_params(CounterParams { n: 1 }),
        )
        .expect("make_with_overrides succeeds");

    let err = instantiate(&definition, json!({ "foo": "a" })).expect_err("x is a string");
    assert_eq!(
        err,
        ExtensionError::Data(DataError::TypeMismatch {
            id: "test.x".to_string(),
            expected: x_ref().any().type_name(),
            found: "u32",
        })
    );
}

#[test]
fn original_output_of_the_wrong_type_is_rejected_before_the_override_sees_it() {
    let blueprint = ExtensionBlueprint::builder("counter", ExtensionAttachTo::new("app", "root"))
        .name("broken")
        .output(x_ref().any())
        .factory(|params: &CounterParams, _ctx: &ExtensionFactoryContext| {
            Ok(vec![ExtensionDataRef::<i32>::new("test.x").value(params.n)])
        });
    let definition = blueprint
        .make_with_overrides(
            OverrideRequest::<CounterParams>::new(|original, _ctx| {
                Ok(original.call()?.into_values())
            })
            .with_params(CounterParams { n: 1 }),
        )
        .expect("make_with_overrides succeeds");

    let err = instantiate(&definition, json!({})).expect_err("original output is mistyped");
    assert!(matches!(
        err,
        ExtensionError::Data(DataError::TypeMismatch { found: "i32", .. })
    ));
}

#[test]
fn input_overrides_reach_the_original_factory() {
    let blueprint = ExtensionBlueprint::builder("panel", ExtensionAttachTo::new("app", "root"))
        .name("panel")
        .input("header", ExtensionInput::new([label_ref().any()]).singleton())
        .output(x_ref().any())
        .factory(|_params: &(), ctx: &ExtensionFactoryContext| {
            let header = ctx
                .inputs
                .singleton("header")
                .and_then(|item| item.get(&label_ref()))
                .cloned()
                .unwrap_or_default();
            Ok(vec![x_ref().value(header)])
        });

    let definition = blueprint
        .make_with_overrides(
            OverrideRequest::<()>::new(|original, _ctx| {
                let mut inputs = InputOverrides::new();
                inputs.insert(
                    "header".to_string(),
                    InputOverride::Singleton(vec![label_ref().value("replaced".to_string())]),
                );
                let container =
                    original.call_with(None, OriginalContext::new().with_inputs(inputs))?;
                Ok(container.into_values())
            })
            .with_params(()),
        )
        .expect("make_with_overrides succeeds");

    let inputs = ResolvedInputs::new().with_input(
        "header",
        ResolvedInput::Singleton(Some(label_item("label:header", "original"))),
    );
    let output = instantiate_with_inputs(&definition, json!({}), inputs).expect("instance");
    assert_eq!(output.get(&x_ref()).map(String::as_str), Some("replaced"));
}

#[test]
fn override_request_wiring_takes_precedence() {
    let definition = counter_blueprint()
        .make_with_overrides(
            OverrideRequest::<CounterParams>::new(|original, _ctx| {
                Ok(original.call()?.into_values())
            })
            .with_namespace("custom")
            .with_name("special")
            .with_disabled(true),
        )
        .expect("make_with_overrides succeeds");

    assert_eq!(definition.kind(), Some("counter"));
    assert_eq!(
        definition.resolve_id(None).expect("resolvable id"),
        "counter:custom/special"
    );
    assert!(definition.disabled());
}
