//! Schema inference from declarations, end to end through the tool builder.

use easy_mcp::capability::signature::{infer, parse_declaration, FunctionSignature, InferOverrides};
use easy_mcp::capability::tool::ToolBuilder;
use easy_mcp::capability::{CapabilityError, ParamType, Parameter};
use serde_json::{json, Map};

#[test]
fn optionals_list_leaves_only_name_required() {
    let signature = FunctionSignature::new("register")
        .param("name", "string")
        .optional_param("active", "string")
        .optional_param("items", "string[]")
        .optional_param("age", "number");
    let overrides = InferOverrides::default().optionals(["active", "items", "age"]);

    let inferred = infer(&signature, &overrides).unwrap();
    assert_eq!(inferred.required(), ["name"]);

    let items = inferred.parameters.iter().find(|p| p.name == "items").unwrap();
    assert_eq!(items.param_type, ParamType::Array);
    let age = inferred.parameters.iter().find(|p| p.name == "age").unwrap();
    assert_eq!(age.param_type, ParamType::Number);
}

#[test]
fn undocumented_parameters_get_fallback_description() {
    let signature = parse_declaration("function tag(items: string[]) {}").unwrap();
    let inferred = infer(&signature, &InferOverrides::default()).unwrap();
    assert_eq!(
        inferred.parameters[0].description,
        "a param named items of type array"
    );
}

#[test]
fn documented_declaration_feeds_schema() {
    let source = r"
        /**
         * Searches the catalogue.
         * @param query Text to look for
         * @param limit Maximum number of hits
         */
        const search = async (query: string, limit = 10, filters?: { tag: string }, context: Context) => {}
    ";
    let inferred = infer(&parse_declaration(source).unwrap(), &InferOverrides::default()).unwrap();

    assert_eq!(inferred.name, "search");
    assert_eq!(inferred.description, "Searches the catalogue.");
    assert!(inferred.takes_context);
    assert_eq!(inferred.required(), ["query"]);

    let names: Vec<_> = inferred.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["query", "limit", "filters"]);
    assert_eq!(inferred.parameters[0].description, "Text to look for");
    // Docs exist but say nothing about `filters`
    assert_eq!(inferred.parameters[2].description, "");
    assert_eq!(inferred.parameters[2].param_type, ParamType::Object);
}

#[test]
fn rust_style_declaration() {
    let source = "/// Sums values.\npub async fn sum(values: Vec<f64>, scale: Option<f64>, ctx: &Context) -> f64";
    let inferred = infer(&parse_declaration(source).unwrap(), &InferOverrides::default()).unwrap();
    assert_eq!(inferred.name, "sum");
    assert_eq!(inferred.parameters[0].param_type, ParamType::Array);
    assert_eq!(inferred.required(), ["values"]);
    assert!(inferred.takes_context);
}

#[test]
fn explicit_overrides_win() {
    let signature = parse_declaration("function f(a: string) {}").unwrap();
    let overrides = InferOverrides {
        parameters: Some(vec![Parameter::number("x").description("explicit")]),
        ..InferOverrides::default()
    }
    .name("renamed")
    .description("Overridden");

    let inferred = infer(&signature, &overrides).unwrap();
    assert_eq!(inferred.name, "renamed");
    assert_eq!(inferred.description, "Overridden");
    assert_eq!(inferred.parameters.len(), 1);
    assert_eq!(inferred.parameters[0].name, "x");
    assert_eq!(inferred.parameters[0].description, "explicit");
}

#[test]
fn non_function_input_cannot_be_inferred() {
    for source in ["const answer = 42;", "class Thing {}", ""] {
        assert!(
            matches!(parse_declaration(source), Err(CapabilityError::CouldNotInfer { .. })),
            "{source:?}"
        );
    }
}

#[tokio::test]
async fn inferred_tool_expands_named_arguments_in_order() {
    let signature = parse_declaration("function greet(name: string, greeting?: string) {}").unwrap();
    let inferred = infer(&signature, &InferOverrides::default()).unwrap();
    let tool = ToolBuilder::from_signature(&inferred)
        .handler(|args| async move {
            let positional: Vec<_> = args.positional().to_vec();
            Ok(positional)
        })
        .build()
        .unwrap();

    assert_eq!(tool.description(), "greet");
    assert_eq!(tool.input_schema()["required"], json!(["name"]));

    let mut named = Map::new();
    named.insert("greeting".to_string(), json!("Hi"));
    named.insert("name".to_string(), json!("Ada"));
    let result = tool.invoke(named, None).await.unwrap();
    assert_eq!(result, json!(["Ada", "Hi"]));
}
