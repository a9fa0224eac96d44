//! Cross-component chain: build a [`SchemaModel`], compile it once, then
//! validate several documents against the compiled [`Validator`].

use lazyjson_core::{ReaderOptions, ValidateOptions};
use lazyjson_schema::{compile, validate, DependentRole, Required, Rule, SchemaModelBuilder, TypeSet};

fn parse(text: &str) -> lazyjson_core::VirtualNode {
    lazyjson_core::parse(text, ReaderOptions::default()).unwrap()
}

#[test]
fn address_book_entry_schema_accepts_and_rejects_as_expected() {
    let model = SchemaModelBuilder::new()
        .types(TypeSet::OBJECT)
        .property(
            "firstName",
            SchemaModelBuilder::new().types(TypeSet::STRING).dependent_tag("name", DependentRole::Plain).build(),
        )
        .property(
            "lastName",
            SchemaModelBuilder::new().types(TypeSet::STRING).dependent_tag("name", DependentRole::Plain).build(),
        )
        .property(
            "nicknames",
            SchemaModelBuilder::new().types(TypeSet::STRING).required(Required::Yes).varargs().build(),
        )
        .build();
    let validator = compile(&model).unwrap();

    let complete = parse(r#"{"firstName": "ada", "lastName": "lovelace", "nicknames": ["countess"]}"#);
    assert!(validate(&validator, &model, &complete, ValidateOptions::default()).is_ok());

    let incomplete = parse(r#"{"firstName": "peter", "nicknames": ["pan"]}"#);
    let err = validate(&validator, &model, &incomplete, ValidateOptions::default()).unwrap_err();
    assert_eq!(err.errors.len(), 1);
    assert_eq!(err.errors[0].rule, Rule::DependentRequired);
    assert!(err.errors[0].args.iter().any(|(k, v)| k == "missing" && v == "lastName"));
}

#[test]
fn varargs_property_accepts_either_a_bare_scalar_or_an_array() {
    let model = SchemaModelBuilder::new()
        .types(TypeSet::OBJECT)
        .property("tags", SchemaModelBuilder::new().types(TypeSet::STRING).required(Required::Yes).varargs().build())
        .build();
    let validator = compile(&model).unwrap();

    let missing = parse(r#"{}"#);
    let err = validate(&validator, &model, &missing, ValidateOptions::default()).unwrap_err();
    assert!(err.errors.iter().any(|e| e.rule == Rule::Required));

    let bare_scalar = parse(r#"{"tags": "single"}"#);
    assert!(validate(&validator, &model, &bare_scalar, ValidateOptions::default()).is_ok());

    let as_array = parse(r#"{"tags": ["a", "b"]}"#);
    assert!(validate(&validator, &model, &as_array, ValidateOptions::default()).is_ok());

    let wrong_type = parse(r#"{"tags": true}"#);
    let err = validate(&validator, &model, &wrong_type, ValidateOptions::default()).unwrap_err();
    assert!(err.errors.iter().any(|e| e.rule == Rule::Type));
}

#[test]
fn overlay_merges_base_and_override_rules() {
    let base = SchemaModelBuilder::new().types(TypeSet::STRING).min_length(2).build();
    let narrowed = SchemaModelBuilder::new().max_length(5).build();
    let merged = base.overlay(&narrowed);
    let validator = compile(&merged).unwrap();

    assert!(validate(&validator, &merged, &parse(r#""ok""#), ValidateOptions::default()).is_ok());
    assert!(validate(&validator, &merged, &parse(r#""x""#), ValidateOptions::default()).is_err());
    assert!(validate(&validator, &merged, &parse(r#""way-too-long""#), ValidateOptions::default()).is_err());
}
