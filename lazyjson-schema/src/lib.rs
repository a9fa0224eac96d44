//! Declarative schema models and compiled validators layered over
//! `lazyjson-core` documents (§4.9, §4.10): describe the shape you expect
//! with a [`model::SchemaModelBuilder`], [`validator::compile`] it once,
//! then [`validator::validate`] as many documents against it as you like.

pub mod error;
pub mod model;
pub mod validator;

pub use error::{Rule, SchemaError, SchemaException, ValidationError};
pub use model::{DependentRole, DependentTag, Required, Rules, SchemaModel, SchemaModelBuilder, SchemaModelCache, TypeSet};
pub use validator::{compile, validate, Validator};

#[cfg(test)]
mod tests {
    use super::*;
    use lazyjson_core::{ReaderOptions, ValidateOptions};

    #[test]
    fn end_to_end_object_schema() {
        let model = SchemaModelBuilder::new()
            .types(TypeSet::OBJECT)
            .property(
                "email",
                SchemaModelBuilder::new()
                    .types(TypeSet::STRING)
                    .required(Required::Yes)
                    .pattern(r"^[^@]+@[^@]+$")
                    .build(),
            )
            .property("age", SchemaModelBuilder::new().types(TypeSet::INTEGER).minimum(0.0).build())
            .build();
        let validator = compile(&model).unwrap();

        let valid = lazyjson_core::parse(r#"{"email": "a@b.com", "age": 30}"#, ReaderOptions::default()).unwrap();
        assert!(validate(&validator, &model, &valid, ValidateOptions::default()).is_ok());

        let invalid = lazyjson_core::parse(r#"{"email": "not-an-email", "age": -1}"#, ReaderOptions::default()).unwrap();
        let err = validate(&validator, &model, &invalid, ValidateOptions::default()).unwrap_err();
        assert_eq!(err.errors.len(), 2);
        assert_eq!(err.errors.iter().filter(|e| e.rule == Rule::Minimum).count(), 1);
        let minimum_error = err.errors.iter().find(|e| e.rule == Rule::Minimum).unwrap();
        assert_eq!(
            minimum_error.args,
            vec![("minimum".to_string(), "0".to_string()), ("actual".to_string(), "-1".to_string())]
        );
        assert!(matches!(&err.value, lazyjson_core::VirtualNode::Exists { .. }));
        assert!(err.schema.types.contains(TypeSet::OBJECT));
    }
}
