//! Compiled validators (§4.10): a [`Validator`] tree compiled once from a
//! [`SchemaModel`], then run against as many documents as needed — mirrors
//! the compile-once/evaluate-many split of a JSON Schema `Keyword`.

use indexmap::IndexMap;
use regex::Regex;
use snafu::ResultExt;

use lazyjson_core::diff::Mode;
use lazyjson_core::{ReaderOptions, VirtualNode};

use crate::error::{InvalidPatternCtx, Rule, SchemaError, SchemaException, ValidationError};
use crate::model::{DependentRole, DependentTag, Required, Rules, TypeSet};

/// A compiled, reusable validation plan for one property and everything
/// nested beneath it.
pub enum Validator {
    /// Runs every child validator, accumulating (or, under
    /// [`lazyjson_core::ValidateOptions::short_circuit`], stopping at the
    /// first) failure.
    All(Vec<Validator>),
    /// Fails unless the node's kind is one of `types`.
    Type(TypeSet),
    /// Fails unless required and the node is undefined.
    Required,
    /// Runs `then` only when the node's kind intersects `when`; a
    /// type mismatch here is silent (the sibling [`Validator::Type`]
    /// already reported it).
    Guard { when: TypeSet, then: Box<Validator> },
    Enum(EnumCheck),
    Strings(StringConstraints),
    Numbers(NumberConstraints),
    Arrays(ArrayConstraints),
    Objects(ObjectConstraints),
    Items(Box<Validator>),
    Property { name: String, validator: Box<Validator> },
    DependentRequired(Vec<DependentGroup>),
    Custom(crate::model::CustomValidator),
}

pub struct EnumCheck {
    pub json_candidates: Vec<VirtualNode>,
    pub string_candidates: Vec<String>,
    pub case_insensitive: bool,
    pub compare_mode: Mode,
}

pub struct StringConstraints {
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<Regex>,
    pub pattern_source: Option<String>,
}

pub struct NumberConstraints {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
    pub multiple_of: Option<f64>,
}

pub struct ArrayConstraints {
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: bool,
}

pub struct ObjectConstraints {
    pub min_properties: Option<u64>,
    pub max_properties: Option<u64>,
}

pub struct DependentGroup {
    pub tag: String,
    pub plain: Vec<String>,
    pub presence_triggers: Vec<String>,
    pub absence_triggers: Vec<String>,
}

/// Compiles a [`SchemaModel`] into a runnable [`Validator`].
pub fn compile(rules: &Rules) -> Result<Validator, SchemaError> {
    let _span = tracing::debug_span!("schema::compile", property_count = rules.properties.len()).entered();
    let mut parts = Vec::new();

    if !rules.types.is_empty() {
        parts.push(Validator::Type(rules.types));
    }
    if rules.resolve_required() {
        parts.push(Validator::Required);
    }
    if !rules.one_of_jsons.is_empty() || !rules.one_of_strings.is_empty() {
        let json_candidates = rules
            .one_of_jsons
            .iter()
            .filter_map(|text| lazyjson_core::parse(text.clone(), ReaderOptions::default()).ok())
            .collect();
        let compare_mode = if rules.any_order { Mode::standard().any_order() } else { Mode::standard() };
        parts.push(Validator::Enum(EnumCheck {
            json_candidates,
            string_candidates: rules.one_of_strings.clone(),
            case_insensitive: rules.case_insensitive,
            compare_mode,
        }));
    }

    let string_rules = StringConstraints {
        min_length: rules.min_length,
        max_length: rules.max_length,
        pattern: rules
            .pattern
            .as_deref()
            .map(|p| Regex::new(p).context(InvalidPatternCtx { pattern: p.to_string() }))
            .transpose()?,
        pattern_source: rules.pattern.clone(),
    };
    if string_rules.min_length.is_some() || string_rules.max_length.is_some() || string_rules.pattern.is_some() {
        parts.push(Validator::Guard {
            when: TypeSet::STRING,
            then: Box::new(Validator::Strings(string_rules)),
        });
    }

    let number_rules = NumberConstraints {
        minimum: rules.minimum,
        maximum: rules.maximum,
        exclusive_minimum: rules.exclusive_minimum,
        exclusive_maximum: rules.exclusive_maximum,
        multiple_of: rules.multiple_of,
    };
    if number_rules.minimum.is_some()
        || number_rules.maximum.is_some()
        || number_rules.exclusive_minimum.is_some()
        || number_rules.exclusive_maximum.is_some()
        || number_rules.multiple_of.is_some()
    {
        parts.push(Validator::Guard {
            when: TypeSet::NUMBER | TypeSet::INTEGER,
            then: Box::new(Validator::Numbers(number_rules)),
        });
    }

    let array_rules = ArrayConstraints {
        min_items: rules.min_items,
        max_items: rules.max_items,
        unique_items: rules.unique_items,
    };
    let mut array_parts: Vec<Validator> = Vec::new();
    if array_rules.min_items.is_some() || array_rules.max_items.is_some() || array_rules.unique_items {
        array_parts.push(Validator::Arrays(array_rules));
    }
    if let Some(items) = &rules.items {
        array_parts.push(Validator::Items(Box::new(compile(items)?)));
    }
    if !array_parts.is_empty() {
        parts.push(Validator::Guard { when: TypeSet::ARRAY, then: Box::new(Validator::All(array_parts)) });
    }

    let object_rules = ObjectConstraints { min_properties: rules.min_properties, max_properties: rules.max_properties };
    let mut object_parts: Vec<Validator> = Vec::new();
    if object_rules.min_properties.is_some() || object_rules.max_properties.is_some() {
        object_parts.push(Validator::Objects(object_rules));
    }
    for (name, prop_rules) in &rules.properties {
        object_parts.push(Validator::Property { name: name.clone(), validator: Box::new(compile(prop_rules)?) });
    }
    let groups = dependent_groups(&rules.properties);
    if !groups.is_empty() {
        object_parts.push(Validator::DependentRequired(groups));
    }
    if !object_parts.is_empty() {
        parts.push(Validator::Guard { when: TypeSet::OBJECT, then: Box::new(Validator::All(object_parts)) });
    }

    for custom in &rules.custom_validators {
        parts.push(Validator::Custom(custom.clone()));
    }

    Ok(Validator::All(parts))
}

fn dependent_groups(properties: &IndexMap<String, Rules>) -> Vec<DependentGroup> {
    let mut by_tag: IndexMap<String, DependentGroup> = IndexMap::new();
    for (name, rules) in properties {
        for DependentTag { group, role } in &rules.dependent_tags {
            let entry = by_tag.entry(group.clone()).or_insert_with(|| DependentGroup {
                tag: group.clone(),
                plain: Vec::new(),
                presence_triggers: Vec::new(),
                absence_triggers: Vec::new(),
            });
            match role {
                DependentRole::Plain => entry.plain.push(name.clone()),
                DependentRole::PresenceTrigger => entry.presence_triggers.push(name.clone()),
                DependentRole::AbsenceTrigger => entry.absence_triggers.push(name.clone()),
            }
        }
    }
    by_tag.into_values().collect()
}

/// Runs a compiled [`Validator`] (compiled from `schema`) against `node`,
/// aggregating failures into a [`SchemaException`] when any occur. The
/// exception carries `node` and `schema` alongside the individual
/// [`ValidationError`]s, matching the root validator run's contract.
pub fn validate(
    validator: &Validator,
    schema: &Rules,
    node: &VirtualNode,
    options: lazyjson_core::ValidateOptions,
) -> Result<(), SchemaException> {
    let errors = run(validator, node, options);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(SchemaException { value: node.clone(), schema: schema.clone(), errors })
    }
}

fn run(validator: &Validator, node: &VirtualNode, options: lazyjson_core::ValidateOptions) -> Vec<ValidationError> {
    match validator {
        Validator::All(children) => {
            let mut errors = Vec::new();
            for child in children {
                errors.extend(run(child, node, options));
                if options.short_circuit && !errors.is_empty() {
                    break;
                }
            }
            errors
        }
        Validator::Required => {
            if node.is_undefined() {
                vec![ValidationError {
                    rule: Rule::Required,
                    path: node.path().clone(),
                    message: "value is required".to_string(),
                    args: args(&[("path", &lazyjson_core::path::render_rooted(node.path()))]),
                }]
            } else {
                Vec::new()
            }
        }
        Validator::Type(types) => {
            if node.is_undefined() {
                return Vec::new();
            }
            if matches_type(node, *types) {
                Vec::new()
            } else {
                vec![ValidationError {
                    rule: Rule::Type,
                    path: node.path().clone(),
                    message: format!("expected one of {types:?}"),
                    args: args(&[("expected", &format!("{types:?}")), ("actual", &describe_kind(node))]),
                }]
            }
        }
        Validator::Guard { when, then } => {
            if node.is_undefined() || !matches_type(node, *when) {
                Vec::new()
            } else {
                run(then, node, options)
            }
        }
        Validator::Enum(check) => validate_enum(check, node),
        Validator::Strings(rules) => validate_strings(rules, node),
        Validator::Numbers(rules) => validate_numbers(rules, node),
        Validator::Arrays(rules) => validate_arrays(rules, node),
        Validator::Objects(rules) => validate_objects(rules, node),
        Validator::Items(inner) => {
            let Ok(elements) = node.view_as_list(Clone::clone) else { return Vec::new() };
            let mut errors = Vec::new();
            for element in elements {
                errors.extend(run(inner, &element, options));
                if options.short_circuit && !errors.is_empty() {
                    break;
                }
            }
            errors
        }
        Validator::Property { name, validator } => run(validator, &node.get_member(name), options),
        Validator::DependentRequired(groups) => validate_dependent_groups(groups, node),
        Validator::Custom(f) => f(node),
    }
}

fn describe_kind(node: &VirtualNode) -> &'static str {
    if node.is_null() {
        "null"
    } else if node.is_boolean() {
        "boolean"
    } else if node.is_object() {
        "object"
    } else if node.is_array() {
        "array"
    } else if node.is_integer() {
        "integer"
    } else if node.is_number() {
        "number"
    } else if node.is_string() {
        "string"
    } else {
        "undefined"
    }
}

fn matches_type(node: &VirtualNode, types: TypeSet) -> bool {
    (types.contains(TypeSet::NULL) && node.is_null())
        || (types.contains(TypeSet::BOOLEAN) && node.is_boolean())
        || (types.contains(TypeSet::OBJECT) && node.is_object())
        || (types.contains(TypeSet::ARRAY) && node.is_array())
        || (types.contains(TypeSet::STRING) && node.is_string())
        || (types.contains(TypeSet::INTEGER) && node.is_integer())
        || (types.contains(TypeSet::NUMBER) && node.is_number())
}

fn validate_enum(check: &EnumCheck, node: &VirtualNode) -> Vec<ValidationError> {
    if node.is_undefined() {
        return Vec::new();
    }
    let json_match = check.json_candidates.iter().any(|candidate| node.equivalent_to(candidate, check.compare_mode));
    let string_match = node.string().ok().is_some_and(|s| {
        check.string_candidates.iter().any(|candidate| {
            if check.case_insensitive {
                s.eq_ignore_ascii_case(candidate)
            } else {
                &s == candidate
            }
        })
    });
    let has_candidates = !check.json_candidates.is_empty() || !check.string_candidates.is_empty();
    if has_candidates && !json_match && !string_match {
        vec![ValidationError {
            rule: Rule::Enum,
            path: node.path().clone(),
            message: "value does not match any permitted alternative".to_string(),
            args: node.string().map(|s| args(&[("actual", &s)])).unwrap_or_default(),
        }]
    } else {
        Vec::new()
    }
}

fn validate_strings(rules: &StringConstraints, node: &VirtualNode) -> Vec<ValidationError> {
    let Ok(value) = node.string() else { return Vec::new() };
    let mut errors = Vec::new();
    let len = value.chars().count() as u64;
    if let Some(min) = rules.min_length {
        if len < min {
            errors.push(error(
                Rule::MinLength,
                node,
                format!("length {len} is less than minimum {min}"),
                args(&[("minLength", &min), ("actual", &len)]),
            ));
        }
    }
    if let Some(max) = rules.max_length {
        if len > max {
            errors.push(error(
                Rule::MaxLength,
                node,
                format!("length {len} exceeds maximum {max}"),
                args(&[("maxLength", &max), ("actual", &len)]),
            ));
        }
    }
    if let Some(pattern) = &rules.pattern {
        if !pattern.is_match(&value) {
            let pattern_text = rules.pattern_source.as_deref().unwrap_or("");
            errors.push(error(
                Rule::Pattern,
                node,
                format!("`{value}` does not match pattern `{pattern_text}`"),
                args(&[("pattern", &pattern_text), ("actual", &value)]),
            ));
        }
    }
    errors
}

fn validate_numbers(rules: &NumberConstraints, node: &VirtualNode) -> Vec<ValidationError> {
    let Ok(number) = node.number() else { return Vec::new() };
    let value = number.as_f64();
    let mut errors = Vec::new();
    if let Some(min) = rules.minimum {
        if value < min {
            errors.push(error(
                Rule::Minimum,
                node,
                format!("{value} is less than minimum {min}"),
                args(&[("minimum", &min), ("actual", &value)]),
            ));
        }
    }
    if let Some(max) = rules.maximum {
        if value > max {
            errors.push(error(
                Rule::Maximum,
                node,
                format!("{value} exceeds maximum {max}"),
                args(&[("maximum", &max), ("actual", &value)]),
            ));
        }
    }
    if let Some(min) = rules.exclusive_minimum {
        if value <= min {
            errors.push(error(
                Rule::ExclusiveMinimum,
                node,
                format!("{value} is not greater than {min}"),
                args(&[("exclusiveMinimum", &min), ("actual", &value)]),
            ));
        }
    }
    if let Some(max) = rules.exclusive_maximum {
        if value >= max {
            errors.push(error(
                Rule::ExclusiveMaximum,
                node,
                format!("{value} is not less than {max}"),
                args(&[("exclusiveMaximum", &max), ("actual", &value)]),
            ));
        }
    }
    if let Some(step) = rules.multiple_of {
        if step != 0.0 && (value / step).fract().abs() > f64::EPSILON {
            errors.push(error(
                Rule::MultipleOf,
                node,
                format!("{value} is not a multiple of {step}"),
                args(&[("multipleOf", &step), ("actual", &value)]),
            ));
        }
    }
    errors
}

fn validate_arrays(rules: &ArrayConstraints, node: &VirtualNode) -> Vec<ValidationError> {
    let Ok(size) = node.size() else { return Vec::new() };
    let mut errors = Vec::new();
    if let Some(min) = rules.min_items {
        if (size as u64) < min {
            errors.push(error(
                Rule::MinItems,
                node,
                format!("{size} items is less than minimum {min}"),
                args(&[("minItems", &min), ("actual", &size)]),
            ));
        }
    }
    if let Some(max) = rules.max_items {
        if (size as u64) > max {
            errors.push(error(
                Rule::MaxItems,
                node,
                format!("{size} items exceeds maximum {max}"),
                args(&[("maxItems", &max), ("actual", &size)]),
            ));
        }
    }
    if rules.unique_items {
        if let Ok(elements) = node.view_as_list(|e| e.to_minimized_json().unwrap_or_default()) {
            let mut seen = std::collections::HashSet::new();
            for text in elements {
                if !seen.insert(text) {
                    errors.push(error(
                        Rule::UniqueItems,
                        node,
                        "array contains duplicate elements".to_string(),
                        Vec::new(),
                    ));
                    break;
                }
            }
        }
    }
    errors
}

fn validate_objects(rules: &ObjectConstraints, node: &VirtualNode) -> Vec<ValidationError> {
    let Ok(size) = node.size() else { return Vec::new() };
    let mut errors = Vec::new();
    if let Some(min) = rules.min_properties {
        if (size as u64) < min {
            errors.push(error(
                Rule::MinProperties,
                node,
                format!("{size} properties is less than minimum {min}"),
                args(&[("minProperties", &min), ("actual", &size)]),
            ));
        }
    }
    if let Some(max) = rules.max_properties {
        if (size as u64) > max {
            errors.push(error(
                Rule::MaxProperties,
                node,
                format!("{size} properties exceeds maximum {max}"),
                args(&[("maxProperties", &max), ("actual", &size)]),
            ));
        }
    }
    errors
}

fn validate_dependent_groups(groups: &[DependentGroup], node: &VirtualNode) -> Vec<ValidationError> {
    if !node.is_object() {
        return Vec::new();
    }
    let Ok(names) = node.names() else { return Vec::new() };
    let present = |name: &str| names.iter().any(|n| n == name);

    let mut errors = Vec::new();
    for group in groups {
        let any_present_trigger = group.presence_triggers.iter().any(|t| present(t));
        let any_absent_trigger = group.absence_triggers.iter().any(|t| !present(t));
        let no_triggers = group.presence_triggers.is_empty() && group.absence_triggers.is_empty();

        let requires_all = if no_triggers {
            group.plain.iter().any(|p| present(p))
        } else {
            any_present_trigger || any_absent_trigger
        };

        if requires_all {
            let missing: Vec<&str> = group.plain.iter().map(String::as_str).filter(|p| !present(p)).collect();
            if !missing.is_empty() {
                errors.push(ValidationError {
                    rule: Rule::DependentRequired,
                    path: node.path().clone(),
                    message: format!("group `{}` is missing: {}", group.tag, missing.join(", ")),
                    args: missing.into_iter().map(|m| ("missing".to_string(), m.to_string())).collect(),
                });
            }
        }
    }
    errors
}

fn error(rule: Rule, node: &VirtualNode, message: String, args: Vec<(String, String)>) -> ValidationError {
    ValidationError { rule, path: node.path().clone(), message, args }
}

fn args(pairs: &[(&str, &dyn std::fmt::Display)]) -> Vec<(String, String)> {
    pairs.iter().map(|(name, value)| (name.to_string(), value.to_string())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SchemaModelBuilder;
    use lazyjson_core::ValidateOptions;

    fn root(text: &str) -> VirtualNode {
        lazyjson_core::parse(text, ReaderOptions::default()).unwrap()
    }

    #[test]
    fn type_mismatch_is_reported() {
        let rules = SchemaModelBuilder::new().types(TypeSet::STRING).build();
        let validator = compile(&rules).unwrap();
        let node = root("42");
        let result = validate(&validator, &rules, &node, ValidateOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn required_property_missing_is_reported() {
        let rules = SchemaModelBuilder::new()
            .types(TypeSet::OBJECT)
            .property("name", SchemaModelBuilder::new().types(TypeSet::STRING).required(Required::Yes).build())
            .build();
        let validator = compile(&rules).unwrap();
        let node = root(r#"{}"#);
        let result = validate(&validator, &rules, &node, ValidateOptions::default());
        let err = result.unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].rule, Rule::Required);
    }

    #[test]
    fn items_recurse_into_each_element() {
        let rules = SchemaModelBuilder::new()
            .types(TypeSet::ARRAY)
            .items(SchemaModelBuilder::new().types(TypeSet::NUMBER).minimum(0.0).build())
            .build();
        let validator = compile(&rules).unwrap();
        let node = root("[1, -2, 3]");
        let result = validate(&validator, &rules, &node, ValidateOptions::default());
        assert_eq!(result.unwrap_err().errors.len(), 1);
    }

    #[test]
    fn dependent_required_group_reports_missing_plain_member() {
        let name_group = |role| SchemaModelBuilder::new().types(TypeSet::STRING).dependent_tag("name", role).build();
        let rules = SchemaModelBuilder::new()
            .types(TypeSet::OBJECT)
            .property("firstName", name_group(DependentRole::Plain))
            .property("lastName", name_group(DependentRole::Plain))
            .build();
        let validator = compile(&rules).unwrap();
        let node = root(r#"{"firstName": "peter"}"#);
        let result = validate(&validator, &rules, &node, ValidateOptions::default());
        let err = result.unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].rule, Rule::DependentRequired);
    }

    #[test]
    fn pattern_mismatch_is_reported() {
        let rules = SchemaModelBuilder::new().types(TypeSet::STRING).pattern("^[a-z]+$").build();
        let validator = compile(&rules).unwrap();
        let node = root(r#""ABC""#);
        assert!(validate(&validator, &rules, &node, ValidateOptions::default()).is_err());
    }

    #[test]
    fn short_circuit_stops_after_first_failure() {
        let rules = SchemaModelBuilder::new().types(TypeSet::STRING).min_length(10).pattern("^[a-z]+$").build();
        let validator = compile(&rules).unwrap();
        let node = root(r#""AB""#);
        let options = ValidateOptions { short_circuit: true };
        let err = validate(&validator, &rules, &node, options).unwrap_err();
        assert_eq!(err.errors.len(), 1);
    }
}
