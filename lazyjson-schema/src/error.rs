//! Validation error reporting (§4.10, §7), following the same `snafu`
//! shape as `lazyjson-core::error`.

use snafu::Snafu;

use lazyjson_core::{Path, VirtualNode};

use crate::model::Rules;

/// The rule that rejected a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Type,
    Enum,
    Required,
    Pattern,
    MinLength,
    MaxLength,
    Minimum,
    Maximum,
    ExclusiveMinimum,
    ExclusiveMaximum,
    MultipleOf,
    MinItems,
    MaxItems,
    UniqueItems,
    MinProperties,
    MaxProperties,
    DependentRequired,
    Custom,
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Rule::Type => "TYPE",
            Rule::Enum => "ENUM",
            Rule::Required => "REQUIRED",
            Rule::Pattern => "PATTERN",
            Rule::MinLength => "MIN_LENGTH",
            Rule::MaxLength => "MAX_LENGTH",
            Rule::Minimum => "MINIMUM",
            Rule::Maximum => "MAXIMUM",
            Rule::ExclusiveMinimum => "EXCLUSIVE_MINIMUM",
            Rule::ExclusiveMaximum => "EXCLUSIVE_MAXIMUM",
            Rule::MultipleOf => "MULTIPLE_OF",
            Rule::MinItems => "MIN_ITEMS",
            Rule::MaxItems => "MAX_ITEMS",
            Rule::UniqueItems => "UNIQUE_ITEMS",
            Rule::MinProperties => "MIN_PROPERTIES",
            Rule::MaxProperties => "MAX_PROPERTIES",
            Rule::DependentRequired => "DEPENDENT_REQUIRED",
            Rule::Custom => "CUSTOM",
        };
        f.write_str(name)
    }
}

/// A single rule failure produced while validating one node.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub rule: Rule,
    pub path: Path,
    pub message: String,
    pub args: Vec<(String, String)>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at `{}`: {}", self.rule, lazyjson_core::path::render_rooted(&self.path), self.message)
    }
}

/// Raised when a schema itself is malformed (e.g. an invalid regex in a
/// `pattern` rule).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub), context(suffix(Ctx)))]
pub enum SchemaError {
    #[snafu(display("invalid pattern `{pattern}`: {source}"))]
    InvalidPattern { pattern: String, source: regex::Error },
}

/// Raised by a completed validation run that produced one or more
/// [`ValidationError`]s; carries the offending value and the schema it was
/// run against alongside the individual failures, so a caller can re-report
/// or re-run validation without threading those through separately.
pub struct SchemaException {
    pub value: VirtualNode,
    pub schema: Rules,
    pub errors: Vec<ValidationError>,
}

impl std::fmt::Debug for SchemaException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaException").field("errors", &self.errors).finish_non_exhaustive()
    }
}

impl std::fmt::Display for SchemaException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let first = self.errors.first().map(ToString::to_string).unwrap_or_default();
        write!(f, "{} validation error(s), first: {first}", self.errors.len())
    }
}

impl std::error::Error for SchemaException {}

pub type Result<T, E = SchemaError> = std::result::Result<T, E>;
