//! Declarative schema models (§4.9): a [`SchemaModel`] is a tree of
//! [`Rules`], one per property, assembled explicitly with
//! [`SchemaModelBuilder`] — this workspace has no runtime reflection over
//! field annotations, so unlike a derive-macro-driven schema library there
//! is no implicit extraction step.

use std::sync::Arc;

use bitflags::bitflags;
use indexmap::IndexMap;
use once_cell::sync::OnceCell;

use lazyjson_core::VirtualNode;

use crate::error::ValidationError;

bitflags! {
    /// The JSON node kinds a property may take, per §4.9's `anyOfTypes`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeSet: u8 {
        const NULL    = 0b0000_0001;
        const BOOLEAN = 0b0000_0010;
        const OBJECT  = 0b0000_0100;
        const ARRAY   = 0b0000_1000;
        const NUMBER  = 0b0001_0000;
        const INTEGER = 0b0010_0000;
        const STRING  = 0b0100_0000;
    }
}

/// Presence policy for a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Required {
    Yes,
    #[default]
    No,
    /// Required implicitly when `minLength`/`minItems`/`minProperties` > 0
    /// and the property has a single node type (resolved by
    /// [`Rules::resolve_required`]).
    Auto,
}

/// A custom validator: runs against a node, producing zero or more
/// [`ValidationError`]s. Boxed behind `Arc` so `Rules` stays `Clone`.
pub type CustomValidator = Arc<dyn Fn(&VirtualNode) -> Vec<ValidationError> + Send + Sync>;

/// One property's declarative validation rules, and (through `properties`/
/// `items`) the rules for everything nested beneath it.
#[derive(Clone, Default)]
pub struct Rules {
    pub types: TypeSet,
    pub required: Required,
    pub one_of_jsons: Vec<String>,
    pub custom_validators: Vec<CustomValidator>,

    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub one_of_strings: Vec<String>,
    pub case_insensitive: bool,

    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
    pub multiple_of: Option<f64>,

    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: bool,

    pub min_properties: Option<u64>,
    pub max_properties: Option<u64>,

    /// Rules applied to each array element or (when `types` includes
    /// `OBJECT` and this is used as a map-of-values schema) each member
    /// value.
    pub items: Option<Box<Rules>>,
    /// Nested property rules, keyed by member name.
    pub properties: IndexMap<String, Rules>,

    pub dependent_tags: Vec<DependentTag>,

    /// Overrides the ambient [`crate::validator::compare_mode`] for the
    /// subtree rooted at this property.
    pub any_order: bool,
    pub any_additional: bool,
}

impl std::fmt::Debug for Rules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rules")
            .field("types", &self.types)
            .field("required", &self.required)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// A property's membership in one dependent-required group (§4.9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependentTag {
    pub group: String,
    pub role: DependentRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependentRole {
    /// `tag` — must be present alongside every other plain member of the
    /// group if any one of them is.
    Plain,
    /// `tag!` — presence of this member requires every plain member.
    PresenceTrigger,
    /// `tag?` — absence of this member requires every plain member.
    AbsenceTrigger,
}

impl Rules {
    #[must_use]
    pub fn resolve_required(&self) -> bool {
        match self.required {
            Required::Yes => true,
            Required::No => false,
            Required::Auto => {
                let has_min = self.min_length.unwrap_or(0) > 0
                    || self.min_items.unwrap_or(0) > 0
                    || self.min_properties.unwrap_or(0) > 0;
                has_min && self.types.bits().count_ones() == 1
            }
        }
    }

    /// Merges `self` (the base, lower-precedence) with `over` (higher
    /// precedence): scalar rules fall back to `self` wherever `over`
    /// leaves them unset; list rules concatenate distinct entries;
    /// sub-structures (`items`, `properties`) recurse.
    #[must_use]
    pub fn overlay(&self, over: &Rules) -> Rules {
        Rules {
            types: if over.types.is_empty() { self.types } else { over.types },
            required: match over.required {
                Required::Auto => self.required,
                other => other,
            },
            one_of_jsons: union_distinct(&self.one_of_jsons, &over.one_of_jsons),
            custom_validators: concat(&self.custom_validators, &over.custom_validators),

            min_length: over.min_length.or(self.min_length),
            max_length: over.max_length.or(self.max_length),
            pattern: over.pattern.clone().or_else(|| self.pattern.clone()),
            one_of_strings: union_distinct(&self.one_of_strings, &over.one_of_strings),
            case_insensitive: over.case_insensitive || self.case_insensitive,

            minimum: over.minimum.or(self.minimum),
            maximum: over.maximum.or(self.maximum),
            exclusive_minimum: over.exclusive_minimum.or(self.exclusive_minimum),
            exclusive_maximum: over.exclusive_maximum.or(self.exclusive_maximum),
            multiple_of: over.multiple_of.or(self.multiple_of),

            min_items: over.min_items.or(self.min_items),
            max_items: over.max_items.or(self.max_items),
            unique_items: over.unique_items || self.unique_items,

            min_properties: over.min_properties.or(self.min_properties),
            max_properties: over.max_properties.or(self.max_properties),

            items: match (&self.items, &over.items) {
                (Some(base), Some(over)) => Some(Box::new(base.overlay(over))),
                (base, over) => over.clone().or_else(|| base.clone()),
            },
            properties: overlay_properties(&self.properties, &over.properties),
            dependent_tags: union_distinct(&self.dependent_tags, &over.dependent_tags),

            any_order: over.any_order || self.any_order,
            any_additional: over.any_additional || self.any_additional,
        }
    }

    /// Widens this property to varargs semantics (§4.9): gains `Array` in
    /// its type set, an implicit `minItems: 1` if it was required, and an
    /// `items` rule set inheriting this property's own scalar rules.
    #[must_use]
    pub fn into_varargs(self) -> Rules {
        let was_required = self.resolve_required();
        let mut item_rules = self.clone();
        item_rules.items = None;
        item_rules.properties = IndexMap::new();
        item_rules.dependent_tags = Vec::new();

        let mut result = Rules {
            types: self.types | TypeSet::ARRAY,
            required: self.required,
            items: Some(Box::new(item_rules)),
            min_items: if was_required { Some(self.min_items.unwrap_or(1).max(1)) } else { self.min_items },
            ..Rules::default()
        };
        result.any_order = self.any_order;
        result.any_additional = self.any_additional;
        result
    }
}

fn union_distinct<T: Clone + PartialEq>(base: &[T], over: &[T]) -> Vec<T> {
    let mut out = base.to_vec();
    for item in over {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

fn concat<T: Clone>(base: &[T], over: &[T]) -> Vec<T> {
    let mut out = base.to_vec();
    out.extend(over.iter().cloned());
    out
}

fn overlay_properties(base: &IndexMap<String, Rules>, over: &IndexMap<String, Rules>) -> IndexMap<String, Rules> {
    let mut merged = base.clone();
    for (name, rules) in over {
        match merged.get(name) {
            Some(existing) => {
                let combined = existing.overlay(rules);
                merged.insert(name.clone(), combined);
            }
            None => {
                merged.insert(name.clone(), rules.clone());
            }
        }
    }
    merged
}

/// The root of a declarative schema: an alias of [`Rules`] for the
/// document's top-level node.
pub type SchemaModel = Rules;

/// Fluent assembly of a [`SchemaModel`] (§4.9's "construction surface").
#[derive(Default, Clone)]
pub struct SchemaModelBuilder {
    rules: Rules,
}

impl SchemaModelBuilder {
    #[must_use]
    pub fn new() -> Self {
        SchemaModelBuilder::default()
    }

    #[must_use]
    pub fn types(mut self, types: TypeSet) -> Self {
        self.rules.types = types;
        self
    }

    #[must_use]
    pub fn required(mut self, required: Required) -> Self {
        self.rules.required = required;
        self
    }

    #[must_use]
    pub fn min_length(mut self, n: u64) -> Self {
        self.rules.min_length = Some(n);
        self
    }

    #[must_use]
    pub fn max_length(mut self, n: u64) -> Self {
        self.rules.max_length = Some(n);
        self
    }

    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.rules.pattern = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn one_of_strings(mut self, values: impl IntoIterator<Item = String>) -> Self {
        self.rules.one_of_strings = values.into_iter().collect();
        self
    }

    #[must_use]
    pub fn minimum(mut self, n: f64) -> Self {
        self.rules.minimum = Some(n);
        self
    }

    #[must_use]
    pub fn maximum(mut self, n: f64) -> Self {
        self.rules.maximum = Some(n);
        self
    }

    #[must_use]
    pub fn multiple_of(mut self, n: f64) -> Self {
        self.rules.multiple_of = Some(n);
        self
    }

    #[must_use]
    pub fn min_items(mut self, n: u64) -> Self {
        self.rules.min_items = Some(n);
        self
    }

    #[must_use]
    pub fn max_items(mut self, n: u64) -> Self {
        self.rules.max_items = Some(n);
        self
    }

    #[must_use]
    pub fn unique_items(mut self, yes: bool) -> Self {
        self.rules.unique_items = yes;
        self
    }

    #[must_use]
    pub fn min_properties(mut self, n: u64) -> Self {
        self.rules.min_properties = Some(n);
        self
    }

    #[must_use]
    pub fn max_properties(mut self, n: u64) -> Self {
        self.rules.max_properties = Some(n);
        self
    }

    #[must_use]
    pub fn items(mut self, items: Rules) -> Self {
        self.rules.items = Some(Box::new(items));
        self
    }

    #[must_use]
    pub fn property(mut self, name: impl Into<String>, rules: Rules) -> Self {
        self.rules.properties.insert(name.into(), rules);
        self
    }

    #[must_use]
    pub fn dependent_tag(mut self, group: impl Into<String>, role: DependentRole) -> Self {
        self.rules.dependent_tags.push(DependentTag { group: group.into(), role });
        self
    }

    #[must_use]
    pub fn any_order(mut self, yes: bool) -> Self {
        self.rules.any_order = yes;
        self
    }

    #[must_use]
    pub fn any_additional(mut self, yes: bool) -> Self {
        self.rules.any_additional = yes;
        self
    }

    #[must_use]
    pub fn varargs(mut self) -> Self {
        self.rules = self.rules.into_varargs();
        self
    }

    #[must_use]
    pub fn build(self) -> SchemaModel {
        self.rules
    }
}

/// Memoises a [`SchemaModel`] produced by a caller-provided descriptor
/// function, evaluating it at most once (§4.9's "Caching").
pub struct SchemaModelCache<F> {
    cell: OnceCell<SchemaModel>,
    build: F,
}

impl<F: Fn() -> SchemaModel> SchemaModelCache<F> {
    #[must_use]
    pub const fn new(build: F) -> Self {
        SchemaModelCache { cell: OnceCell::new(), build }
    }

    pub fn get(&self) -> &SchemaModel {
        self.cell.get_or_init(|| (self.build)())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_falls_back_to_base_when_override_unset() {
        let base = SchemaModelBuilder::new().min_length(2).build();
        let over = SchemaModelBuilder::new().max_length(10).build();
        let merged = base.overlay(&over);
        assert_eq!(merged.min_length, Some(2));
        assert_eq!(merged.max_length, Some(10));
    }

    #[test]
    fn overlay_override_wins_when_both_set() {
        let base = SchemaModelBuilder::new().min_length(2).build();
        let over = SchemaModelBuilder::new().min_length(5).build();
        assert_eq!(base.overlay(&over).min_length, Some(5));
    }

    #[test]
    fn varargs_widens_to_array_and_sets_min_items() {
        let base = SchemaModelBuilder::new()
            .types(TypeSet::STRING)
            .required(Required::Yes)
            .min_length(1)
            .build();
        let varargs = base.into_varargs();
        assert!(varargs.types.contains(TypeSet::ARRAY));
        assert_eq!(varargs.min_items, Some(1));
        assert_eq!(varargs.items.unwrap().min_length, Some(1));
    }

    #[test]
    fn auto_required_kicks_in_for_single_type_with_min_constraint() {
        let rules = SchemaModelBuilder::new().types(TypeSet::STRING).min_length(1).build();
        assert!(rules.resolve_required());
    }

    #[test]
    fn cache_evaluates_descriptor_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        fn build() -> SchemaModel {
            CALLS.fetch_add(1, Ordering::SeqCst);
            SchemaModelBuilder::new().types(TypeSet::OBJECT).build()
        }
        let cache = SchemaModelCache::new(build as fn() -> SchemaModel);
        let _ = cache.get();
        let _ = cache.get();
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }
}
