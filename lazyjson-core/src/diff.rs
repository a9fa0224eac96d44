//! Structural comparison (§4.8): three baseline strictness modes plus an
//! `anyOrder` modifier for arrays. Per-property overrides (the typed-view
//! annotations mentioned in §4.9) are not threaded through this engine —
//! they are composed one level up, by calling [`diff`] on a sub-node with a
//! locally adjusted [`Mode`], which keeps this module's algorithm mode-only
//! and lets the schema crate own the override lookup.

use crate::kind::NodeKind;
use crate::number::numeric_eq;
use crate::path::{Path, Segment};
use crate::tree::{ActualTree, NodeKey, Scalar};

/// The baseline strictness of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strictness {
    Strict,
    Standard,
    Lenient,
}

/// A comparison mode: a baseline strictness plus the `anyOrder` array
/// modifier and an opt-in exact-member-order requirement (used by
/// [`crate::virtual_tree::VirtualNode::identical_to`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode {
    strictness: Strictness,
    any_order: bool,
    ordered_members: bool,
}

impl Mode {
    #[must_use]
    pub fn strict() -> Self {
        Mode { strictness: Strictness::Strict, any_order: false, ordered_members: false }
    }

    #[must_use]
    pub fn standard() -> Self {
        Mode { strictness: Strictness::Standard, any_order: false, ordered_members: false }
    }

    #[must_use]
    pub fn lenient() -> Self {
        Mode { strictness: Strictness::Lenient, any_order: false, ordered_members: false }
    }

    #[must_use]
    pub fn any_order(mut self) -> Self {
        self.any_order = true;
        self
    }

    #[must_use]
    pub fn with_ordered_members(mut self, ordered: bool) -> Self {
        self.ordered_members = ordered;
        self
    }
}

/// A single point of divergence between two documents.
#[derive(Debug, Clone, PartialEq)]
pub struct Difference {
    pub path: Path,
    pub kind: DifferenceKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DifferenceKind {
    /// Present on the right, absent on the left.
    MissingLeft,
    /// Present on the left, absent on the right.
    MissingRight,
    Unequal,
}

impl Difference {
    #[must_use]
    pub fn canonical_path(&self) -> String {
        crate::path::render_rooted(&self.path)
    }
}

/// Compares `key_a` in `tree_a` against `key_b` in `tree_b` under `mode`,
/// returning every [`Difference`] found (empty means equivalent).
pub fn diff(
    tree_a: &ActualTree,
    key_a: NodeKey,
    tree_b: &ActualTree,
    key_b: NodeKey,
    mode: &Mode,
) -> crate::error::Result<Vec<Difference>> {
    let mut out = Vec::new();
    walk(tree_a, key_a, tree_b, key_b, &Path::root(), mode, &mut out)?;
    Ok(out)
}

fn walk(
    ta: &ActualTree,
    ka: NodeKey,
    tb: &ActualTree,
    kb: NodeKey,
    path: &Path,
    mode: &Mode,
    out: &mut Vec<Difference>,
) -> crate::error::Result<()> {
    let (kind_a, kind_b) = (ta.kind(ka), tb.kind(kb));
    if kind_a != kind_b {
        out.push(Difference { path: path.clone(), kind: DifferenceKind::Unequal });
        return Ok(());
    }
    match kind_a {
        NodeKind::Object => diff_object(ta, ka, tb, kb, path, mode, out),
        NodeKind::Array => diff_array(ta, ka, tb, kb, path, mode, out),
        NodeKind::Number => {
            let (va, vb) = (ta.value(ka)?, tb.value(kb)?);
            let equal = match (va, vb) {
                (Scalar::Num(x), Scalar::Num(y)) => match mode.strictness {
                    Strictness::Strict => x.to_string() == y.to_string(),
                    _ => numeric_eq(&x, &y),
                },
                _ => false,
            };
            if !equal {
                out.push(Difference { path: path.clone(), kind: DifferenceKind::Unequal });
            }
            Ok(())
        }
        _ => {
            if ta.declaration(ka) != tb.declaration(kb) && !scalars_equal(ta, ka, tb, kb)? {
                out.push(Difference { path: path.clone(), kind: DifferenceKind::Unequal });
            }
            Ok(())
        }
    }
}

fn scalars_equal(ta: &ActualTree, ka: NodeKey, tb: &ActualTree, kb: NodeKey) -> crate::error::Result<bool> {
    Ok(ta.value(ka)? == tb.value(kb)?)
}

fn diff_object(
    ta: &ActualTree,
    ka: NodeKey,
    tb: &ActualTree,
    kb: NodeKey,
    path: &Path,
    mode: &Mode,
    out: &mut Vec<Difference>,
) -> crate::error::Result<()> {
    let members_a = ta.members(ka)?;
    let members_b = tb.members(kb)?;

    if mode.ordered_members {
        let names_a: Vec<&str> = members_a.iter().map(|(n, _)| n.as_str()).collect();
        let names_b: Vec<&str> = members_b.iter().map(|(n, _)| n.as_str()).collect();
        if names_a != names_b {
            out.push(Difference { path: path.clone(), kind: DifferenceKind::Unequal });
            return Ok(());
        }
    }

    for (name, child_a) in &members_a {
        match members_b.iter().find(|(n, _)| n == name) {
            Some((_, child_b)) => {
                walk(ta, *child_a, tb, *child_b, &path.extend(Segment::Member(name.clone())), mode, out)?;
            }
            None => out.push(Difference {
                path: path.extend(Segment::Member(name.clone())),
                kind: DifferenceKind::MissingRight,
            }),
        }
    }
    let lenient = mode.strictness == Strictness::Lenient;
    if !lenient {
        for (name, _) in &members_b {
            if !members_a.iter().any(|(n, _)| n == name) {
                out.push(Difference {
                    path: path.extend(Segment::Member(name.clone())),
                    kind: DifferenceKind::MissingLeft,
                });
            }
        }
    }
    Ok(())
}

fn diff_array(
    ta: &ActualTree,
    ka: NodeKey,
    tb: &ActualTree,
    kb: NodeKey,
    path: &Path,
    mode: &Mode,
    out: &mut Vec<Difference>,
) -> crate::error::Result<()> {
    let elements_a = ta.elements(ka)?;
    let elements_b = tb.elements(kb)?;

    if mode.any_order {
        return diff_array_any_order(ta, &elements_a, tb, &elements_b, path, mode, out);
    }

    let shared = elements_a.len().min(elements_b.len());
    for i in 0..shared {
        walk(ta, elements_a[i], tb, elements_b[i], &path.extend(Segment::Index(i)), mode, out)?;
    }
    if elements_a.len() > shared {
        for i in shared..elements_a.len() {
            out.push(Difference { path: path.extend(Segment::Index(i)), kind: DifferenceKind::MissingRight });
        }
    }
    let lenient = mode.strictness == Strictness::Lenient;
    if !lenient && elements_b.len() > shared {
        for i in shared..elements_b.len() {
            out.push(Difference { path: path.extend(Segment::Index(i)), kind: DifferenceKind::MissingLeft });
        }
    }
    Ok(())
}

/// Multiset comparison for `anyOrder` arrays: each left element is greedily
/// paired with the first not-yet-claimed equivalent right element, so the
/// elements that truly have no counterpart are the only ones reported,
/// localized at their own index — rather than collapsing the whole array
/// into a single `Unequal` at its own path.
fn diff_array_any_order(
    ta: &ActualTree,
    elements_a: &[NodeKey],
    tb: &ActualTree,
    elements_b: &[NodeKey],
    path: &Path,
    mode: &Mode,
    out: &mut Vec<Difference>,
) -> crate::error::Result<()> {
    let texts_a: Vec<String> = elements_a.iter().map(|k| normalized(ta, *k, mode)).collect();
    let texts_b: Vec<String> = elements_b.iter().map(|k| normalized(tb, *k, mode)).collect();
    let mut claimed_b = vec![false; texts_b.len()];
    let mut unmatched_a = Vec::new();

    for (i, text_a) in texts_a.iter().enumerate() {
        let found = texts_b
            .iter()
            .enumerate()
            .find(|(j, text_b)| !claimed_b[*j] && *text_b == text_a);
        match found {
            Some((j, _)) => claimed_b[j] = true,
            None => unmatched_a.push(i),
        }
    }

    for i in unmatched_a {
        out.push(Difference { path: path.extend(Segment::Index(i)), kind: DifferenceKind::MissingRight });
    }

    let lenient = mode.strictness == Strictness::Lenient;
    if !lenient {
        for (j, claimed) in claimed_b.into_iter().enumerate() {
            if !claimed {
                out.push(Difference { path: path.extend(Segment::Index(j)), kind: DifferenceKind::MissingLeft });
            }
        }
    }
    Ok(())
}

/// A canonical text form used to compare array elements as a multiset
/// under `anyOrder`: numbers are normalised to their `f64` value outside
/// STRICT mode so `1` and `1.0` collapse to the same bucket.
fn normalized(tree: &ActualTree, key: NodeKey, mode: &Mode) -> String {
    match tree.kind(key) {
        NodeKind::Number if mode.strictness != Strictness::Strict => tree
            .value(key)
            .map(|v| match v {
                Scalar::Num(n) => n.as_f64().to_string(),
                _ => tree.declaration(key),
            })
            .unwrap_or_else(|_| tree.declaration(key)),
        NodeKind::Object => {
            let mut members = tree.members(key).unwrap_or_default();
            members.sort_by(|a, b| a.0.cmp(&b.0));
            let body: Vec<String> = members
                .into_iter()
                .map(|(name, child)| format!("{name}:{}", normalized(tree, child, mode)))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        NodeKind::Array => {
            let body: Vec<String> = tree
                .elements(key)
                .unwrap_or_default()
                .into_iter()
                .map(|child| normalized(tree, child, mode))
                .collect();
            format!("[{}]", body.join(","))
        }
        _ => tree.declaration(key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReaderOptions;
    use std::sync::Arc;

    fn tree(text: &str) -> ActualTree {
        ActualTree::new(Arc::from(text), ReaderOptions::default()).unwrap()
    }

    #[test]
    fn default_mode_treats_int_and_float_as_equal() {
        let a = tree(r#"{"x": 1}"#);
        let b = tree(r#"{"x": 1.0}"#);
        let d = diff(&a, a.root(), &b, b.root(), &Mode::standard()).unwrap();
        assert!(d.is_empty());
    }

    #[test]
    fn strict_mode_distinguishes_int_and_float_literal() {
        let a = tree(r#"{"x": 1}"#);
        let b = tree(r#"{"x": 1.0}"#);
        let d = diff(&a, a.root(), &b, b.root(), &Mode::strict()).unwrap();
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn lenient_mode_permits_extra_right_members() {
        let a = tree(r#"{"a": 1}"#);
        let b = tree(r#"{"a": 1, "b": 2}"#);
        let d = diff(&a, a.root(), &b, b.root(), &Mode::lenient()).unwrap();
        assert!(d.is_empty());
    }

    #[test]
    fn default_mode_flags_extra_right_members() {
        let a = tree(r#"{"a": 1}"#);
        let b = tree(r#"{"a": 1, "b": 2}"#);
        let d = diff(&a, a.root(), &b, b.root(), &Mode::standard()).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].kind, DifferenceKind::MissingLeft);
    }

    #[test]
    fn any_order_localizes_the_one_unmatched_element() {
        let a = tree("[1,2,3]");
        let b = tree("[1,3,2,5]");
        let d = diff(&a, a.root(), &b, b.root(), &Mode::strict().any_order()).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].path, Path::parse("[3]").unwrap());
        assert_eq!(d[0].kind, DifferenceKind::MissingLeft);
    }

    #[test]
    fn any_order_compares_arrays_as_multisets() {
        let a = tree("[1,2,3]");
        let b = tree("[3,1,2]");
        let d = diff(&a, a.root(), &b, b.root(), &Mode::standard().any_order()).unwrap();
        assert!(d.is_empty());
        let d_ordered = diff(&a, a.root(), &b, b.root(), &Mode::standard()).unwrap();
        assert!(!d_ordered.is_empty());
    }
}
