//! The patch engine (§4.7): validates a batch of [`Op`]s for conflicts
//! before touching anything, coalesces adjacent array inserts, then applies
//! the survivors in an order that keeps array indices meaningful
//! (removes high-to-low, inserts low-to-high).

use std::sync::Arc;

use crate::config::ReaderOptions;
use crate::editor;
use crate::error::{ChildOfCtx, Result, SameTargetCtx};
use crate::kind::NodeKind;
use crate::path::{Path, Segment};
use crate::tree::ActualTree;

/// A single patch operation.
#[derive(Debug, Clone)]
pub enum Op {
    /// Add or replace the value at `path`. When `merge` is set and both the
    /// existing and new values are objects, their members are unioned
    /// (right/new wins per key) instead of a full replacement.
    Insert {
        path: Path,
        value_text: String,
        merge: bool,
    },
    /// Remove the node at `path`; a no-op if nothing is there.
    Remove { path: Path },
}

impl Op {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Op::Insert { path, .. } | Op::Remove { path } => path,
        }
    }
}

/// Applies `ops` to `tree`, returning the resulting document.
pub fn apply(tree: &ActualTree, ops: &[Op]) -> Result<ActualTree> {
    let _span = tracing::debug_span!("patch::apply", op_count = ops.len()).entered();
    let ops = merge_array_inserts(ops);
    detect_conflicts(&ops)?;

    let mut removes: Vec<&Op> = ops.iter().filter(|o| matches!(o, Op::Remove { .. })).collect();
    let mut inserts: Vec<&Op> = ops.iter().filter(|o| matches!(o, Op::Insert { .. })).collect();
    // within each group, highest array index first for removes, lowest first for inserts
    removes.sort_by(|a, b| index_of(b.path()).cmp(&index_of(a.path())));
    inserts.sort_by(|a, b| index_of(a.path()).cmp(&index_of(b.path())));

    let options = ReaderOptions::default();
    let mut current = editor::identity_copy(tree);
    for op in removes.into_iter().chain(inserts) {
        current = apply_one(&current, op, options)?;
    }
    tracing::trace!(result_len = current.buffer().len(), "patch applied");
    Ok(current)
}

fn index_of(path: &Path) -> i64 {
    match path.segments().last() {
        Some(Segment::Index(i)) => *i as i64,
        _ => -1,
    }
}

fn apply_one(tree: &ActualTree, op: &Op, options: ReaderOptions) -> Result<ActualTree> {
    match op {
        Op::Remove { path } => apply_remove(tree, path),
        Op::Insert { path, value_text, merge } => apply_insert(tree, path, value_text, *merge, options),
    }
}

fn apply_remove(tree: &ActualTree, path: &Path) -> Result<ActualTree> {
    if path.is_root() {
        return Ok(editor::identity_copy(tree));
    }
    let parent_path = path.parent().expect("non-root path has a parent");
    let Ok(parent) = tree.resolve(tree.root(), &parent_path) else {
        return Ok(editor::identity_copy(tree));
    };
    match path.segments().last().expect("non-root path has a last segment") {
        Segment::Member(name) => {
            if tree.kind(parent) != NodeKind::Object {
                return Ok(editor::identity_copy(tree));
            }
            editor::remove_members(tree, parent, std::slice::from_ref(name))
        }
        Segment::Index(i) => {
            if tree.kind(parent) != NodeKind::Array {
                return Ok(editor::identity_copy(tree));
            }
            editor::remove_elements(tree, parent, *i, i + 1)
        }
    }
}

fn apply_insert(
    tree: &ActualTree,
    path: &Path,
    value_text: &str,
    merge: bool,
    options: ReaderOptions,
) -> Result<ActualTree> {
    if path.is_root() {
        return editor::replace_with(tree, tree.root(), value_text);
    }
    let parent_path = path.parent().expect("non-root path has a parent");
    let parent = tree.resolve(tree.root(), &parent_path)?;
    match path.segments().last().expect("non-root path has a last segment") {
        Segment::Member(name) => {
            if merge {
                if let Ok(Some(existing)) = tree.member(parent, name) {
                    if tree.kind(existing) == NodeKind::Object
                        && ActualTree::new(Arc::from(value_text), options)
                            .map(|t| t.kind(t.root()) == NodeKind::Object)
                            .unwrap_or(false)
                    {
                        let incoming = ActualTree::new(Arc::from(value_text), options)?;
                        return editor::add_members(tree, existing, &incoming, options);
                    }
                }
            }
            editor::add_member(tree, parent, name, value_text, options)
        }
        Segment::Index(i) => {
            let incoming = ActualTree::new(Arc::from(format!("[{value_text}]")), options)?;
            editor::put_elements(tree, parent, *i, &incoming)
        }
    }
}

/// Coalesces `Insert` ops that target consecutive indices of the same
/// array into a single insert at the lowest index.
fn merge_array_inserts(ops: &[Op]) -> Vec<Op> {
    let mut by_prefix: Vec<(Path, Vec<(usize, String)>)> = Vec::new();
    let mut passthrough = Vec::new();
    for op in ops {
        if let Op::Insert { path, value_text, merge: false } = op {
            if let Some(Segment::Index(i)) = path.segments().last() {
                let prefix = path.parent().unwrap();
                if let Some(group) = by_prefix.iter_mut().find(|(p, _)| p == &prefix) {
                    group.1.push((*i, value_text.clone()));
                    continue;
                }
                by_prefix.push((prefix, vec![(*i, value_text.clone())]));
                continue;
            }
        }
        passthrough.push(op.clone());
    }
    let mut merged = passthrough;
    for (prefix, mut items) in by_prefix {
        items.sort_by_key(|(i, _)| *i);
        let mut run: Vec<(usize, String)> = Vec::new();
        let mut flush = |run: &mut Vec<(usize, String)>, merged: &mut Vec<Op>| {
            if run.is_empty() {
                return;
            }
            let first_index = run[0].0;
            let values: Vec<String> = run.iter().map(|(_, v)| v.clone()).collect();
            merged.push(Op::Insert {
                path: prefix.extend(Segment::Index(first_index)),
                value_text: values.join(","),
                merge: false,
            });
            run.clear();
        };
        for item in items {
            if let Some(last) = run.last() {
                if item.0 != last.0 + 1 {
                    flush(&mut run, &mut merged);
                }
            }
            run.push(item);
        }
        flush(&mut run, &mut merged);
    }
    merged
}

fn is_strict_ancestor(maybe_ancestor: &Path, maybe_descendant: &Path) -> bool {
    maybe_ancestor.len() < maybe_descendant.len() && maybe_descendant.shorten_by(maybe_ancestor).is_ok()
}

fn detect_conflicts(ops: &[Op]) -> Result<()> {
    for i in 0..ops.len() {
        for j in (i + 1)..ops.len() {
            let (a, b) = (&ops[i], &ops[j]);
            if a.path() == b.path() {
                let both_mergeable_disjoint = match (a, b) {
                    (
                        Op::Insert { value_text: va, merge: true, .. },
                        Op::Insert { value_text: vb, merge: true, .. },
                    ) => disjoint_object_keys(va, vb),
                    _ => false,
                };
                let flag = matches!(a, Op::Insert { .. }) || matches!(b, Op::Insert { .. });
                if flag && !both_mergeable_disjoint {
                    return SameTargetCtx { first: i, second: j }.fail().map_err(Into::into);
                }
            } else if is_strict_ancestor(a.path(), b.path()) {
                return ChildOfCtx { parent: i, child: j }.fail().map_err(Into::into);
            } else if is_strict_ancestor(b.path(), a.path()) {
                return ChildOfCtx { parent: j, child: i }.fail().map_err(Into::into);
            }
        }
    }
    Ok(())
}

fn disjoint_object_keys(a: &str, b: &str) -> bool {
    let options = ReaderOptions::default();
    let (Ok(ta), Ok(tb)) = (
        ActualTree::new(Arc::from(a), options),
        ActualTree::new(Arc::from(b), options),
    ) else {
        return false;
    };
    if ta.kind(ta.root()) != NodeKind::Object || tb.kind(tb.root()) != NodeKind::Object {
        return false;
    }
    let (Ok(ma), Ok(mb)) = (ta.members(ta.root()), tb.members(tb.root())) else {
        return false;
    };
    !ma.iter().any(|(name, _)| mb.iter().any(|(other, _)| other == name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(text: &str) -> ActualTree {
        ActualTree::new(Arc::from(text), ReaderOptions::default()).unwrap()
    }

    #[test]
    fn insert_and_remove_apply_together() {
        let t = tree(r#"{"a":1,"b":2}"#);
        let ops = vec![
            Op::Remove { path: Path::parse(".a").unwrap() },
            Op::Insert {
                path: Path::parse(".c").unwrap(),
                value_text: "3".to_string(),
                merge: false,
            },
        ];
        let result = apply(&t, &ops).unwrap();
        assert_eq!(result.declaration(result.root()), r#"{"b":2,"c":3}"#);
    }

    #[test]
    fn same_target_conflict_is_rejected() {
        let t = tree(r#"{"a":1}"#);
        let ops = vec![
            Op::Insert { path: Path::parse(".a").unwrap(), value_text: "1".into(), merge: false },
            Op::Insert { path: Path::parse(".a").unwrap(), value_text: "2".into(), merge: false },
        ];
        assert!(apply(&t, &ops).is_err());
    }

    #[test]
    fn ancestor_descendant_conflict_is_rejected() {
        let t = tree(r#"{"a":{"b":1}}"#);
        let ops = vec![
            Op::Remove { path: Path::parse(".a").unwrap() },
            Op::Insert { path: Path::parse(".a.b").unwrap(), value_text: "2".into(), merge: false },
        ];
        assert!(apply(&t, &ops).is_err());
    }

    #[test]
    fn disjoint_merge_inserts_at_same_path_are_allowed() {
        let t = tree(r#"{"a":{"x":1}}"#);
        let ops = vec![
            Op::Insert { path: Path::parse(".a").unwrap(), value_text: r#"{"y":2}"#.into(), merge: true },
        ];
        let result = apply(&t, &ops).unwrap();
        assert_eq!(result.declaration(result.root()), r#"{"a":{"x":1,"y":2}}"#);
    }

    #[test]
    fn remove_of_missing_path_is_a_no_op() {
        let t = tree(r#"{"a":1}"#);
        let ops = vec![Op::Remove { path: Path::parse(".missing").unwrap() }];
        let result = apply(&t, &ops).unwrap();
        assert_eq!(result.declaration(result.root()), r#"{"a":1}"#);
    }
}
