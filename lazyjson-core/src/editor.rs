//! Structural editing (§4.6): every operation here produces a brand new
//! [`ActualTree`] by splicing the backing text and reparsing — the
//! existing tree and every [`NodeKey`] into it remain untouched, matching
//! the "ActualTrees are immutable" lifecycle rule (§4.3).

use std::sync::Arc;

use crate::config::ReaderOptions;
use crate::error::{Result, WrongKindCtx};
use crate::kind::NodeKind;
use crate::lexer::encode_string;
use crate::tree::{ActualTree, NodeKey};

fn require(tree: &ActualTree, node: NodeKey, expected: NodeKind, operation: &'static str) -> Result<()> {
    let actual = tree.kind(node);
    if actual != expected {
        return WrongKindCtx {
            operation,
            expected: expected.name(),
            actual,
        }
        .fail()
        .map_err(Into::into);
    }
    Ok(())
}

fn reparse(buffer: String, options: ReaderOptions) -> Result<ActualTree> {
    ActualTree::new(Arc::from(buffer), options).map_err(Into::into)
}

fn object_entries(tree: &ActualTree, object: NodeKey) -> Result<Vec<(String, String)>> {
    tree.members(object)?
        .into_iter()
        .map(|(name, child)| Ok((name, tree.declaration(child))))
        .collect()
}

fn render_object(entries: &[(String, String)]) -> String {
    let body: Vec<String> = entries
        .iter()
        .map(|(name, text)| format!("{}:{text}", encode_string(name)))
        .collect();
    format!("{{{}}}", body.join(","))
}

fn render_array(texts: &[String]) -> String {
    format!("[{}]", texts.join(","))
}

/// Adds (or replaces, if already present) a single member.
pub fn add_member(
    tree: &ActualTree,
    object: NodeKey,
    name: &str,
    value_text: &str,
    options: ReaderOptions,
) -> Result<ActualTree> {
    require(tree, object, NodeKind::Object, "addMember()")?;
    let mut entries = object_entries(tree, object)?;
    match entries.iter_mut().find(|(n, _)| n == name) {
        Some((_, text)) => *text = value_text.to_string(),
        None => entries.push((name.to_string(), value_text.to_string())),
    }
    splice(tree, object, &render_object(&entries), options)
}

/// Merges every member of `other` (a standalone object document) into
/// `object`; `other`'s values override on key conflict.
pub fn add_members(
    tree: &ActualTree,
    object: NodeKey,
    other: &ActualTree,
    options: ReaderOptions,
) -> Result<ActualTree> {
    require(tree, object, NodeKind::Object, "addMembers()")?;
    require(other, other.root(), NodeKind::Object, "addMembers()")?;
    let mut entries = object_entries(tree, object)?;
    for (name, text) in object_entries(other, other.root())? {
        match entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = text,
            None => entries.push((name, text)),
        }
    }
    splice(tree, object, &render_object(&entries), options)
}

/// Drops every listed member name; unknown names are ignored.
pub fn remove_members(
    tree: &ActualTree,
    object: NodeKey,
    names: &[String],
) -> Result<ActualTree> {
    require(tree, object, NodeKind::Object, "removeMembers()")?;
    let entries: Vec<_> = object_entries(tree, object)?
        .into_iter()
        .filter(|(name, _)| !names.iter().any(|n| n == name))
        .collect();
    splice(tree, object, &render_object(&entries), tree_options(tree))
}

/// Replaces the raw bytes of `node` with `value_text`.
pub fn replace_with(tree: &ActualTree, node: NodeKey, value_text: &str) -> Result<ActualTree> {
    splice(tree, node, value_text, tree_options(tree))
}

/// Appends every element of `other` (a standalone array document) to
/// `array`.
pub fn add_elements(tree: &ActualTree, array: NodeKey, other: &ActualTree) -> Result<ActualTree> {
    require(tree, array, NodeKind::Array, "addElements()")?;
    require(other, other.root(), NodeKind::Array, "addElements()")?;
    let mut texts: Vec<String> = tree
        .elements(array)?
        .into_iter()
        .map(|child| tree.declaration(child))
        .collect();
    texts.extend(
        other
            .elements(other.root())?
            .into_iter()
            .map(|child| other.declaration(child)),
    );
    splice(tree, array, &render_array(&texts), tree_options(tree))
}

/// Inserts every element of `other` at index `i`, padding with `null` if
/// `i` is beyond the current size.
pub fn put_elements(
    tree: &ActualTree,
    array: NodeKey,
    i: usize,
    other: &ActualTree,
) -> Result<ActualTree> {
    require(tree, array, NodeKind::Array, "putElements()")?;
    require(other, other.root(), NodeKind::Array, "putElements()")?;
    let mut texts: Vec<String> = tree
        .elements(array)?
        .into_iter()
        .map(|child| tree.declaration(child))
        .collect();
    while texts.len() < i {
        texts.push("null".to_string());
    }
    let insertion: Vec<String> = other
        .elements(other.root())?
        .into_iter()
        .map(|child| other.declaration(child))
        .collect();
    let tail = texts.split_off(i.min(texts.len()));
    texts.extend(insertion);
    texts.extend(tail);
    splice(tree, array, &render_array(&texts), tree_options(tree))
}

/// Drops the half-open element range `[from, to)`, clamping `to` to the
/// array's size; a no-op if the resulting range is empty.
pub fn remove_elements(
    tree: &ActualTree,
    array: NodeKey,
    from: usize,
    to: usize,
) -> Result<ActualTree> {
    require(tree, array, NodeKind::Array, "removeElements()")?;
    let children = tree.elements(array)?;
    let to = to.min(children.len());
    if from >= to {
        return Ok(clone_via_buffer(tree));
    }
    let texts: Vec<String> = children
        .iter()
        .enumerate()
        .filter(|(i, _)| *i < from || *i >= to)
        .map(|(_, child)| tree.declaration(*child))
        .collect();
    splice(tree, array, &render_array(&texts), tree_options(tree))
}

/// Produces a standalone tree whose root is `node`'s own text.
pub fn extract(tree: &ActualTree, node: NodeKey) -> Result<ActualTree> {
    reparse(tree.declaration(node), tree_options(tree))
}

fn tree_options(tree: &ActualTree) -> ReaderOptions {
    // ActualTree does not expose its options directly; non-standard input
    // is normalised into standard syntax by the time a tree exists, so
    // edited output is always re-parsed in standard mode.
    let _ = tree;
    ReaderOptions::default()
}

fn splice(tree: &ActualTree, node: NodeKey, replacement: &str, options: ReaderOptions) -> Result<ActualTree> {
    let (start, end) = tree.span(node);
    let buffer = tree.buffer();
    let mut new_buffer = String::with_capacity(buffer.len() - (end - start) + replacement.len());
    new_buffer.push_str(&buffer[..start]);
    new_buffer.push_str(replacement);
    new_buffer.push_str(&buffer[end..]);
    reparse(new_buffer, options)
}

/// Reparses `tree`'s own buffer, producing an unmodified-but-distinct tree.
/// Used by the patch engine for no-op removes.
pub(crate) fn identity_copy(tree: &ActualTree) -> ActualTree {
    clone_via_buffer(tree)
}

fn clone_via_buffer(tree: &ActualTree) -> ActualTree {
    ActualTree::new(Arc::from(tree.buffer()), tree_options(tree)).expect("buffer was already valid JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(text: &str) -> ActualTree {
        ActualTree::new(Arc::from(text), ReaderOptions::default()).unwrap()
    }

    #[test]
    fn add_member_appends_new_key() {
        let t = tree(r#"{"a":1}"#);
        let edited = add_member(&t, t.root(), "b", "2", ReaderOptions::default()).unwrap();
        assert_eq!(edited.declaration(edited.root()), r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn add_member_replaces_existing_key() {
        let t = tree(r#"{"a":1,"b":2}"#);
        let edited = add_member(&t, t.root(), "a", "99", ReaderOptions::default()).unwrap();
        assert_eq!(edited.declaration(edited.root()), r#"{"a":99,"b":2}"#);
    }

    #[test]
    fn remove_members_drops_listed_keys() {
        let t = tree(r#"{"a":1,"b":2,"c":3}"#);
        let edited = remove_members(&t, t.root(), &["b".to_string(), "missing".to_string()]).unwrap();
        assert_eq!(edited.declaration(edited.root()), r#"{"a":1,"c":3}"#);
    }

    #[test]
    fn put_elements_pads_with_null() {
        let t = tree("[1]");
        let other = tree("[9]");
        let edited = put_elements(&t, t.root(), 3, &other).unwrap();
        assert_eq!(edited.declaration(edited.root()), "[1,null,null,9]");
    }

    #[test]
    fn remove_elements_clamps_and_no_ops_on_empty_range() {
        let t = tree("[1,2,3,4]");
        let edited = remove_elements(&t, t.root(), 1, 100).unwrap();
        assert_eq!(edited.declaration(edited.root()), "[1]");
        let unchanged = remove_elements(&t, t.root(), 2, 2).unwrap();
        assert_eq!(unchanged.declaration(unchanged.root()), "[1,2,3,4]");
    }

    #[test]
    fn extract_produces_standalone_tree() {
        let t = tree(r#"{"a":[1,2,3]}"#);
        let a = t.member(t.root(), "a").unwrap().unwrap();
        let extracted = extract(&t, a).unwrap();
        assert_eq!(extracted.declaration(extracted.root()), "[1,2,3]");
    }
}
