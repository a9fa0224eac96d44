//! The typed, failure-tolerant façade over an [`ActualTree`] (§4.5): a
//! [`VirtualNode`] that does not exist carries its own path and cause
//! instead of raising, so navigation chains (`get().get().get()`) can run
//! to completion and only the final primitive demand surfaces an error —
//! the inverse of [`ActualTree::resolve`], which fails eagerly.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::diff::{self, Difference, Mode};
use crate::error::{NullValueCtx, UndefinedCause, UndefinedCtx};
use crate::kind::NodeKind;
use crate::lexer::encode_string;
use crate::number::NumberValue;
use crate::patch::{self, Op};
use crate::path::{Path, Segment};
use crate::tree::{ActualTree, NodeKey, Scalar};

/// A node reached through a [`VirtualTree`] walk: either a present node in
/// the backing [`ActualTree`], or a recorded failure to navigate there.
#[derive(Clone)]
pub enum VirtualNode {
    Exists {
        tree: Arc<ActualTree>,
        key: NodeKey,
        path: Path,
    },
    Undefined {
        tree: Arc<ActualTree>,
        path: Path,
        cause: UndefinedCause,
    },
}

/// A typed view: a capability set attached to a [`VirtualNode`] without
/// wrapping or copying it (§9, "default-method typed views"). Implement
/// this for a marker type and call [`VirtualNode::as_view`]/[`VirtualNode::as_a`].
pub trait TypedView: Sized {
    /// Wraps `node` in this view, unconditionally.
    fn from_node(node: VirtualNode) -> Self;

    /// Checks that `node` has the shape this view requires. The default
    /// accepts any node; override to enforce a structural precondition.
    fn assert_shape(_node: &VirtualNode) -> crate::error::Result<()> {
        Ok(())
    }
}

impl VirtualNode {
    #[must_use]
    pub fn root(tree: Arc<ActualTree>) -> Self {
        let key = tree.root();
        VirtualNode::Exists {
            tree,
            key,
            path: Path::root(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            VirtualNode::Exists { path, .. } | VirtualNode::Undefined { path, .. } => path,
        }
    }

    fn tree(&self) -> &Arc<ActualTree> {
        match self {
            VirtualNode::Exists { tree, .. } | VirtualNode::Undefined { tree, .. } => tree,
        }
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        matches!(self, VirtualNode::Exists { .. })
    }

    #[must_use]
    pub fn is_undefined(&self) -> bool {
        !self.exists()
    }

    fn kind(&self) -> Option<NodeKind> {
        match self {
            VirtualNode::Exists { tree, key, .. } => Some(tree.kind(*key)),
            VirtualNode::Undefined { .. } => None,
        }
    }

    #[must_use]
    pub fn is_object(&self) -> bool {
        self.kind() == Some(NodeKind::Object)
    }
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.kind() == Some(NodeKind::Array)
    }
    #[must_use]
    pub fn is_string(&self) -> bool {
        self.kind() == Some(NodeKind::String)
    }
    #[must_use]
    pub fn is_number(&self) -> bool {
        self.kind() == Some(NodeKind::Number)
    }
    #[must_use]
    pub fn is_boolean(&self) -> bool {
        self.kind() == Some(NodeKind::Boolean)
    }
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.kind() == Some(NodeKind::Null)
    }

    /// True if this is a number whose exact value has zero fractional part.
    #[must_use]
    pub fn is_integer(&self) -> bool {
        match self {
            VirtualNode::Exists { tree, key, .. } if tree.kind(*key) == NodeKind::Number => {
                tree.value(*key).map(|v| matches!(v, Scalar::Num(n) if n.is_integer())).unwrap_or(false)
            }
            _ => false,
        }
    }

    fn undefined_step(&self, step: Segment, cause: UndefinedCause) -> VirtualNode {
        VirtualNode::Undefined {
            tree: Arc::clone(self.tree()),
            path: self.path().extend(step),
            cause,
        }
    }

    /// Navigates to the member `name`, never raising.
    #[must_use]
    pub fn get_member(&self, name: &str) -> VirtualNode {
        match self {
            VirtualNode::Exists { tree, key, path } => {
                let parent_kind = tree.kind(*key);
                if parent_kind != NodeKind::Object {
                    return self.undefined_step(
                        Segment::Member(name.to_string()),
                        UndefinedCause::WrongKindParent {
                            expected: "object",
                            actual: parent_kind,
                        },
                    );
                }
                match tree.member(*key, name) {
                    Ok(Some(child)) => VirtualNode::Exists {
                        tree: Arc::clone(tree),
                        key: child,
                        path: path.extend(Segment::Member(name.to_string())),
                    },
                    _ => self.undefined_step(
                        Segment::Member(name.to_string()),
                        UndefinedCause::NoMember {
                            parent_kind,
                            name: name.to_string(),
                        },
                    ),
                }
            }
            VirtualNode::Undefined { .. } => {
                self.undefined_step(Segment::Member(name.to_string()), self.cause_or_parent())
            }
        }
    }

    /// Navigates to element `index`, never raising.
    #[must_use]
    pub fn get_index(&self, index: usize) -> VirtualNode {
        match self {
            VirtualNode::Exists { tree, key, path } => {
                let parent_kind = tree.kind(*key);
                if parent_kind != NodeKind::Array {
                    return self.undefined_step(
                        Segment::Index(index),
                        UndefinedCause::WrongKindParent {
                            expected: "array",
                            actual: parent_kind,
                        },
                    );
                }
                match tree.element(*key, index) {
                    Ok(Some(child)) => VirtualNode::Exists {
                        tree: Arc::clone(tree),
                        key: child,
                        path: path.extend(Segment::Index(index)),
                    },
                    _ => {
                        let size = tree.elements(*key).unwrap_or_default().len();
                        self.undefined_step(
                            Segment::Index(index),
                            UndefinedCause::OutOfRange {
                                parent_kind,
                                index,
                                size,
                            },
                        )
                    }
                }
            }
            VirtualNode::Undefined { .. } => {
                self.undefined_step(Segment::Index(index), self.cause_or_parent())
            }
        }
    }

    fn cause_or_parent(&self) -> UndefinedCause {
        match self {
            VirtualNode::Undefined { cause, .. } => cause.clone(),
            VirtualNode::Exists { .. } => unreachable!(),
        }
    }

    /// Navigates the full path from this node, never raising.
    #[must_use]
    pub fn get(&self, path: &Path) -> VirtualNode {
        let mut current = self.clone();
        for segment in path.segments() {
            current = match segment {
                Segment::Member(name) => current.get_member(name),
                Segment::Index(index) => current.get_index(*index),
            };
        }
        current
    }

    fn require_exists(&self) -> crate::error::Result<(Arc<ActualTree>, NodeKey)> {
        match self {
            VirtualNode::Exists { tree, key, .. } => Ok((Arc::clone(tree), *key)),
            VirtualNode::Undefined { path, cause, .. } => UndefinedCtx {
                path: path.clone(),
                cause: cause.clone(),
            }
            .fail()
            .map_err(Into::into),
        }
    }

    /// The decoded string value. Raises if undefined, not a string, or
    /// (structurally impossible for strings, but kept for symmetry) null.
    pub fn string(&self) -> crate::error::Result<String> {
        let (tree, key) = self.require_exists()?;
        if tree.kind(key) == NodeKind::Null {
            return NullValueCtx { path: self.path().clone() }.fail().map_err(Into::into);
        }
        match tree.value(key)? {
            Scalar::Str(s) => Ok(s),
            _ => crate::error::WrongKindCtx {
                operation: "string()",
                expected: "string",
                actual: tree.kind(key),
            }
            .fail()
            .map_err(Into::into),
        }
    }

    pub fn number(&self) -> crate::error::Result<NumberValue> {
        let (tree, key) = self.require_exists()?;
        if tree.kind(key) == NodeKind::Null {
            return NullValueCtx { path: self.path().clone() }.fail().map_err(Into::into);
        }
        match tree.value(key)? {
            Scalar::Num(n) => Ok(n),
            _ => crate::error::WrongKindCtx {
                operation: "number()",
                expected: "number",
                actual: tree.kind(key),
            }
            .fail()
            .map_err(Into::into),
        }
    }

    pub fn boolean(&self) -> crate::error::Result<bool> {
        let (tree, key) = self.require_exists()?;
        if tree.kind(key) == NodeKind::Null {
            return NullValueCtx { path: self.path().clone() }.fail().map_err(Into::into);
        }
        match tree.value(key)? {
            Scalar::Bool(b) => Ok(b),
            _ => crate::error::WrongKindCtx {
                operation: "boolean()",
                expected: "boolean",
                actual: tree.kind(key),
            }
            .fail()
            .map_err(Into::into),
        }
    }

    /// The member/element count of an object or array. Raises `NullValue`
    /// if demanded on a JSON `null`.
    pub fn size(&self) -> crate::error::Result<usize> {
        let (tree, key) = self.require_exists()?;
        if tree.kind(key) == NodeKind::Null {
            return NullValueCtx { path: self.path().clone() }.fail().map_err(Into::into);
        }
        tree.count(key)
    }

    /// Depth-first count of every descendant (self included) whose kind is
    /// `kind`. Raises `NullValue` if demanded on a JSON `null`.
    pub fn count_of_kind(&self, kind: NodeKind) -> crate::error::Result<usize> {
        let (tree, key) = self.require_exists()?;
        if tree.kind(key) == NodeKind::Null {
            return NullValueCtx { path: self.path().clone() }.fail().map_err(Into::into);
        }
        tree.count_of_kind(key, kind)
    }

    /// The member names of an object, in declaration order.
    pub fn names(&self) -> crate::error::Result<Vec<String>> {
        let (tree, key) = self.require_exists()?;
        Ok(tree.members(key)?.into_iter().map(|(name, _)| name).collect())
    }

    fn children(&self) -> crate::error::Result<Vec<VirtualNode>> {
        let (tree, key) = self.require_exists()?;
        match tree.kind(key) {
            NodeKind::Object => Ok(tree
                .members(key)?
                .into_iter()
                .map(|(name, child)| VirtualNode::Exists {
                    tree: Arc::clone(&tree),
                    key: child,
                    path: self.path().extend(Segment::Member(name)),
                })
                .collect()),
            NodeKind::Array => Ok(tree
                .elements(key)?
                .into_iter()
                .enumerate()
                .map(|(i, child)| VirtualNode::Exists {
                    tree: Arc::clone(&tree),
                    key: child,
                    path: self.path().extend(Segment::Index(i)),
                })
                .collect()),
            other => crate::error::WrongKindCtx {
                operation: "children()",
                expected: "object or array",
                actual: other,
            }
            .fail()
            .map_err(Into::into),
        }
    }

    pub fn string_values(&self) -> crate::error::Result<Vec<String>> {
        self.children()?.iter().map(VirtualNode::string).collect()
    }

    pub fn number_values(&self) -> crate::error::Result<Vec<NumberValue>> {
        self.children()?.iter().map(VirtualNode::number).collect()
    }

    pub fn bool_values(&self) -> crate::error::Result<Vec<bool>> {
        self.children()?.iter().map(VirtualNode::boolean).collect()
    }

    /// Reinterprets this node as a typed view, unconditionally.
    #[must_use]
    pub fn as_view<T: TypedView>(self) -> T {
        T::from_node(self)
    }

    /// Reinterprets this node as a typed view, asserting its structural
    /// shape first.
    pub fn as_a<T: TypedView>(self) -> crate::error::Result<T> {
        T::assert_shape(&self)?;
        Ok(T::from_node(self))
    }

    /// Applies `f` to each member/element and collects the results.
    pub fn project<U>(&self, f: impl Fn(&VirtualNode) -> U) -> crate::error::Result<Vec<U>> {
        Ok(self.children()?.iter().map(f).collect())
    }

    /// Projects an array into `Vec<U>`.
    pub fn view_as_list<U>(&self, f: impl Fn(&VirtualNode) -> U) -> crate::error::Result<Vec<U>> {
        let (tree, key) = self.require_exists()?;
        if tree.kind(key) != NodeKind::Array {
            return crate::error::WrongKindCtx {
                operation: "viewAsList()",
                expected: "array",
                actual: tree.kind(key),
            }
            .fail()
            .map_err(Into::into);
        }
        self.project(f)
    }

    /// Projects an object into an ordered `name -> U` map.
    pub fn view_as_map<U>(
        &self,
        f: impl Fn(&VirtualNode) -> U,
    ) -> crate::error::Result<IndexMap<String, U>> {
        let (tree, key) = self.require_exists()?;
        if tree.kind(key) != NodeKind::Object {
            return crate::error::WrongKindCtx {
                operation: "viewAsMap()",
                expected: "object",
                actual: tree.kind(key),
            }
            .fail()
            .map_err(Into::into);
        }
        Ok(tree
            .members(key)?
            .into_iter()
            .map(|(name, child)| {
                let node = VirtualNode::Exists {
                    tree: Arc::clone(&tree),
                    key: child,
                    path: self.path().extend(Segment::Member(name.clone())),
                };
                (name, f(&node))
            })
            .collect())
    }

    /// Depth-first search for the first descendant (including `self`)
    /// matching `predicate`; `Undefined` if none matches.
    #[must_use]
    pub fn find(&self, predicate: impl Fn(&VirtualNode) -> bool) -> VirtualNode {
        fn find_inner(node: &VirtualNode, predicate: &dyn Fn(&VirtualNode) -> bool) -> VirtualNode {
            if predicate(node) {
                return node.clone();
            }
            if let Ok(kids) = node.children() {
                for child in kids {
                    let found = find_inner(&child, predicate);
                    if found.exists() {
                        return found;
                    }
                }
            }
            VirtualNode::Undefined {
                tree: Arc::clone(node.tree()),
                path: node.path().clone(),
                cause: UndefinedCause::NoMember {
                    parent_kind: node.kind().unwrap_or(NodeKind::Null),
                    name: String::new(),
                },
            }
        }
        find_inner(self, &predicate)
    }

    /// Structural equivalence under `mode` (§4.8). `true` iff the diff is
    /// empty.
    #[must_use]
    pub fn equivalent_to(&self, other: &VirtualNode, mode: Mode) -> bool {
        self.diff(other, mode).map(|d| d.is_empty()).unwrap_or(false)
    }

    /// Equivalence under STRICT mode with exact member order.
    #[must_use]
    pub fn identical_to(&self, other: &VirtualNode) -> bool {
        self.diff(other, Mode::strict().with_ordered_members(true))
            .map(|d| d.is_empty())
            .unwrap_or(false)
    }

    pub fn diff(&self, other: &VirtualNode, mode: Mode) -> crate::error::Result<Vec<Difference>> {
        let (tree_a, key_a) = self.require_exists()?;
        let (tree_b, key_b) = other.require_exists()?;
        diff::diff(&tree_a, key_a, &tree_b, key_b, &mode)
    }

    /// Applies `ops` to the document containing this node, returning the
    /// resulting document's root as a fresh [`VirtualNode`].
    pub fn patch(&self, ops: &[Op]) -> crate::error::Result<VirtualNode> {
        let (tree, _) = self.require_exists()?;
        let new_tree = patch::apply(&tree, ops)?;
        Ok(VirtualNode::root(Arc::new(new_tree)))
    }

    /// Renders this node's subtree as minimised (whitespace-free) JSON.
    pub fn to_minimized_json(&self) -> crate::error::Result<String> {
        let (tree, key) = self.require_exists()?;
        Ok(render_minimized(&tree, key))
    }
}

fn render_minimized(tree: &ActualTree, key: NodeKey) -> String {
    match tree.kind(key) {
        NodeKind::Object => {
            let members = tree.members(key).unwrap_or_default();
            let body: Vec<String> = members
                .into_iter()
                .map(|(name, child)| format!("{}:{}", encode_string(&name), render_minimized(tree, child)))
                .collect();
            format!("{{{}}}", body.join(","))
        }
        NodeKind::Array => {
            let elements = tree.elements(key).unwrap_or_default();
            let body: Vec<String> = elements.iter().map(|child| render_minimized(tree, *child)).collect();
            format!("[{}]", body.join(","))
        }
        NodeKind::String => encode_string(&tree.value(key).map(|v| match v {
            Scalar::Str(s) => s,
            _ => String::new(),
        }).unwrap_or_default()),
        _ => tree.declaration(key),
    }
}

/// Entry point for building a [`VirtualNode`] at the root of `tree`.
pub struct VirtualTree;

impl VirtualTree {
    #[must_use]
    pub fn root(tree: Arc<ActualTree>) -> VirtualNode {
        VirtualNode::root(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReaderOptions;

    fn root(text: &str) -> VirtualNode {
        let tree = ActualTree::new(Arc::from(text), ReaderOptions::default()).unwrap();
        VirtualTree::root(Arc::new(tree))
    }

    #[test]
    fn undefined_chains_never_raise() {
        let v = root(r#"{"a": 1}"#);
        let missing = v.get_member("x").get_member("y").get_index(3);
        assert!(missing.is_undefined());
        assert!(missing.string().is_err());
    }

    #[test]
    fn typed_accessors_work() {
        let v = root(r#"{"a": 1, "b": "hi", "c": true, "d": null, "e": [1,2]}"#);
        assert!(v.get_member("a").is_integer());
        assert_eq!(v.get_member("b").string().unwrap(), "hi");
        assert!(v.get_member("c").boolean().unwrap());
        assert!(v.get_member("d").is_null());
        assert_eq!(v.get_member("e").size().unwrap(), 2);
    }

    #[test]
    fn null_size_raises() {
        let v = root(r#"{"a": null}"#);
        assert!(v.get_member("a").size().is_err());
    }

    #[test]
    fn minimized_json_round_trips_structure() {
        let v = root(r#"{ "a" : [ 1 , 2 ] , "b" : "x" }"#);
        assert_eq!(v.to_minimized_json().unwrap(), r#"{"a":[1,2],"b":"x"}"#);
    }

    #[test]
    fn find_locates_nested_match() {
        let v = root(r#"{"a": {"b": 5}, "c": 6}"#);
        let found = v.find(|n| n.is_number() && n.number().map(|x| x.as_f64() == 5.0).unwrap_or(false));
        assert!(found.exists());
    }
}
