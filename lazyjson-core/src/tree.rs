//! The materialised-on-demand node arena (§4.3, §5): a `SlotMap`-keyed
//! table of [`ActualNode`]s over a shared text buffer, in the same spirit
//! as the schema table in this workspace's compiled-schema store — keys
//! instead of pointers sidestep reference cycles between parent and child,
//! and a node is only added to the arena the first time something asks for
//! it.
//!
//! A container node's children are discovered lazily: the first `member`/
//! `element`/`members`/`elements` call on it scans forward from wherever
//! the last call left off (recorded as `scan_end`), so repeated lookups
//! never re-skip bytes already visited, and an out-of-order `element(7)`
//! after `element(2)` simply resumes the scan instead of restarting it.

use std::sync::{Arc, RwLock};

use indexmap::IndexMap;
use slotmap::{new_key_type, SlotMap};

use crate::config::ReaderOptions;
use crate::error::{NullValueCtx, UndefinedCause, UndefinedCtx, WrongKindCtx, WrongKindParentCtx};
use crate::kind::NodeKind;
use crate::lexer::{self, decode_string};
use crate::number::NumberValue;
use crate::path::{Path, Segment};

new_key_type! {
    /// A stable handle to a node within one [`ActualTree`]. Keys from one
    /// tree are meaningless against another.
    pub struct NodeKey;
}

/// A materialised scalar value, decoded from its raw declaration text.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Num(NumberValue),
    Bool(bool),
    Null,
}

enum Children {
    /// Not a container; never populated.
    Opaque,
    Object {
        members: IndexMap<String, NodeKey>,
        /// Every child inserted during the scan, in declaration order,
        /// including later duplicates shadowed out of `members` — kept so
        /// `visit`/`visit_inner` can still reach them even though name
        /// lookup only ever sees the first occurrence.
        all: Vec<NodeKey>,
        scan_end: usize,
        complete: bool,
    },
    Array {
        elements: Vec<NodeKey>,
        scan_end: usize,
        complete: bool,
    },
}

struct ActualNode {
    kind: NodeKind,
    parent: Option<NodeKey>,
    /// Offset of the node's first declaration byte (after whitespace).
    start: usize,
    /// Offset one past the node's last declaration byte.
    end: usize,
    children: RwLock<Children>,
}

/// The eagerly-walkable, lazily-populated tree over one JSON text buffer.
///
/// Every accessor takes a [`NodeKey`] rather than a reference, so the tree
/// can be shared (`Arc<ActualTree>`) across the [`VirtualTree`](crate::virtual_tree::VirtualTree)
/// views built on top of it without lifetime entanglement.
pub struct ActualTree {
    buffer: Arc<str>,
    options: ReaderOptions,
    arena: RwLock<SlotMap<NodeKey, ActualNode>>,
    root: NodeKey,
}

impl ActualTree {
    /// Parses just enough of `buffer` to classify and bound the root value,
    /// without descending into it.
    pub fn new(buffer: Arc<str>, options: ReaderOptions) -> crate::error::Result<Self, crate::error::MalformedError> {
        let _span = tracing::debug_span!("ActualTree::new", buffer_len = buffer.len()).entered();
        let bytes = buffer.as_bytes();
        let (kind, start) = lexer::classify(bytes, 0, &options)?;
        let end = lexer::skip_value(bytes, start, &options)?;
        let mut arena = SlotMap::with_key();
        let root = arena.insert(ActualNode {
            kind,
            parent: None,
            start,
            end,
            children: RwLock::new(Children::Opaque),
        });
        if let Some(node) = arena.get_mut(root) {
            node.children = RwLock::new(new_children_for(kind));
        }
        tracing::trace!(kind = %kind, "root classified");
        Ok(ActualTree {
            buffer,
            options,
            arena: RwLock::new(arena),
            root,
        })
    }

    #[must_use]
    pub fn root(&self) -> NodeKey {
        self.root
    }

    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// The raw declaration text of `key` (unparsed, unescaped).
    #[must_use]
    pub fn declaration(&self, key: NodeKey) -> String {
        let arena = self.arena.read().unwrap();
        let node = &arena[key];
        self.buffer[node.start..node.end].to_string()
    }

    /// The `(start, end)` byte span of `key`'s declaration within the
    /// buffer. Known immediately for every node, container or not, since
    /// [`lexer::skip_value`] determines the full extent up front.
    #[must_use]
    pub fn span(&self, key: NodeKey) -> (usize, usize) {
        let arena = self.arena.read().unwrap();
        let node = &arena[key];
        (node.start, node.end)
    }

    #[must_use]
    pub fn kind(&self, key: NodeKey) -> NodeKind {
        self.arena.read().unwrap()[key].kind
    }

    #[must_use]
    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.arena.read().unwrap()[key].parent
    }

    /// Decodes the scalar value at `key`. Fails with [`TypeError::WrongKind`]
    /// if `key` is a container.
    pub fn value(&self, key: NodeKey) -> crate::error::Result<Scalar> {
        let (kind, text) = {
            let arena = self.arena.read().unwrap();
            let node = &arena[key];
            (node.kind, self.buffer[node.start..node.end].to_string())
        };
        Ok(match kind {
            NodeKind::String => Scalar::Str(decode_string(&text)),
            NodeKind::Number => Scalar::Num(NumberValue::parse(&text)),
            NodeKind::Boolean => Scalar::Bool(text == "true"),
            NodeKind::Null => Scalar::Null,
            NodeKind::Object | NodeKind::Array => {
                return WrongKindCtx {
                    operation: "value()",
                    expected: "a scalar",
                    actual: kind,
                }
                .fail()
                .map_err(Into::into)
            }
        })
    }

    /// Looks up an object member by name, scanning forward only as far as
    /// necessary. Returns `Ok(None)` if the member does not exist.
    pub fn member(&self, key: NodeKey, name: &str) -> crate::error::Result<Option<NodeKey>> {
        self.ensure_kind(key, NodeKind::Object, "member()")?;
        if let Some(existing) = self.existing_member(key, name) {
            return Ok(Some(existing));
        }
        loop {
            let (done, found) = self.advance_object(key, Some(name))?;
            if let Some(found) = found {
                return Ok(Some(found));
            }
            if done {
                return Ok(None);
            }
        }
    }

    fn existing_member(&self, key: NodeKey, name: &str) -> Option<NodeKey> {
        let arena = self.arena.read().unwrap();
        let children = arena[key].children.read().unwrap();
        match &*children {
            Children::Object { members, .. } => members.get(name).copied(),
            _ => None,
        }
    }

    /// Returns every member of the object at `key`, in first-declared
    /// order, fully populating the memoised table if needed.
    pub fn members(&self, key: NodeKey) -> crate::error::Result<Vec<(String, NodeKey)>> {
        self.ensure_kind(key, NodeKind::Object, "members()")?;
        loop {
            let complete = {
                let arena = self.arena.read().unwrap();
                let children = arena[key].children.read().unwrap();
                matches!(&*children, Children::Object { complete: true, .. })
            };
            if complete {
                break;
            }
            self.advance_object(key, None)?;
        }
        let arena = self.arena.read().unwrap();
        let children = arena[key].children.read().unwrap();
        match &*children {
            Children::Object { members, .. } => {
                Ok(members.iter().map(|(k, v)| (k.clone(), *v)).collect())
            }
            _ => unreachable!(),
        }
    }

    /// Returns every child ever inserted into the object at `key`, in
    /// declaration order, including later duplicates shadowed out of
    /// [`ActualTree::members`] by the first-occurrence-wins lookup rule.
    /// Used by [`ActualTree::visit`] so a duplicate key is still countable.
    fn all_object_children(&self, key: NodeKey) -> crate::error::Result<Vec<NodeKey>> {
        self.ensure_kind(key, NodeKind::Object, "all_object_children()")?;
        loop {
            let complete = {
                let arena = self.arena.read().unwrap();
                let children = arena[key].children.read().unwrap();
                matches!(&*children, Children::Object { complete: true, .. })
            };
            if complete {
                break;
            }
            self.advance_object(key, None)?;
        }
        let arena = self.arena.read().unwrap();
        let children = arena[key].children.read().unwrap();
        match &*children {
            Children::Object { all, .. } => Ok(all.clone()),
            _ => unreachable!(),
        }
    }

    /// Looks up an array element by index, resuming any prior scan.
    pub fn element(&self, key: NodeKey, index: usize) -> crate::error::Result<Option<NodeKey>> {
        self.ensure_kind(key, NodeKind::Array, "element()")?;
        loop {
            let snapshot = {
                let arena = self.arena.read().unwrap();
                let children = arena[key].children.read().unwrap();
                match &*children {
                    Children::Array { elements, complete, .. } => {
                        if index < elements.len() {
                            Some(Some(elements[index]))
                        } else if *complete {
                            Some(None)
                        } else {
                            None
                        }
                    }
                    _ => unreachable!(),
                }
            };
            if let Some(result) = snapshot {
                return Ok(result);
            }
            self.advance_array(key)?;
        }
    }

    /// Returns every element of the array at `key`, fully populating it.
    pub fn elements(&self, key: NodeKey) -> crate::error::Result<Vec<NodeKey>> {
        self.ensure_kind(key, NodeKind::Array, "elements()")?;
        loop {
            let complete = {
                let arena = self.arena.read().unwrap();
                let children = arena[key].children.read().unwrap();
                matches!(&*children, Children::Array { complete: true, .. })
            };
            if complete {
                break;
            }
            self.advance_array(key)?;
        }
        let arena = self.arena.read().unwrap();
        let children = arena[key].children.read().unwrap();
        match &*children {
            Children::Array { elements, .. } => Ok(elements.clone()),
            _ => unreachable!(),
        }
    }

    /// The number of members (object) or elements (array) at `key`.
    pub fn count(&self, key: NodeKey) -> crate::error::Result<usize> {
        match self.kind(key) {
            NodeKind::Object => Ok(self.members(key)?.len()),
            NodeKind::Array => Ok(self.elements(key)?.len()),
            actual => WrongKindCtx {
                operation: "count()",
                expected: "object or array",
                actual,
            }
            .fail()
            .map_err(Into::into),
        }
    }

    /// Depth-first count of every descendant of `key` (`key` itself
    /// included) whose kind is `kind`, forcing materialisation of the
    /// whole subtree. Distinct from [`ActualTree::count`], which is the
    /// non-recursive member/element tally behind [`crate::virtual_tree::VirtualNode::size`].
    pub fn count_of_kind(&self, key: NodeKey, kind: NodeKind) -> crate::error::Result<usize> {
        let mut total = 0;
        self.visit(key, |_, node_kind| {
            if node_kind == kind {
                total += 1;
            }
        })?;
        Ok(total)
    }

    /// Walks a [`Path`] from `start`, creating arena nodes on demand, and
    /// fails eagerly the moment a step cannot be resolved (§4.4's ActualTree
    /// navigation contract — the inverse of [`VirtualTree`](crate::virtual_tree::VirtualTree)'s
    /// deferred failure).
    pub fn resolve(&self, start: NodeKey, path: &Path) -> crate::error::Result<NodeKey> {
        let mut current = start;
        let mut walked = Path::root();
        for segment in path.segments() {
            walked = walked.extend(segment.clone());
            current = match segment {
                Segment::Member(name) => {
                    let kind = self.kind(current);
                    if kind != NodeKind::Object {
                        return WrongKindParentCtx {
                            expected: "object",
                            actual: kind,
                            path: walked,
                        }
                        .fail()
                        .map_err(Into::into);
                    }
                    match self.member(current, name)? {
                        Some(child) => child,
                        None => {
                            return UndefinedCtx {
                                path: walked,
                                cause: UndefinedCause::NoMember {
                                    parent_kind: kind,
                                    name: name.clone(),
                                },
                            }
                            .fail()
                            .map_err(Into::into)
                        }
                    }
                }
                Segment::Index(index) => {
                    let kind = self.kind(current);
                    if kind != NodeKind::Array {
                        return WrongKindParentCtx {
                            expected: "array",
                            actual: kind,
                            path: walked,
                        }
                        .fail()
                        .map_err(Into::into);
                    }
                    match self.element(current, *index)? {
                        Some(child) => child,
                        None => {
                            let size = self.elements(current)?.len();
                            return UndefinedCtx {
                                path: walked,
                                cause: UndefinedCause::OutOfRange {
                                    parent_kind: kind,
                                    index: *index,
                                    size,
                                },
                            }
                            .fail()
                            .map_err(Into::into)
                        }
                    }
                }
            };
        }
        Ok(current)
    }

    /// Visits `key` and every descendant, depth-first, fully populating
    /// the subtree.
    pub fn visit(&self, key: NodeKey, mut f: impl FnMut(NodeKey, NodeKind)) -> crate::error::Result<()> {
        self.visit_inner(key, &mut f)
    }

    fn visit_inner(&self, key: NodeKey, f: &mut dyn FnMut(NodeKey, NodeKind)) -> crate::error::Result<()> {
        let kind = self.kind(key);
        f(key, kind);
        match kind {
            NodeKind::Object => {
                for child in self.all_object_children(key)? {
                    self.visit_inner(child, f)?;
                }
            }
            NodeKind::Array => {
                for child in self.elements(key)? {
                    self.visit_inner(child, f)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Requires a primitive's raw text to not be `null`, for [`VirtualTree`](crate::virtual_tree::VirtualTree)
    /// accessors that raise on a `null` demand.
    pub fn require_non_null(&self, key: NodeKey, path: &Path) -> crate::error::Result<()> {
        if self.kind(key) == NodeKind::Null {
            return NullValueCtx { path: path.clone() }.fail().map_err(Into::into);
        }
        Ok(())
    }

    fn ensure_kind(&self, key: NodeKey, expected: NodeKind, operation: &'static str) -> crate::error::Result<()> {
        let actual = self.kind(key);
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

    /// Scans one more member of the object at `key`, inserting it into the
    /// arena and the memoised table. If `target` is given and it is found,
    /// scanning stops and `(false, Some(key))` is returned even though the
    /// object is not fully populated.
    fn advance_object(
        &self,
        key: NodeKey,
        target: Option<&str>,
    ) -> crate::error::Result<(bool, Option<NodeKey>)> {
        let bytes = self.buffer.as_bytes();
        let scan_from = {
            let arena = self.arena.read().unwrap();
            let node = &arena[key];
            let children = node.children.read().unwrap();
            match &*children {
                Children::Object { scan_end, complete: true, .. } => return Ok((true, {
                    let _ = scan_end;
                    None
                })),
                Children::Object { scan_end, .. } => *scan_end,
                _ => unreachable!(),
            }
        };
        let mut i = lexer::skip_whitespace(bytes, scan_from);
        if bytes.get(i) == Some(&b'}') {
            self.mark_object_complete(key, i + 1);
            return Ok((true, None));
        }
        // skip a leading comma left over from the previous advance
        if bytes.get(i) == Some(&b',') {
            i = lexer::skip_whitespace(bytes, i + 1);
            if self.options.non_standard && bytes.get(i) == Some(&b'}') {
                self.mark_object_complete(key, i + 1);
                return Ok((true, None));
            }
        }
        let quote = if bytes.get(i) == Some(&b'\'') && self.options.non_standard {
            b'\''
        } else {
            b'"'
        };
        let name_end = skip_quoted(bytes, i, quote, &self.options)?;
        let raw_name = &self.buffer[i..name_end];
        let name = decode_string(raw_name);
        let mut j = lexer::skip_whitespace(bytes, name_end);
        j += 1; // ':'
        j = lexer::skip_whitespace(bytes, j);
        let (child_kind, child_start) = lexer::classify(bytes, j, &self.options)?;
        let child_end = lexer::skip_value(bytes, child_start, &self.options)?;
        let child_key = self.insert_child(key, child_kind, child_start, child_end);
        let mut next = lexer::skip_whitespace(bytes, child_end);
        let mut at_end = false;
        if bytes.get(next) == Some(&b',') {
            next += 1;
        } else if bytes.get(next) == Some(&b'}') {
            next += 1;
            at_end = true;
        }
        let found = {
            let arena = self.arena.read().unwrap();
            let mut children = arena[key].children.write().unwrap();
            match &mut *children {
                Children::Object { members, all, scan_end, complete } => {
                    let is_new = !members.contains_key(&name);
                    if is_new {
                        members.insert(name.clone(), child_key);
                    }
                    all.push(child_key);
                    *scan_end = next;
                    *complete = at_end;
                    is_new && target == Some(name.as_str())
                }
                _ => unreachable!(),
            }
        };
        if found {
            return Ok((at_end, Some(child_key)));
        }
        Ok((at_end, None))
    }

    fn mark_object_complete(&self, key: NodeKey, scan_end: usize) {
        let arena = self.arena.read().unwrap();
        let mut children = arena[key].children.write().unwrap();
        if let Children::Object { scan_end: s, complete, .. } = &mut *children {
            *s = scan_end;
            *complete = true;
        }
    }

    fn advance_array(&self, key: NodeKey) -> crate::error::Result<()> {
        let bytes = self.buffer.as_bytes();
        let scan_from = {
            let arena = self.arena.read().unwrap();
            let node = &arena[key];
            let children = node.children.read().unwrap();
            match &*children {
                Children::Array { scan_end, .. } => *scan_end,
                _ => unreachable!(),
            }
        };
        let mut i = lexer::skip_whitespace(bytes, scan_from);
        if bytes.get(i) == Some(&b']') {
            self.mark_array_complete(key, i + 1);
            return Ok(());
        }
        if bytes.get(i) == Some(&b',') {
            i = lexer::skip_whitespace(bytes, i + 1);
            if self.options.non_standard && bytes.get(i) == Some(&b']') {
                self.mark_array_complete(key, i + 1);
                return Ok(());
            }
        }
        let (child_kind, child_start) = lexer::classify(bytes, i, &self.options)?;
        let child_end = lexer::skip_value(bytes, child_start, &self.options)?;
        let child_key = self.insert_child(key, child_kind, child_start, child_end);
        let mut next = lexer::skip_whitespace(bytes, child_end);
        let mut at_end = false;
        if bytes.get(next) == Some(&b',') {
            next += 1;
        } else if bytes.get(next) == Some(&b']') {
            next += 1;
            at_end = true;
        }
        let arena = self.arena.read().unwrap();
        let mut children = arena[key].children.write().unwrap();
        if let Children::Array { elements, scan_end, complete } = &mut *children {
            elements.push(child_key);
            *scan_end = next;
            *complete = at_end;
        }
        Ok(())
    }

    fn mark_array_complete(&self, key: NodeKey, scan_end: usize) {
        let arena = self.arena.read().unwrap();
        let mut children = arena[key].children.write().unwrap();
        if let Children::Array { scan_end: s, complete, .. } = &mut *children {
            *s = scan_end;
            *complete = true;
        }
    }

    fn insert_child(&self, parent: NodeKey, kind: NodeKind, start: usize, end: usize) -> NodeKey {
        let mut arena = self.arena.write().unwrap();
        arena.insert(ActualNode {
            kind,
            parent: Some(parent),
            start,
            end,
            children: RwLock::new(new_children_for(kind)),
        })
    }
}

fn new_children_for(kind: NodeKind) -> Children {
    match kind {
        NodeKind::Object => Children::Object {
            members: IndexMap::new(),
            all: Vec::new(),
            scan_end: 0,
            complete: false,
        },
        NodeKind::Array => Children::Array {
            elements: Vec::new(),
            scan_end: 0,
            complete: false,
        },
        _ => Children::Opaque,
    }
}

/// Like [`lexer::skip_value`] for exactly a quoted string, used for member
/// names (which are always strings, never other value kinds).
fn skip_quoted(
    buffer: &[u8],
    offset: usize,
    quote: u8,
    options: &ReaderOptions,
) -> crate::error::Result<usize, crate::error::MalformedError> {
    let _ = options;
    let mut i = offset + 1;
    loop {
        let byte = *buffer
            .get(i)
            .ok_or_else(|| crate::error::UnexpectedEofCtx { position: i, expected: "a closing quote" }.build())?;
        match byte {
            b'\\' => i += if buffer.get(i + 1) == Some(&b'u') { 6 } else { 2 },
            b if b == quote => return Ok(i + 1),
            _ => i += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(text: &str) -> ActualTree {
        ActualTree::new(Arc::from(text), ReaderOptions::default()).unwrap()
    }

    #[test]
    fn root_classification() {
        let t = tree(r#"{"a": 1}"#);
        assert_eq!(t.kind(t.root()), NodeKind::Object);
    }

    #[test]
    fn member_lookup_is_lazy_and_memoized() {
        let t = tree(r#"{"a": 1, "b": [2, 3], "c": "x"}"#);
        let b = t.member(t.root(), "b").unwrap().unwrap();
        assert_eq!(t.kind(b), NodeKind::Array);
        assert_eq!(t.elements(b).unwrap().len(), 2);
        // repeated lookup returns the same key without rescanning
        let b_again = t.member(t.root(), "b").unwrap().unwrap();
        assert_eq!(b, b_again);
    }

    #[test]
    fn duplicate_member_first_wins() {
        let t = tree(r#"{"a": 1, "a": 2}"#);
        let a = t.member(t.root(), "a").unwrap().unwrap();
        assert_eq!(t.value(a).unwrap(), Scalar::Num(NumberValue::Int32(1)));
        assert_eq!(t.members(t.root()).unwrap().len(), 1);
    }

    #[test]
    fn out_of_order_array_access_resumes_scan() {
        let t = tree(r"[10, 20, 30, 40]");
        let third = t.element(t.root(), 2).unwrap().unwrap();
        assert_eq!(t.value(third).unwrap(), Scalar::Num(NumberValue::Int32(30)));
        let first = t.element(t.root(), 0).unwrap().unwrap();
        assert_eq!(t.value(first).unwrap(), Scalar::Num(NumberValue::Int32(10)));
    }

    #[test]
    fn missing_member_is_none_not_error() {
        let t = tree(r#"{"a": 1}"#);
        assert!(t.member(t.root(), "missing").unwrap().is_none());
    }

    #[test]
    fn resolve_walks_nested_path() {
        let t = tree(r#"{"a": {"b": [1, 2, 3]}}"#);
        let node = t.resolve(t.root(), &Path::parse(".a.b[2]").unwrap()).unwrap();
        assert_eq!(t.value(node).unwrap(), Scalar::Num(NumberValue::Int32(3)));
    }

    #[test]
    fn resolve_fails_eagerly_on_missing_step() {
        let t = tree(r#"{"a": 1}"#);
        assert!(t.resolve(t.root(), &Path::parse(".missing.x").unwrap()).is_err());
    }

    #[test]
    fn visit_covers_all_descendants() {
        let t = tree(r#"{"a": [1, {"b": 2}]}"#);
        let mut count = 0;
        t.visit(t.root(), |_, _| count += 1).unwrap();
        assert_eq!(count, 5); // root, array, 1, object, 2
    }

    #[test]
    fn visit_still_reaches_a_shadowed_duplicate_key() {
        let t = tree(r#"{"a": 1, "a": 2}"#);
        // members() only surfaces the first occurrence...
        assert_eq!(t.members(t.root()).unwrap().len(), 1);
        // ...but visit() must still walk both inserted children.
        let mut numbers = Vec::new();
        t.visit(t.root(), |key, kind| {
            if kind == NodeKind::Number {
                numbers.push(t.value(key).unwrap());
            }
        })
        .unwrap();
        assert_eq!(
            numbers,
            vec![Scalar::Num(NumberValue::Int32(1)), Scalar::Num(NumberValue::Int32(2))]
        );
    }

    #[test]
    fn count_of_kind_is_recursive_and_kind_filtered() {
        let t = tree(r#"{"a": 1, "b": [2, 3, {"c": 4}]}"#);
        assert_eq!(t.count_of_kind(t.root(), NodeKind::Number).unwrap(), 4);
        assert_eq!(t.count_of_kind(t.root(), NodeKind::Object).unwrap(), 2);
    }
}
