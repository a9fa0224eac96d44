//! The error taxonomy (§7): one dedicated enum per failure kind, composed
//! into a single top-level [`Error`] via `snafu` transparent variants —
//! mirroring the pattern used throughout this workspace's ancestor crates,
//! where every fallible boundary returns a `snafu`-derived enum with
//! `#[snafu(display(...))]` messages and a context-selector construction
//! site (`FooCtx { .. }.fail()`).

use snafu::{Backtrace, Snafu};

use crate::kind::NodeKind;
use crate::path::Path;

/// A JSON syntax error at a specific byte position (§4.1).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub), context(suffix(Ctx)))]
pub enum MalformedError {
    #[snafu(display("unexpected character '{got}' at byte {position}; expected {expected}"))]
    UnexpectedChar {
        position: usize,
        expected: &'static str,
        got: char,
        backtrace: Backtrace,
    },
    #[snafu(display("unexpected end of input at byte {position}; expected {expected}"))]
    UnexpectedEof {
        position: usize,
        expected: &'static str,
        backtrace: Backtrace,
    },
}

impl MalformedError {
    /// The byte offset the error occurred at.
    #[must_use]
    pub fn position(&self) -> usize {
        match self {
            MalformedError::UnexpectedChar { position, .. }
            | MalformedError::UnexpectedEof { position, .. } => *position,
        }
    }

    /// Renders the line containing the failing byte with a caret pointing at
    /// the offending column, for diagnostics.
    #[must_use]
    pub fn excerpt(&self, buffer: &str) -> String {
        let position = self.position().min(buffer.len());
        let line_start = buffer[..position].rfind('\n').map_or(0, |i| i + 1);
        let line_end = buffer[position..]
            .find('\n')
            .map_or(buffer.len(), |i| position + i);
        let line = &buffer[line_start..line_end];
        let column = buffer[line_start..position].chars().count();
        format!("{line}\n{}^", " ".repeat(column))
    }
}

/// The reason a path step could not be resolved, stripped of the path
/// itself — used inside [`VirtualNode::Undefined`](`crate::virtual_tree::VirtualNode::Undefined`)
/// where the path is already carried alongside the cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndefinedCause {
    NoMember { parent_kind: NodeKind, name: String },
    OutOfRange {
        parent_kind: NodeKind,
        index: usize,
        size: usize,
    },
    NegativeIndex { index: i64 },
    WrongKindParent {
        expected: &'static str,
        actual: NodeKind,
    },
}

impl std::fmt::Display for UndefinedCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UndefinedCause::NoMember { parent_kind, name } => {
                write!(f, "no member named `{name}` on {parent_kind}")
            }
            UndefinedCause::OutOfRange {
                parent_kind,
                index,
                size,
            } => write!(
                f,
                "index {index} out of range for {parent_kind} of size {size}"
            ),
            UndefinedCause::NegativeIndex { index } => write!(f, "negative index {index}"),
            UndefinedCause::WrongKindParent { expected, actual } => {
                write!(f, "expected {expected}, found {actual}")
            }
        }
    }
}

/// Navigation failures (§7): a path step that could not be resolved against
/// an [`ActualTree`](`crate::tree::ActualTree`), or a malformed [`Path`]
/// string.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub), context(suffix(Ctx)))]
pub enum PathError {
    #[snafu(display("no member named `{name}` on {parent_kind} at `{path}`"))]
    NoMember {
        parent_kind: NodeKind,
        name: String,
        path: Path,
        backtrace: Backtrace,
    },
    #[snafu(display("index {index} out of range for {parent_kind} of size {size} at `{path}`"))]
    OutOfRange {
        parent_kind: NodeKind,
        index: usize,
        size: usize,
        path: Path,
        backtrace: Backtrace,
    },
    #[snafu(display("negative index {index} at `{path}`"))]
    NegativeIndex {
        index: i64,
        path: Path,
        backtrace: Backtrace,
    },
    #[snafu(display("expected {expected}, found {actual} at `{path}`"))]
    WrongKindParent {
        expected: &'static str,
        actual: NodeKind,
        path: Path,
        backtrace: Backtrace,
    },
    #[snafu(display("the root path has no parent"))]
    RootHasNoParent { backtrace: Backtrace },
    #[snafu(display("`{prefix}` is not a prefix of `{path}`"))]
    NotAPrefix {
        path: Path,
        prefix: Path,
        backtrace: Backtrace,
    },
    #[snafu(display("invalid path syntax: {message}"))]
    PathSyntax {
        message: String,
        backtrace: Backtrace,
    },
    #[snafu(display("`{path}` is undefined: {cause}"))]
    Undefined {
        path: Path,
        cause: UndefinedCause,
        backtrace: Backtrace,
    },
}

/// An operation that does not apply to a node's actual [`NodeKind`] (§7).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub), context(suffix(Ctx)))]
pub enum TypeError {
    #[snafu(display("{operation} is not supported on {actual} values (expected {expected})"))]
    WrongKind {
        operation: &'static str,
        expected: &'static str,
        actual: NodeKind,
        backtrace: Backtrace,
    },
    #[snafu(display("cannot merge a {left} into a {right}"))]
    KindMismatch {
        left: NodeKind,
        right: NodeKind,
        backtrace: Backtrace,
    },
}

/// A primitive accessor was demanded and the present value is JSON `null`
/// (§7).
#[derive(Debug, Snafu)]
#[snafu(
    display("value at `{path}` is null"),
    visibility(pub),
    context(suffix(Ctx))
)]
pub struct NullValueError {
    pub path: Path,
    backtrace: Backtrace,
}

/// Conflict detection or application failure while running the patch engine
/// (§4.7).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub), context(suffix(Ctx)))]
pub enum PatchError {
    #[snafu(display("operation {first} has same target as operation {second}"))]
    SameTarget {
        first: usize,
        second: usize,
        backtrace: Backtrace,
    },
    #[snafu(display("operation {child} targets a child of operation {parent}'s target"))]
    ChildOf {
        parent: usize,
        child: usize,
        backtrace: Backtrace,
    },
    #[snafu(transparent)]
    Path {
        #[snafu(backtrace)]
        source: PathError,
    },
    #[snafu(transparent)]
    Kind {
        #[snafu(backtrace)]
        source: TypeError,
    },
}

/// Top-level error type returned from this crate's public API; every kind
/// in §7 is reachable through a transparent variant so callers can match on
/// the narrow type returned by a specific component, or on this one.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(transparent)]
    Malformed {
        #[snafu(backtrace)]
        source: MalformedError,
    },
    #[snafu(transparent)]
    Path {
        #[snafu(backtrace)]
        source: PathError,
    },
    #[snafu(transparent)]
    Type {
        #[snafu(backtrace)]
        source: TypeError,
    },
    #[snafu(transparent)]
    NullValue {
        #[snafu(backtrace)]
        source: NullValueError,
    },
    #[snafu(transparent)]
    Patch {
        #[snafu(backtrace)]
        source: PatchError,
    },
}

/// This crate's `Result` alias, defaulting the error type to [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
