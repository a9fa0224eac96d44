//! Lazy, path-addressed access and structural editing over raw JSON
//! buffers: a document is classified and indexed on demand rather than
//! fully decoded up front, with a typed, undefined-tolerant view layered
//! on top for navigation that never raises until a primitive is actually
//! demanded.
//!
//! The three layers a caller typically touches are [`tree::ActualTree`]
//! (the lazily-populated node arena), [`virtual_tree::VirtualNode`] (the
//! failure-tolerant façade), and the free functions in [`patch`] and
//! [`diff`] for structural editing and comparison.

pub mod builder;
pub mod config;
pub mod diff;
pub mod editor;
pub mod error;
pub mod kind;
pub mod lexer;
pub mod number;
pub mod patch;
pub mod path;
pub mod tree;
pub mod virtual_tree;

pub use config::{Indent, ReaderOptions, ValidateOptions, WriterOptions};
pub use error::{Error, Result};
pub use kind::NodeKind;
pub use number::NumberValue;
pub use path::{Path, Segment};
pub use tree::{ActualTree, NodeKey, Scalar};
pub use virtual_tree::{TypedView, VirtualNode, VirtualTree};

use std::sync::Arc;

/// Parses `text` and returns a [`VirtualNode`] at its root — the usual
/// entry point for read-only navigation.
pub fn parse(text: impl Into<Arc<str>>, options: ReaderOptions) -> Result<VirtualNode, error::MalformedError> {
    let tree = ActualTree::new(text.into(), options)?;
    Ok(VirtualTree::root(Arc::new(tree)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_then_navigate() {
        let root = parse(r#"{"a": {"b": [1, 2, 3]}}"#, ReaderOptions::default()).unwrap();
        let value = root.get(&Path::parse(".a.b[1]").unwrap());
        assert_eq!(value.number().unwrap(), NumberValue::Int32(2));
    }
}
