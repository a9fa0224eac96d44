//! Output-side assembly (§4.11, C11): a small visitor interface for
//! producing JSON text, with a [`StringSink`] implementation honouring
//! [`WriterOptions`]. This is declared only at the interface the spec asks
//! for — most callers get rendered text from [`VirtualNode::to_minimized_json`](crate::virtual_tree::VirtualNode::to_minimized_json)
//! instead.

use crate::config::WriterOptions;
use crate::lexer::encode_string;

/// A push-based visitor for emitting a JSON document. Implementors decide
/// how (or whether) to format the output; [`StringSink`] is the reference
/// implementation.
pub trait Sink {
    fn begin_object(&mut self);
    fn end_object(&mut self);
    fn begin_array(&mut self);
    fn end_array(&mut self);
    fn member_name(&mut self, name: &str);
    fn write_string(&mut self, value: &str);
    fn write_raw_number(&mut self, literal: &str);
    fn write_bool(&mut self, value: bool);
    fn write_null(&mut self);
}

/// Renders a document into a `String`, applying [`WriterOptions`] for
/// indentation and spacing.
pub struct StringSink {
    options: WriterOptions,
    out: String,
    depth: usize,
    /// Number of children already written, per currently-open container.
    counts: Vec<usize>,
    /// Set by `member_name`, cleared by the value write that follows it —
    /// suppresses the usual comma/newline/indent for that one value.
    after_member_name: bool,
}

impl StringSink {
    #[must_use]
    pub fn new(options: WriterOptions) -> Self {
        StringSink { options, out: String::new(), depth: 0, counts: Vec::new(), after_member_name: false }
    }

    #[must_use]
    pub fn finish(self) -> String {
        self.out
    }

    /// Called immediately before emitting any value (scalar or container
    /// open) that sits in "value position" within its parent.
    fn before_value(&mut self) {
        if self.after_member_name {
            self.after_member_name = false;
            return;
        }
        if let Some(count) = self.counts.last_mut() {
            if *count > 0 {
                self.out.push(',');
            }
            *count += 1;
            self.out.push_str(self.options.newline());
            self.out.push_str(&self.options.indent_at(self.depth));
        }
    }
}

impl Sink for StringSink {
    fn begin_object(&mut self) {
        self.before_value();
        self.out.push('{');
        self.depth += 1;
        self.counts.push(0);
    }

    fn end_object(&mut self) {
        let had_children = self.counts.pop().unwrap_or(0) > 0;
        self.depth -= 1;
        if had_children {
            self.out.push_str(self.options.newline());
            self.out.push_str(&self.options.indent_at(self.depth));
        }
        self.out.push('}');
    }

    fn begin_array(&mut self) {
        self.before_value();
        self.out.push('[');
        self.depth += 1;
        self.counts.push(0);
    }

    fn end_array(&mut self) {
        let had_children = self.counts.pop().unwrap_or(0) > 0;
        self.depth -= 1;
        if had_children {
            self.out.push_str(self.options.newline());
            self.out.push_str(&self.options.indent_at(self.depth));
        }
        self.out.push(']');
    }

    fn member_name(&mut self, name: &str) {
        self.before_value();
        self.out.push_str(&encode_string(name));
        self.out.push(':');
        self.out.push_str(self.options.space_after_colon());
        self.after_member_name = true;
    }

    fn write_string(&mut self, value: &str) {
        self.before_value();
        self.out.push_str(&encode_string(value));
    }

    fn write_raw_number(&mut self, literal: &str) {
        self.before_value();
        self.out.push_str(literal);
    }

    fn write_bool(&mut self, value: bool) {
        self.before_value();
        self.out.push_str(if value { "true" } else { "false" });
    }

    fn write_null(&mut self) {
        self.before_value();
        self.out.push_str("null");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Indent;

    #[test]
    fn minimized_array_of_scalars() {
        let mut sink = StringSink::new(WriterOptions::default());
        sink.begin_array();
        sink.write_raw_number("1");
        sink.write_raw_number("2");
        sink.end_array();
        assert_eq!(sink.finish(), "[1,2]");
    }

    #[test]
    fn minimized_object_with_nested_array() {
        let mut sink = StringSink::new(WriterOptions::default());
        sink.begin_object();
        sink.member_name("a");
        sink.begin_array();
        sink.write_raw_number("1");
        sink.end_array();
        sink.end_object();
        assert_eq!(sink.finish(), r#"{"a":[1]}"#);
    }

    #[test]
    fn indented_object() {
        let mut sink = StringSink::new(WriterOptions {
            indent: Indent::Spaces(2),
            ..Default::default()
        });
        sink.begin_object();
        sink.member_name("a");
        sink.write_raw_number("1");
        sink.end_object();
        assert_eq!(sink.finish(), "{\n  \"a\": 1\n}");
    }
}
