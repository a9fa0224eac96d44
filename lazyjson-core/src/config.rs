//! Ambient configuration (§12): knobs for the reader (lexer leniency) and
//! the writer (serialization layout), kept as plain `Copy` option structs
//! rather than a builder — callers construct them with struct-update syntax
//! from [`Default`].

/// Options controlling how raw JSON text is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReaderOptions {
    /// Accept single-quoted strings and a trailing comma before `}`/`]`
    /// (§4.1's non-standard reader mode).
    pub non_standard: bool,
}

/// Indentation style for [`WriterOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indent {
    Minimized,
    Spaces(u8),
    Tabs,
}

impl Default for Indent {
    fn default() -> Self {
        Indent::Minimized
    }
}

/// Options controlling how a tree is serialized back to text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterOptions {
    pub indent: Indent,
    /// Emit a space after `:` when `indent` is not `Minimized`. Ignored
    /// (treated as `false`) when `indent` is `Minimized`.
    pub space_after_colon: bool,
    /// Omit object members whose value is JSON `null` instead of writing
    /// them out.
    pub exclude_null_members: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            indent: Indent::default(),
            space_after_colon: true,
            exclude_null_members: false,
        }
    }
}

impl WriterOptions {
    /// Renders the current indent unit repeated `depth` times.
    #[must_use]
    pub(crate) fn indent_at(&self, depth: usize) -> String {
        match self.indent {
            Indent::Minimized => String::new(),
            Indent::Spaces(n) => " ".repeat(usize::from(n) * depth),
            Indent::Tabs => "\t".repeat(depth),
        }
    }

    #[must_use]
    pub(crate) fn newline(&self) -> &'static str {
        match self.indent {
            Indent::Minimized => "",
            _ => "\n",
        }
    }

    #[must_use]
    pub(crate) fn space_after_colon(&self) -> &'static str {
        if matches!(self.indent, Indent::Minimized) || !self.space_after_colon {
            ""
        } else {
            " "
        }
    }
}

/// Options controlling schema validation execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Stop evaluating a subtree after its first error instead of
    /// accumulating every failure (the default matches §4.10's "accumulate
    /// errors" wording for `All`).
    pub short_circuit: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        ValidateOptions { short_circuit: false }
    }
}
