use crate::lexer::LexicalIssue;
use crate::sink::SinkError;
use crate::types::TypeName;
use miette::{Diagnostic, LabeledSpan, NamedSource, Severity, SourceCode, SourceSpan};
use std::fmt;
use thiserror::Error;

/// Every way a parse can fail.
///
/// The four classes mirror the order in which problems are detected: characters,
/// grammar, values, and finally the sink refusing a structural operation.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum CdbError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lexical(#[from] LexicalError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fatal(#[from] FatalError),
}

impl CdbError {
    /// Source line the error was detected on.
    #[must_use]
    pub fn line(&self) -> u32 {
        match self {
            CdbError::Lexical(e) => e.line,
            CdbError::Syntax(e) => e.line(),
            CdbError::Semantic(e) => e.line(),
            CdbError::Fatal(e) => e.line(),
        }
    }

    /// Attaches the parsed text so reports show the offending line.
    #[must_use]
    pub fn with_source(self, name: impl AsRef<str>, source: impl Into<String>) -> SourceError {
        let source = source.into();
        let span = line_span(&source, self.line());
        SourceError {
            error: self,
            src: NamedSource::new(name, source),
            span,
        }
    }
}

/// Byte range of the 1-based `line` in `source`, without its line terminator.
fn line_span(source: &str, line: u32) -> SourceSpan {
    let mut offset = 0;
    for (number, text) in (1u32..).zip(source.split('\n')) {
        if number == line {
            let text = text.strip_suffix('\r').unwrap_or(text);
            return SourceSpan::new(offset.into(), text.len());
        }
        offset += text.len() + 1;
    }
    SourceSpan::new(source.len().into(), 0)
}

/// A [`CdbError`] together with the document it was found in.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct SourceError {
    error: CdbError,
    src: NamedSource<String>,
    span: SourceSpan,
}

impl SourceError {
    #[must_use]
    pub fn error(&self) -> &CdbError {
        &self.error
    }

    #[must_use]
    pub fn into_error(self) -> CdbError {
        self.error
    }

    /// The labelled line.
    #[must_use]
    pub fn span(&self) -> SourceSpan {
        self.span
    }
}

impl Diagnostic for SourceError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.error.code()
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.error.help()
    }

    fn severity(&self) -> Option<Severity> {
        self.error.severity()
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&self.src)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let label = format!("line {}", self.error.line());
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(label),
            self.span,
        ))))
    }
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
#[error("Lexical error: {issue} in '{text}'! [{line}]")]
#[diagnostic(
    code(cdb::lexical),
    help("Check quoting, escape sequences, comment terminators and numeric literals.")
)]
pub struct LexicalError {
    pub issue: LexicalIssue,
    pub text: String,
    pub line: u32,
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum SyntaxError {
    #[error("Unexpected {found} at state {state}! [{line}]")]
    #[diagnostic(
        code(cdb::syntax::unexpected_token),
        help("The parser found a token it did not expect in this position.")
    )]
    UnexpectedToken {
        found: String,
        state: String,
        line: u32,
    },

    #[error("Expected {expected} but found {found}! [{line}]")]
    #[diagnostic(
        code(cdb::syntax::missing_expected_token),
        help("The parser expected a specific token that was not found.")
    )]
    MissingExpectedToken {
        expected: String,
        found: String,
        line: u32,
    },

    #[error("Unmatched }} at state {state}! [{line}]")]
    #[diagnostic(
        code(cdb::syntax::unmatched_close),
        help("A closing brace was found with no open block or array.")
    )]
    UnmatchedClose { state: String, line: u32 },

    #[error("Double definition of type: was {previous}, now set to {current}! [{line}]")]
    #[diagnostic(
        code(cdb::syntax::double_type_cast),
        help("A value accepts a single type cast, e.g. `x = (int16) 5`.")
    )]
    DoubleTypeCast {
        previous: String,
        current: String,
        line: u32,
    },

    #[error("Unexpected end of input with {open} open block(s)! [{line}]")]
    #[diagnostic(
        code(cdb::syntax::unbalanced_blocks),
        help("Every `{{` needs a matching `}}` before the end of the document.")
    )]
    UnbalancedBlocks { open: u32, line: u32 },

    #[error("Unexpected end of input at state {state}! [{line}]")]
    #[diagnostic(
        code(cdb::syntax::unexpected_eof),
        help("The document ended in the middle of an assignment.")
    )]
    UnexpectedEof { state: String, line: u32 },

    #[error("Input left over after the end of the document: {found}! [{line}]")]
    #[diagnostic(code(cdb::syntax::input_left_over))]
    InputLeftOver { found: String, line: u32 },
}

impl SyntaxError {
    #[must_use]
    pub fn line(&self) -> u32 {
        match self {
            SyntaxError::UnexpectedToken { line, .. }
            | SyntaxError::MissingExpectedToken { line, .. }
            | SyntaxError::UnmatchedClose { line, .. }
            | SyntaxError::DoubleTypeCast { line, .. }
            | SyntaxError::UnbalancedBlocks { line, .. }
            | SyntaxError::UnexpectedEof { line, .. }
            | SyntaxError::InputLeftOver { line, .. } => *line,
        }
    }
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum SemanticError {
    #[error("Possible empty vector or matrix! [{line}]")]
    #[diagnostic(
        code(cdb::semantic::empty_array),
        help("Vectors and matrix rows need at least one element.")
    )]
    EmptyArray { name: String, line: u32 },

    #[error("Incorrect matrix format! [{line}]")]
    #[diagnostic(
        code(cdb::semantic::matrix_format),
        help("Every row of a matrix must have the same number of columns as the first row.")
    )]
    MatrixFormat {
        name: String,
        expected: u32,
        found: u32,
        line: u32,
    },

    #[error("Cannot mix different types in a vector or matrix! [{line}]")]
    #[diagnostic(
        code(cdb::semantic::mixed_kinds),
        help("All elements of one array must be numbers, or all must be strings.")
    )]
    MixedKinds { name: String, line: u32 },

    #[error("Failed read or conversion! [{line}]")]
    #[diagnostic(
        code(cdb::semantic::conversion),
        help("The value does not fit the declared type cast.")
    )]
    Conversion {
        name: String,
        value: String,
        type_name: TypeName,
        line: u32,
    },

    #[error("Failed adding a leaf to the configuration database! [{line}]")]
    #[diagnostic(code(cdb::semantic::leaf_write))]
    LeafWrite {
        name: String,
        source: SinkError,
        line: u32,
    },
}

impl SemanticError {
    #[must_use]
    pub fn line(&self) -> u32 {
        match self {
            SemanticError::EmptyArray { line, .. }
            | SemanticError::MatrixFormat { line, .. }
            | SemanticError::MixedKinds { line, .. }
            | SemanticError::Conversion { line, .. }
            | SemanticError::LeafWrite { line, .. } => *line,
        }
    }
}

/// Invariant violations: the grammar guarantees these operations succeed.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum FatalError {
    #[error("Failed to create node {name}! [{line}]")]
    #[diagnostic(code(cdb::fatal::create_node))]
    CreateNode {
        name: String,
        source: SinkError,
        line: u32,
    },

    #[error("Failed to move to the parent node! [{line}]")]
    #[diagnostic(code(cdb::fatal::move_to_parent))]
    MoveToParent { source: SinkError, line: u32 },

    #[error("Failed to move to the root node at the end! [{line}]")]
    #[diagnostic(code(cdb::fatal::move_to_root))]
    MoveToRoot { source: SinkError, line: u32 },

    #[error("Unexpected negative nesting depth! [{line}]")]
    #[diagnostic(code(cdb::fatal::negative_nesting))]
    NegativeNesting { line: u32 },

    #[error("Semantic action {action} invoked before any token was consumed! [{line}]")]
    #[diagnostic(code(cdb::fatal::missing_token))]
    MissingToken { action: String, line: u32 },

    #[error("Failed reading the input: {message}! [{line}]")]
    #[diagnostic(code(cdb::fatal::source))]
    Source { message: String, line: u32 },
}

impl FatalError {
    #[must_use]
    pub fn line(&self) -> u32 {
        match self {
            FatalError::CreateNode { line, .. }
            | FatalError::MoveToParent { line, .. }
            | FatalError::MoveToRoot { line, .. }
            | FatalError::NegativeNesting { line }
            | FatalError::MissingToken { line, .. }
            | FatalError::Source { line, .. } => *line,
        }
    }
}

/// Problems that do not stop the parse.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum ParseWarning {
    #[error("Unknown type cast {type_name}, using string! [{line}]")]
    #[diagnostic(
        severity(Warning),
        code(cdb::warning::unknown_type_cast),
        help("Known types: string, int8..int64, uint8..uint64, float32, float64.")
    )]
    UnknownTypeCast {
        type_name: String,
        node: String,
        line: u32,
    },
}
