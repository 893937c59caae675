use crate::error::{CdbError, FatalError, ParseWarning, SemanticError, SyntaxError};
use crate::lexer::{Token, TokenKind};
use crate::sink::StructuredDataSink;
use crate::types::{Element, LeafValue, Shape, TypeName};
use log::{debug, error, warn};
use std::fmt::{self, Write as _};

/// Accumulated state of one parse, shared by every semantic action.
#[derive(Debug, Default)]
pub struct ParserState {
    /// Pending lvalue: the name of the next node to create or write.
    pub node_name: String,
    /// Pending type cast, consumed by the next leaf or group.
    pub type_name: Option<String>,
    /// Column count locked by the first row.
    pub columns: u32,
    /// Elements seen in the row being accumulated.
    pub row_len: u32,
    /// Rows closed so far.
    pub rows: u32,
    /// 0 scalar, 1 vector, 2 matrix.
    pub dimensions: u8,
    pub token_kind_lock: Option<TokenKind>,
    /// Groups entered and not yet closed.
    pub nesting_depth: u32,
    elements: Vec<Element>,
    element_type: Option<TypeName>,
    failed: bool,
    link_counter: u32,
}

impl ParserState {
    fn reset_leaf(&mut self) {
        self.columns = 0;
        self.row_len = 0;
        self.rows = 0;
        self.dimensions = 0;
        self.token_kind_lock = None;
        self.elements.clear();
        self.element_type = None;
        self.failed = false;
        self.type_name = None;
    }
}

/// Outcome of a successful parse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseReport {
    pub warnings: Vec<ParseWarning>,
}

/// Applies semantic actions to a [`StructuredDataSink`].
///
/// Every error goes through [`Builder::reject`] so it is logged and written to the
/// optional error stream exactly once. Conversion failures are deferred: the leaf is
/// dropped, the parse continues, and [`Builder::finish`] returns the first of them.
pub struct Builder<'s, 'e, S: StructuredDataSink + ?Sized> {
    sink: &'s mut S,
    errors: Option<&'e mut dyn fmt::Write>,
    state: ParserState,
    warnings: Vec<ParseWarning>,
    deferred: Option<SemanticError>,
}

impl<'s, 'e, S: StructuredDataSink + ?Sized> Builder<'s, 'e, S> {
    pub fn new(sink: &'s mut S, errors: Option<&'e mut dyn fmt::Write>) -> Self {
        Builder {
            sink,
            errors,
            state: ParserState::default(),
            warnings: Vec::new(),
            deferred: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> &ParserState {
        &self.state
    }

    /// Reports an error and hands it back for propagation.
    pub fn reject(&mut self, error: impl Into<CdbError>) -> CdbError {
        let error = error.into();
        error!("{error}");
        if let Some(stream) = self.errors.as_mut() {
            let _ = writeln!(stream, "{error}");
        }
        error
    }

    fn warn(&mut self, warning: ParseWarning) {
        warn!("{warning}");
        if let Some(stream) = self.errors.as_mut() {
            let _ = writeln!(stream, "{warning}");
        }
        self.warnings.push(warning);
    }

    fn defer(&mut self, error: SemanticError) {
        let error = self.reject(error);
        if self.deferred.is_none() {
            if let CdbError::Semantic(semantic) = error {
                self.deferred = Some(semantic);
            }
        }
    }

    pub fn capture_node_name(&mut self, token: &Token) {
        self.state.node_name.clone_from(&token.text);
    }

    pub fn capture_type_cast(&mut self, token: &Token) -> Result<(), CdbError> {
        if let Some(previous) = &self.state.type_name {
            let error = SyntaxError::DoubleTypeCast {
                previous: previous.clone(),
                current: token.text.clone(),
                line: token.line,
            };
            return Err(self.reject(error));
        }
        self.state.type_name = Some(token.text.clone());
        Ok(())
    }

    pub fn clear_type_cast(&mut self) {
        self.state.type_name = None;
    }

    /// Creates or enters the group named by the pending lvalue.
    pub fn create_child_node(&mut self, line: u32) -> Result<(), CdbError> {
        let name = self.state.node_name.clone();
        if let Err(source) = self.sink.create_child(&name) {
            return Err(self.reject(FatalError::CreateNode { name, source, line }));
        }
        if let Some(type_name) = self.state.type_name.take() {
            if let Err(source) = self.sink.annotate_type(&type_name) {
                return Err(self.reject(FatalError::CreateNode { name, source, line }));
            }
        }
        self.state.nesting_depth += 1;
        debug!("entered group {name} at depth {}", self.state.nesting_depth);
        Ok(())
    }

    pub fn close_block(&mut self, line: u32) -> Result<(), CdbError> {
        if self.state.nesting_depth == 0 {
            return Err(self.reject(FatalError::NegativeNesting { line }));
        }
        if let Err(source) = self.sink.move_to_parent(1) {
            return Err(self.reject(FatalError::MoveToParent { source, line }));
        }
        self.state.nesting_depth -= 1;
        Ok(())
    }

    fn resolve_element_type(&mut self, line: u32) -> TypeName {
        let Some(name) = self.state.type_name.clone() else {
            return TypeName::String;
        };
        match TypeName::from_name(&name) {
            Some(type_name) => type_name,
            None => {
                let node = self.state.node_name.clone();
                self.warn(ParseWarning::UnknownTypeCast {
                    type_name: name,
                    node,
                    line,
                });
                TypeName::String
            }
        }
    }

    pub fn add_scalar_element(&mut self, token: &Token) -> Result<(), CdbError> {
        let element_type = match (self.state.token_kind_lock, self.state.element_type) {
            (None, _) | (_, None) => {
                self.state.token_kind_lock = Some(token.kind);
                let element_type = self.resolve_element_type(token.line);
                self.state.element_type = Some(element_type);
                element_type
            }
            (Some(kind), Some(_)) if kind != token.kind => {
                let error = SemanticError::MixedKinds {
                    name: self.state.node_name.clone(),
                    line: token.line,
                };
                return Err(self.reject(error));
            }
            (Some(_), Some(element_type)) => element_type,
        };

        match element_type.convert(&token.text) {
            Ok(element) => self.state.elements.push(element),
            Err(_) => {
                self.state.failed = true;
                self.defer(SemanticError::Conversion {
                    name: self.state.node_name.clone(),
                    value: token.text.clone(),
                    type_name: element_type,
                    line: token.line,
                });
            }
        }
        self.state.row_len += 1;
        Ok(())
    }

    /// Closes a vector or one matrix row.
    pub fn close_vector(&mut self, line: u32) -> Result<(), CdbError> {
        let state = &mut self.state;
        if state.row_len == 0 {
            let error = SemanticError::EmptyArray {
                name: state.node_name.clone(),
                line,
            };
            return Err(self.reject(error));
        }
        if state.rows == 0 {
            state.columns = state.row_len;
        } else if state.row_len != state.columns {
            let error = SemanticError::MatrixFormat {
                name: state.node_name.clone(),
                expected: state.columns,
                found: state.row_len,
                line,
            };
            return Err(self.reject(error));
        }
        state.rows += 1;
        state.row_len = 0;
        state.dimensions = state.dimensions.max(1);
        Ok(())
    }

    pub fn close_matrix(&mut self, line: u32) -> Result<(), CdbError> {
        if self.state.row_len != 0 {
            return Err(self.misplaced_element(line));
        }
        self.state.dimensions = 2;
        Ok(())
    }

    /// A row mixed with loose scalars in one matrix.
    pub fn misplaced_element(&mut self, line: u32) -> CdbError {
        let error = SemanticError::MatrixFormat {
            name: self.state.node_name.clone(),
            expected: self.state.columns,
            found: self.state.row_len,
            line,
        };
        self.reject(error)
    }

    /// Writes the accumulated value under the pending lvalue and resets the accumulation.
    pub fn finalize_leaf(&mut self, line: u32) -> Result<(), CdbError> {
        let state = &mut self.state;
        let shape = match state.dimensions {
            0 => Shape::Scalar,
            1 => Shape::Vector(state.columns),
            _ => Shape::Matrix {
                rows: state.rows,
                columns: state.columns,
            },
        };
        let failed = state.failed;
        let type_name = state.element_type.unwrap_or_default();
        let elements = std::mem::take(&mut state.elements);
        let name = state.node_name.clone();
        state.reset_leaf();

        if failed {
            debug!("skipped leaf {name} after a failed conversion");
            return Ok(());
        }
        let value = LeafValue::new(type_name, shape, elements);
        if let Err(source) = self.sink.write_leaf(&name, value) {
            return Err(self.reject(SemanticError::LeafWrite { name, source, line }));
        }
        debug!("wrote {type_name} leaf {name} ({shape:?})");
        Ok(())
    }

    /// Writes a `linkN` leaf holding the path after the `*`.
    pub fn write_link(&mut self, token: &Token) -> Result<(), CdbError> {
        let target = token.link_target().unwrap_or(&token.text);
        let name = format!("link{}", self.state.link_counter);
        self.state.link_counter += 1;
        if let Err(source) = self.sink.write_leaf(&name, LeafValue::string(target)) {
            let line = token.line;
            return Err(self.reject(SemanticError::LeafWrite { name, source, line }));
        }
        debug!("wrote {name} -> {target}");
        Ok(())
    }

    /// `name = *target`: a group `name` holding one link leaf.
    pub fn link_as_group(&mut self, token: &Token) -> Result<(), CdbError> {
        self.create_child_node(token.line)?;
        self.write_link(token)?;
        self.close_block(token.line)
    }

    pub fn return_to_root(&mut self, line: u32) -> Result<(), CdbError> {
        if let Err(source) = self.sink.move_to_root() {
            return Err(self.reject(FatalError::MoveToRoot { source, line }));
        }
        Ok(())
    }

    /// Ends the parse, surfacing the first deferred conversion failure.
    pub fn finish(self) -> Result<ParseReport, CdbError> {
        match self.deferred {
            Some(error) => Err(error.into()),
            None => Ok(ParseReport {
                warnings: self.warnings,
            }),
        }
    }
}
