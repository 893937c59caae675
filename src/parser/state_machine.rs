use super::{check_lexical, ParserEngine};
use crate::builder::Builder;
use crate::error::{CdbError, SyntaxError};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::sink::StructuredDataSink;
use log::trace;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    LValue,
    Equal,
    RValue,
    TypeCast,
    /// Inside an array at a level with no pending element.
    Block,
    /// Inside an array after at least one element of the current level.
    Block2,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The hand-written parser: one transition function per state.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateMachine;

impl ParserEngine for StateMachine {
    fn run<I, S>(&self, lexer: &mut Lexer<I>, builder: &mut Builder<'_, '_, S>) -> Result<(), CdbError>
    where
        I: Iterator<Item = char>,
        S: StructuredDataSink + ?Sized,
    {
        let mut machine = Machine {
            state: State::LValue,
            array_level: 0,
            pending: None,
        };
        loop {
            let token = lexer.next_token();
            trace!("fsm: {} <- {}", machine.state, token);
            check_lexical(&token, builder)?;
            if machine.step(token, builder)? {
                return Ok(());
            }
        }
    }
}

enum Step {
    Continue,
    Done,
}

struct Machine {
    state: State,
    /// 0 outside arrays, 1 inside `{`, 2 inside a matrix row.
    array_level: u32,
    /// First value of a level-1 block, held until it is known whether the block is a group.
    pending: Option<Token>,
}

impl Machine {
    /// Returns true once `End` has been accepted.
    fn step<S>(&mut self, token: Token, builder: &mut Builder<'_, '_, S>) -> Result<bool, CdbError>
    where
        S: StructuredDataSink + ?Sized,
    {
        let step = match self.state {
            State::LValue => self.lvalue(token, builder)?,
            State::Equal => self.equal(token, builder)?,
            State::RValue => self.rvalue(token, builder)?,
            State::TypeCast => self.type_cast(token, builder)?,
            State::Block => self.block(token, builder)?,
            State::Block2 => self.block2(token, builder)?,
        };
        Ok(matches!(step, Step::Done))
    }

    fn unexpected<S>(&self, token: &Token, builder: &mut Builder<'_, '_, S>) -> CdbError
    where
        S: StructuredDataSink + ?Sized,
    {
        let error = match token.kind {
            TokenKind::End if self.array_level > 0 => SyntaxError::UnbalancedBlocks {
                open: builder.state().nesting_depth + self.array_level,
                line: token.line,
            },
            TokenKind::End => SyntaxError::UnexpectedEof {
                state: self.state.to_string(),
                line: token.line,
            },
            _ => SyntaxError::UnexpectedToken {
                found: token.to_string(),
                state: self.state.to_string(),
                line: token.line,
            },
        };
        builder.reject(error)
    }

    fn lvalue<S>(&mut self, token: Token, builder: &mut Builder<'_, '_, S>) -> Result<Step, CdbError>
    where
        S: StructuredDataSink + ?Sized,
    {
        match token.kind {
            TokenKind::End => {
                let open = builder.state().nesting_depth;
                if open > 0 {
                    let line = token.line;
                    return Err(builder.reject(SyntaxError::UnbalancedBlocks { open, line }));
                }
                builder.return_to_root(token.line)?;
                return Ok(Step::Done);
            }
            _ if token.is_link() => builder.write_link(&token)?,
            TokenKind::Value | TokenKind::Number => {
                builder.capture_node_name(&token);
                self.state = State::Equal;
            }
            _ if token.is_terminal('}') => {
                if builder.state().nesting_depth == 0 {
                    let error = SyntaxError::UnmatchedClose {
                        state: self.state.to_string(),
                        line: token.line,
                    };
                    return Err(builder.reject(error));
                }
                builder.close_block(token.line)?;
            }
            _ => return Err(self.unexpected(&token, builder)),
        }
        Ok(Step::Continue)
    }

    fn equal<S>(&mut self, token: Token, builder: &mut Builder<'_, '_, S>) -> Result<Step, CdbError>
    where
        S: StructuredDataSink + ?Sized,
    {
        if !token.is_terminal('=') {
            return Err(self.unexpected(&token, builder));
        }
        builder.clear_type_cast();
        self.state = State::RValue;
        Ok(Step::Continue)
    }

    fn rvalue<S>(&mut self, token: Token, builder: &mut Builder<'_, '_, S>) -> Result<Step, CdbError>
    where
        S: StructuredDataSink + ?Sized,
    {
        if token.is_link() {
            builder.link_as_group(&token)?;
            self.state = State::LValue;
        } else if token.is_scalar() {
            builder.add_scalar_element(&token)?;
            builder.finalize_leaf(token.line)?;
            self.state = State::LValue;
        } else if token.is_terminal('{') {
            self.array_level = 1;
            self.state = State::Block;
        } else if token.is_terminal('(') {
            self.state = State::TypeCast;
        } else {
            return Err(self.unexpected(&token, builder));
        }
        Ok(Step::Continue)
    }

    fn type_cast<S>(&mut self, token: Token, builder: &mut Builder<'_, '_, S>) -> Result<Step, CdbError>
    where
        S: StructuredDataSink + ?Sized,
    {
        if token.kind == TokenKind::Value && !token.is_link() {
            builder.capture_type_cast(&token)?;
        } else if token.is_terminal(')') {
            self.state = State::RValue;
        } else {
            return Err(self.unexpected(&token, builder));
        }
        Ok(Step::Continue)
    }

    fn block<S>(&mut self, token: Token, builder: &mut Builder<'_, '_, S>) -> Result<Step, CdbError>
    where
        S: StructuredDataSink + ?Sized,
    {
        let after_rows = builder.state().rows > 0;
        if token.is_link() {
            if self.array_level != 1 || after_rows {
                return Err(self.unexpected(&token, builder));
            }
            builder.create_child_node(token.line)?;
            builder.write_link(&token)?;
            self.array_level = 0;
            self.state = State::LValue;
        } else if token.is_scalar() {
            if self.array_level == 1 {
                if after_rows {
                    return Err(builder.misplaced_element(token.line));
                }
                self.pending = Some(token);
            } else {
                builder.add_scalar_element(&token)?;
            }
            self.state = State::Block2;
        } else if token.is_terminal('{') {
            if self.array_level != 1 {
                return Err(self.unexpected(&token, builder));
            }
            self.array_level = 2;
        } else if token.is_terminal('}') {
            self.close_level(token.line, builder)?;
        } else if !token.is_terminal(',') {
            return Err(self.unexpected(&token, builder));
        }
        Ok(Step::Continue)
    }

    fn block2<S>(&mut self, token: Token, builder: &mut Builder<'_, '_, S>) -> Result<Step, CdbError>
    where
        S: StructuredDataSink + ?Sized,
    {
        if token.is_terminal('=') && self.array_level == 1 {
            // `name = { child = ... }`: the block is a group after all
            let Some(child) = self.pending.take() else {
                return Err(self.unexpected(&token, builder));
            };
            builder.create_child_node(token.line)?;
            builder.capture_node_name(&child);
            builder.clear_type_cast();
            self.array_level = 0;
            self.state = State::RValue;
            return Ok(Step::Continue);
        }

        if token.is_link() {
            return Err(self.unexpected(&token, builder));
        }
        if token.is_terminal('{') {
            if self.array_level == 1 {
                self.flush_pending(builder)?;
                return Err(builder.misplaced_element(token.line));
            }
            return Err(self.unexpected(&token, builder));
        }

        if token.is_scalar() {
            self.flush_pending(builder)?;
            builder.add_scalar_element(&token)?;
        } else if token.is_terminal(',') {
            self.flush_pending(builder)?;
        } else if token.is_terminal('}') {
            self.flush_pending(builder)?;
            self.close_level(token.line, builder)?;
        } else {
            return Err(self.unexpected(&token, builder));
        }
        Ok(Step::Continue)
    }

    fn flush_pending<S>(&mut self, builder: &mut Builder<'_, '_, S>) -> Result<(), CdbError>
    where
        S: StructuredDataSink + ?Sized,
    {
        match self.pending.take() {
            Some(token) => builder.add_scalar_element(&token),
            None => Ok(()),
        }
    }

    /// Handles `}` inside an array.
    fn close_level<S>(&mut self, line: u32, builder: &mut Builder<'_, '_, S>) -> Result<(), CdbError>
    where
        S: StructuredDataSink + ?Sized,
    {
        if self.array_level == 2 {
            builder.close_vector(line)?;
            self.array_level = 1;
            self.state = State::Block;
            return Ok(());
        }
        if builder.state().rows > 0 {
            builder.close_matrix(line)?;
        } else {
            builder.close_vector(line)?;
        }
        builder.finalize_leaf(line)?;
        self.array_level = 0;
        self.state = State::LValue;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::ConfigurationDatabase;
    use crate::error::SemanticError;
    use crate::types::Shape;

    fn run(source: &str) -> (Result<(), CdbError>, ConfigurationDatabase) {
        let mut db = ConfigurationDatabase::new();
        let mut lexer = Lexer::new(source.chars());
        let result = {
            let mut builder = Builder::new(&mut db, None);
            StateMachine
                .run(&mut lexer, &mut builder)
                .and_then(|()| builder.finish().map(|_| ()))
        };
        (result, db)
    }

    #[test]
    fn test_pending_value_becomes_child_name() {
        let (result, db) = run("a = { b = 1 c = { 1 2 } }");
        result.unwrap();
        assert_eq!(db.read::<i32>("a.b"), Ok(1));
        assert_eq!(db.get("a.c").unwrap().shape, Shape::Vector(2));
    }

    #[test]
    fn test_single_element_block_is_a_vector() {
        let (result, db) = run("a = { 7 }");
        result.unwrap();
        assert_eq!(db.get("a").unwrap().shape, Shape::Vector(1));
    }

    #[test]
    fn test_link_first_in_block_makes_group() {
        let (result, db) = run("a = { *Other.Node b = 2 }");
        result.unwrap();
        assert_eq!(db.read::<String>("a.link0"), Ok("Other.Node".to_string()));
        assert_eq!(db.read::<i32>("a.b"), Ok(2));
    }

    #[test]
    fn test_link_inside_vector_is_rejected() {
        let (result, _) = run("a = { 1 *x }");
        assert!(matches!(
            result,
            Err(CdbError::Syntax(SyntaxError::UnexpectedToken { .. }))
        ));
    }

    #[test]
    fn test_row_after_scalars_is_matrix_format() {
        let (result, _) = run("m = { 1 { 2 } }");
        assert!(matches!(
            result,
            Err(CdbError::Semantic(SemanticError::MatrixFormat { .. }))
        ));
        let (result, _) = run("m = { { 1 } 2 }");
        assert!(matches!(
            result,
            Err(CdbError::Semantic(SemanticError::MatrixFormat { .. }))
        ));
    }

    #[test]
    fn test_third_array_level_is_syntax_error() {
        let (result, _) = run("m = { { { 1 } } }");
        assert!(matches!(
            result,
            Err(CdbError::Syntax(SyntaxError::UnexpectedToken { .. }))
        ));
    }

    #[test]
    fn test_missing_close_reports_open_blocks() {
        let (result, _) = run("a = { b = { c = 1 }");
        assert!(matches!(
            result,
            Err(CdbError::Syntax(SyntaxError::UnbalancedBlocks { open: 1, .. }))
        ));
        let (result, _) = run("v = { 1 2");
        assert!(matches!(
            result,
            Err(CdbError::Syntax(SyntaxError::UnbalancedBlocks { open: 1, .. }))
        ));
    }

    #[test]
    fn test_equal_state_rejects_other_tokens() {
        let (result, _) = run("a b");
        let error = result.unwrap_err();
        assert_eq!(error.to_string(), "Unexpected STRING(b) at state Equal! [1]");
    }

    #[test]
    fn test_unmatched_close() {
        let (result, _) = run("a = 1\n}");
        let error = result.unwrap_err();
        assert_eq!(error.to_string(), "Unmatched } at state LValue! [2]");
    }
}
