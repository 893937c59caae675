//! Parser engines for the configuration language.
//!
//! Two strategies implement [`ParserEngine`]: the hand-written [`StateMachine`]
//! (the default) and the [`TableDriven`] LL driver interpreting the static tables in
//! [`grammar`]. Both feed the same [`Builder`] and produce identical trees.

pub mod grammar;
pub mod state_machine;
pub mod table;

use crate::builder::{Builder, ParseReport};
use crate::error::{CdbError, LexicalError};
use crate::lexer::{Lexer, LexerConfig, Token, TokenKind};
use crate::sink::StructuredDataSink;
use serde::Deserialize;
use std::fmt;

pub use state_machine::StateMachine;
pub use table::TableDriven;

/// Parsing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Engine {
    #[default]
    StateMachine,
    TableDriven,
}

/// Options of one parse.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    pub engine: Engine,
    pub lexer: LexerConfig,
}

impl ParseOptions {
    #[must_use]
    pub fn with_engine(engine: Engine) -> Self {
        ParseOptions {
            engine,
            ..ParseOptions::default()
        }
    }
}

/// Drives a [`Builder`] from a token stream.
pub trait ParserEngine {
    fn run<I, S>(&self, lexer: &mut Lexer<I>, builder: &mut Builder<'_, '_, S>) -> Result<(), CdbError>
    where
        I: Iterator<Item = char>,
        S: StructuredDataSink + ?Sized;
}

/// Turns an `Error` token into a reported lexical error.
pub(crate) fn check_lexical<S>(token: &Token, builder: &mut Builder<'_, '_, S>) -> Result<(), CdbError>
where
    S: StructuredDataSink + ?Sized,
{
    if let TokenKind::Error(issue) = token.kind {
        return Err(builder.reject(LexicalError {
            issue,
            text: token.text.clone(),
            line: token.line,
        }));
    }
    Ok(())
}

/// Parses `source` into `sink`.
///
/// Errors and warnings are logged and, when `errors` is given, written to it one per
/// line. On failure the sink keeps whatever was built before the error.
pub fn parse<I, S>(
    source: I,
    sink: &mut S,
    options: &ParseOptions,
    errors: Option<&mut dyn fmt::Write>,
) -> Result<ParseReport, CdbError>
where
    I: Iterator<Item = char>,
    S: StructuredDataSink + ?Sized,
{
    let mut lexer = Lexer::with_config(source, &options.lexer);
    let mut builder = Builder::new(sink, errors);
    match options.engine {
        Engine::StateMachine => StateMachine.run(&mut lexer, &mut builder)?,
        Engine::TableDriven => TableDriven.run(&mut lexer, &mut builder)?,
    }
    builder.finish()
}
