use super::grammar::{Action, Entry, NonTerminal, Symbol, Terminal, CONFLICTS, PARSE_TABLE, PRODUCTIONS};
use super::{check_lexical, ParserEngine};
use crate::builder::Builder;
use crate::error::{CdbError, FatalError, SyntaxError};
use crate::lexer::{Lexer, Token};
use crate::sink::StructuredDataSink;
use log::{debug, log_enabled, trace, Level};

/// LL driver interpreting the static tables of [`super::grammar`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TableDriven;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserStats {
    pub tokens: usize,
    pub expansions: usize,
    pub actions: usize,
    pub conflicts: usize,
}

impl ParserEngine for TableDriven {
    fn run<I, S>(&self, lexer: &mut Lexer<I>, builder: &mut Builder<'_, '_, S>) -> Result<(), CdbError>
    where
        I: Iterator<Item = char>,
        S: StructuredDataSink + ?Sized,
    {
        let mut stack = vec![Symbol::N(NonTerminal::Document)];
        let mut last: Option<Token> = None;
        let mut stats = ParserStats::default();

        while let Some(symbol) = stack.pop() {
            let current = lexer.peek_token(0).clone();
            if !matches!(symbol, Symbol::A(_)) {
                check_lexical(&current, builder)?;
            }
            let terminal = Terminal::of(&current);
            if log_enabled!(Level::Trace) {
                trace!("table: {symbol:?} on {current} (stack depth {})", stack.len());
            }

            match symbol {
                Symbol::T(expected) => {
                    if expected != terminal {
                        return Err(mismatch(expected, &current, builder));
                    }
                    last = Some(lexer.next_token());
                    stats.tokens += 1;
                }
                Symbol::N(non_terminal) => {
                    let Some(id) = resolve(non_terminal, terminal, lexer, &mut stats) else {
                        let error = SyntaxError::UnexpectedToken {
                            found: current.to_string(),
                            state: format!("{non_terminal:?}"),
                            line: current.line,
                        };
                        return Err(builder.reject(error));
                    };
                    trace!("table: expand {non_terminal:?} with production {id}");
                    stack.extend(PRODUCTIONS[id].rhs.iter().rev().copied());
                    stats.expansions += 1;
                }
                Symbol::A(action) => {
                    let Some(token) = last.as_ref() else {
                        let error = FatalError::MissingToken {
                            action: format!("{action:?}"),
                            line: current.line,
                        };
                        return Err(builder.reject(error));
                    };
                    apply(action, token, builder)?;
                    stats.actions += 1;
                }
            }
        }

        let current = lexer.peek_token(0).clone();
        if Terminal::of(&current) != Terminal::End {
            let error = SyntaxError::InputLeftOver {
                found: current.to_string(),
                line: current.line,
            };
            return Err(builder.reject(error));
        }
        debug!("table parse finished: {stats:?}");
        Ok(())
    }
}

fn mismatch<S>(expected: Terminal, found: &Token, builder: &mut Builder<'_, '_, S>) -> CdbError
where
    S: StructuredDataSink + ?Sized,
{
    let error = match (expected, Terminal::of(found)) {
        (Terminal::End, Terminal::CloseBrace) => SyntaxError::UnmatchedClose {
            state: "Document".to_string(),
            line: found.line,
        },
        _ => SyntaxError::MissingExpectedToken {
            expected: expected.to_string(),
            found: found.to_string(),
            line: found.line,
        },
    };
    builder.reject(error)
}

/// Looks up the production for `non_terminal`, following conflict entries.
fn resolve<I>(
    non_terminal: NonTerminal,
    terminal: Terminal,
    lexer: &mut Lexer<I>,
    stats: &mut ParserStats,
) -> Option<usize>
where
    I: Iterator<Item = char>,
{
    let mut entry = PARSE_TABLE[non_terminal as usize][terminal as usize];
    loop {
        match entry {
            Entry::Error => return None,
            Entry::Produce(id) => return Some(id),
            Entry::Conflict(index) => {
                let conflict = &CONFLICTS[index];
                let ahead = Terminal::of(lexer.peek_token(conflict.lookahead));
                entry = conflict
                    .cases
                    .iter()
                    .find(|(case, _)| *case == ahead)
                    .map_or(conflict.otherwise, |(_, resolved)| *resolved);
                trace!("table: conflict {index} resolved by {ahead} to {entry:?}");
                stats.conflicts += 1;
            }
        }
    }
}

fn apply<S>(action: Action, token: &Token, builder: &mut Builder<'_, '_, S>) -> Result<(), CdbError>
where
    S: StructuredDataSink + ?Sized,
{
    let line = token.line;
    match action {
        Action::NodeName => builder.capture_node_name(token),
        Action::ClearCast => builder.clear_type_cast(),
        Action::TypeCast => builder.capture_type_cast(token)?,
        Action::AddScalar => builder.add_scalar_element(token)?,
        Action::AddLeaf => builder.finalize_leaf(line)?,
        Action::LinkGroup => builder.link_as_group(token)?,
        Action::WriteLink => builder.write_link(token)?,
        Action::CreateGroup => builder.create_child_node(line)?,
        Action::BlockEnd => builder.close_block(line)?,
        Action::EndVector => builder.close_vector(line)?,
        Action::EndMatrix => builder.close_matrix(line)?,
        Action::MatrixFormat => return Err(builder.misplaced_element(line)),
        Action::Finish => builder.return_to_root(line)?,
    }
    Ok(())
}
