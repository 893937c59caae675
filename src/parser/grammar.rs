//! Static LL(1) tables of the configuration grammar, with one conflict resolved by an
//! extra token of lookahead.
//!
//! ```text
//! Document   -> Items END @Finish
//! Items      -> Item Items | ε
//! Item       -> LINK @WriteLink | Name @NodeName '=' @ClearCast Rhs
//! Name       -> STRING | NUMBER
//! Rhs        -> '(' CastBody Rhs | Value
//! CastBody   -> STRING @TypeCast CastBody | ')'
//! Value      -> Scalar @AddScalar @AddLeaf | LINK @LinkGroup | '{' Brace
//! Brace      -> GroupBody | VectorBody | ',' Brace
//!             | '{' RowElems '}' @EndVector Rows '}' @EndMatrix @AddLeaf
//! GroupBody  -> @CreateGroup Items '}' @BlockEnd
//! VectorBody -> VecElems '}' @EndVector @AddLeaf
//! VecElems   -> Scalar @AddScalar VecElems | ',' VecElems | @MatrixFormat | ε
//! RowElems   -> Scalar @AddScalar RowElems | ',' RowElems | ε
//! Rows       -> '{' RowElems '}' @EndVector Rows | ',' Rows | @MatrixFormat | ε
//! Scalar     -> STRING | NUMBER
//! ```
//!
//! `Brace` on a STRING or NUMBER is a group when the following token is `=`.

use crate::lexer::{Token, TokenKind};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    End,
    String,
    Number,
    Link,
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
    Comma,
    Equals,
    Error,
    /// A configured terminal character the grammar does not use.
    Other,
}

impl Terminal {
    pub const COUNT: usize = 12;

    #[must_use]
    pub fn of(token: &Token) -> Terminal {
        match token.kind {
            TokenKind::End => Terminal::End,
            TokenKind::Number => Terminal::Number,
            TokenKind::Error(_) => Terminal::Error,
            TokenKind::Value if token.is_link() => Terminal::Link,
            TokenKind::Value => Terminal::String,
            TokenKind::Terminal => match token.text.as_str() {
                "{" => Terminal::OpenBrace,
                "}" => Terminal::CloseBrace,
                "(" => Terminal::OpenParen,
                ")" => Terminal::CloseParen,
                "," => Terminal::Comma,
                "=" => Terminal::Equals,
                _ => Terminal::Other,
            },
        }
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Terminal::End => "END",
            Terminal::String => "STRING",
            Terminal::Number => "NUMBER",
            Terminal::Link => "LINK",
            Terminal::OpenBrace => "'{'",
            Terminal::CloseBrace => "'}'",
            Terminal::OpenParen => "'('",
            Terminal::CloseParen => "')'",
            Terminal::Comma => "','",
            Terminal::Equals => "'='",
            Terminal::Error => "ERROR",
            Terminal::Other => "TERMINAL",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonTerminal {
    Document,
    Items,
    Item,
    Name,
    Rhs,
    CastBody,
    Value,
    Brace,
    GroupBody,
    VectorBody,
    VecElems,
    RowElems,
    Rows,
    Scalar,
}

impl NonTerminal {
    pub const COUNT: usize = 14;
}

/// Semantic actions placed on the right-hand side of productions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    NodeName,
    ClearCast,
    TypeCast,
    AddScalar,
    AddLeaf,
    LinkGroup,
    WriteLink,
    CreateGroup,
    BlockEnd,
    EndVector,
    EndMatrix,
    MatrixFormat,
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    T(Terminal),
    N(NonTerminal),
    A(Action),
}

#[derive(Debug)]
pub struct Production {
    pub lhs: NonTerminal,
    pub rhs: &'static [Symbol],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Error,
    Produce(usize),
    /// Index into [`CONFLICTS`].
    Conflict(usize),
}

/// Chooses between entries by looking further ahead.
#[derive(Debug)]
pub struct Conflict {
    /// Token position to inspect; 0 is the current token.
    pub lookahead: usize,
    pub cases: &'static [(Terminal, Entry)],
    pub otherwise: Entry,
}

use self::Action as Do;
use self::NonTerminal as Nt;
use self::Symbol::{A, N, T};
use self::Terminal as Tk;

pub static PRODUCTIONS: [Production; 33] = [
    // 0
    Production { lhs: Nt::Document, rhs: &[N(Nt::Items), T(Tk::End), A(Do::Finish)] },
    Production { lhs: Nt::Items, rhs: &[N(Nt::Item), N(Nt::Items)] },
    Production { lhs: Nt::Items, rhs: &[] },
    Production { lhs: Nt::Item, rhs: &[T(Tk::Link), A(Do::WriteLink)] },
    Production {
        lhs: Nt::Item,
        rhs: &[N(Nt::Name), A(Do::NodeName), T(Tk::Equals), A(Do::ClearCast), N(Nt::Rhs)],
    },
    // 5
    Production { lhs: Nt::Name, rhs: &[T(Tk::String)] },
    Production { lhs: Nt::Name, rhs: &[T(Tk::Number)] },
    Production { lhs: Nt::Rhs, rhs: &[T(Tk::OpenParen), N(Nt::CastBody), N(Nt::Rhs)] },
    Production { lhs: Nt::Rhs, rhs: &[N(Nt::Value)] },
    Production { lhs: Nt::CastBody, rhs: &[T(Tk::String), A(Do::TypeCast), N(Nt::CastBody)] },
    // 10
    Production { lhs: Nt::CastBody, rhs: &[T(Tk::CloseParen)] },
    Production { lhs: Nt::Value, rhs: &[N(Nt::Scalar), A(Do::AddScalar), A(Do::AddLeaf)] },
    Production { lhs: Nt::Value, rhs: &[T(Tk::Link), A(Do::LinkGroup)] },
    Production { lhs: Nt::Value, rhs: &[T(Tk::OpenBrace), N(Nt::Brace)] },
    Production { lhs: Nt::Brace, rhs: &[N(Nt::GroupBody)] },
    // 15
    Production { lhs: Nt::Brace, rhs: &[N(Nt::VectorBody)] },
    Production {
        lhs: Nt::Brace,
        rhs: &[
            T(Tk::OpenBrace),
            N(Nt::RowElems),
            T(Tk::CloseBrace),
            A(Do::EndVector),
            N(Nt::Rows),
            T(Tk::CloseBrace),
            A(Do::EndMatrix),
            A(Do::AddLeaf),
        ],
    },
    Production {
        lhs: Nt::GroupBody,
        rhs: &[A(Do::CreateGroup), N(Nt::Items), T(Tk::CloseBrace), A(Do::BlockEnd)],
    },
    Production {
        lhs: Nt::VectorBody,
        rhs: &[N(Nt::VecElems), T(Tk::CloseBrace), A(Do::EndVector), A(Do::AddLeaf)],
    },
    Production { lhs: Nt::VecElems, rhs: &[N(Nt::Scalar), A(Do::AddScalar), N(Nt::VecElems)] },
    // 20
    Production { lhs: Nt::VecElems, rhs: &[T(Tk::Comma), N(Nt::VecElems)] },
    Production { lhs: Nt::VecElems, rhs: &[A(Do::MatrixFormat)] },
    Production { lhs: Nt::VecElems, rhs: &[] },
    Production { lhs: Nt::RowElems, rhs: &[N(Nt::Scalar), A(Do::AddScalar), N(Nt::RowElems)] },
    Production { lhs: Nt::RowElems, rhs: &[T(Tk::Comma), N(Nt::RowElems)] },
    // 25
    Production { lhs: Nt::RowElems, rhs: &[] },
    Production {
        lhs: Nt::Rows,
        rhs: &[
            T(Tk::OpenBrace),
            N(Nt::RowElems),
            T(Tk::CloseBrace),
            A(Do::EndVector),
            N(Nt::Rows),
        ],
    },
    Production { lhs: Nt::Rows, rhs: &[T(Tk::Comma), N(Nt::Rows)] },
    Production { lhs: Nt::Rows, rhs: &[A(Do::MatrixFormat)] },
    Production { lhs: Nt::Rows, rhs: &[] },
    // 30
    Production { lhs: Nt::Scalar, rhs: &[T(Tk::String)] },
    Production { lhs: Nt::Scalar, rhs: &[T(Tk::Number)] },
    Production { lhs: Nt::Brace, rhs: &[T(Tk::Comma), N(Nt::Brace)] },
];

use self::Entry::{Conflict as C, Error as E, Produce as P};

/// Indexed by `[NonTerminal as usize][Terminal as usize]`.
#[rustfmt::skip]
pub static PARSE_TABLE: [[Entry; Terminal::COUNT]; NonTerminal::COUNT] = [
    //                END     STRING  NUMBER  LINK    {       }       (       )       ,       =       ERROR   OTHER
    /* Document   */ [P(0),   P(0),   P(0),   P(0),   P(0),   P(0),   P(0),   P(0),   P(0),   P(0),   P(0),   P(0)],
    /* Items      */ [P(2),   P(1),   P(1),   P(1),   E,      P(2),   E,      E,      E,      E,      E,      E   ],
    /* Item       */ [E,      P(4),   P(4),   P(3),   E,      E,      E,      E,      E,      E,      E,      E   ],
    /* Name       */ [E,      P(5),   P(6),   E,      E,      E,      E,      E,      E,      E,      E,      E   ],
    /* Rhs        */ [E,      P(8),   P(8),   P(8),   P(8),   E,      P(7),   E,      E,      E,      E,      E   ],
    /* CastBody   */ [E,      P(9),   E,      E,      E,      E,      E,      P(10),  E,      E,      E,      E   ],
    /* Value      */ [E,      P(11),  P(11),  P(12),  P(13),  E,      E,      E,      E,      E,      E,      E   ],
    /* Brace      */ [E,      C(0),   C(0),   P(14),  P(16),  P(15),  E,      E,      P(32),  E,      E,      E   ],
    /* GroupBody  */ [E,      P(17),  P(17),  P(17),  E,      E,      E,      E,      E,      E,      E,      E   ],
    /* VectorBody */ [E,      P(18),  P(18),  E,      E,      P(18),  E,      E,      E,      E,      E,      E   ],
    /* VecElems   */ [E,      P(19),  P(19),  E,      P(21),  P(22),  E,      E,      P(20),  E,      E,      E   ],
    /* RowElems   */ [E,      P(23),  P(23),  E,      E,      P(25),  E,      E,      P(24),  E,      E,      E   ],
    /* Rows       */ [E,      P(28),  P(28),  E,      P(26),  P(29),  E,      E,      P(27),  E,      E,      E   ],
    /* Scalar     */ [E,      P(30),  P(31),  E,      E,      E,      E,      E,      E,      E,      E,      E   ],
];

/// `Brace` on a scalar: a following `=` makes it a group, anything else a vector.
pub static CONFLICTS: [Conflict; 1] = [Conflict {
    lookahead: 1,
    cases: &[(Terminal::Equals, P(14))],
    otherwise: P(15),
}];
