use log::{error, trace};
use serde::Deserialize;
use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Read};

/// What went wrong when the lexer produced an `Error` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexicalIssue {
    /// A quoted string reached the end of input before its closing `"`.
    UnterminatedString,
    /// A block comment reached the end of input before its end marker.
    UnterminatedComment,
    /// A word starting like a decimal number that is not one (`123a1`, `1e`).
    MalformedNumber,
    /// `0x` not followed by hexadecimal digits only.
    MalformedHex,
    /// A `.` inside a hexadecimal literal.
    HexWithDot,
    /// More than 16 hexadecimal digits after `0x`.
    HexTooLong,
    /// An escape sequence other than `\n`, `\t`, `\r`, `\"`, `\\` under the strict policy.
    UnknownEscape,
    /// A `"` after the first character of a word (`ident"`).
    QuoteInsideWord,
}

impl fmt::Display for LexicalIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LexicalIssue::UnterminatedString => "unterminated string",
            LexicalIssue::UnterminatedComment => "unterminated comment",
            LexicalIssue::MalformedNumber => "malformed number",
            LexicalIssue::MalformedHex => "malformed hex number",
            LexicalIssue::HexWithDot => "hex number does not have '.'",
            LexicalIssue::HexTooLong => "too many figures in hex number",
            LexicalIssue::UnknownEscape => "unknown escape sequence",
            LexicalIssue::QuoteInsideWord => "identifier cannot include '\"'",
        };
        f.write_str(text)
    }
}

/// Represents the classes of tokens the lexer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// End of input. Repeats forever once reached.
    End,
    /// An identifier or a string, quoted or not.
    Value,
    /// A decimal, floating point or hexadecimal literal.
    Number,
    /// Input the lexer could not classify.
    Error(LexicalIssue),
    /// One of the configured terminal characters.
    Terminal,
}

impl TokenKind {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::End => "END",
            TokenKind::Value => "STRING",
            TokenKind::Number => "NUMBER",
            TokenKind::Error(_) => "ERROR",
            TokenKind::Terminal => "TERMINAL",
        }
    }
}

/// A classified piece of input with the line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: u32) -> Token {
        Token {
            kind,
            text: text.into(),
            line,
        }
    }

    /// True for a `Terminal` token made of exactly `c`.
    #[must_use]
    pub fn is_terminal(&self, c: char) -> bool {
        self.kind == TokenKind::Terminal && self.text.chars().eq(std::iter::once(c))
    }

    /// True for `Value` and `Number` tokens.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(self.kind, TokenKind::Value | TokenKind::Number)
    }

    /// A value beginning with `*` references another node.
    #[must_use]
    pub fn is_link(&self) -> bool {
        self.kind == TokenKind::Value && self.text.starts_with('*')
    }

    /// The referenced path of a link token, without the leading `*`.
    #[must_use]
    pub fn link_target(&self) -> Option<&str> {
        if self.is_link() {
            self.text.strip_prefix('*')
        } else {
            None
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::End => write!(f, "END"),
            kind => write!(f, "{}({})", kind.name(), self.text),
        }
    }
}

/// What to do with a backslash followed by an unknown character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapePolicy {
    /// Keep the backslash and the character.
    #[default]
    Preserve,
    /// Produce an `Error` token.
    Strict,
}

/// Character classes and comment markers of the language.
///
/// An empty comment marker disables that kind of comment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LexerConfig {
    pub terminals: String,
    pub separators: String,
    pub line_comment: String,
    pub block_comment_begin: String,
    pub block_comment_end: String,
    pub escape_policy: EscapePolicy,
    /// When false every word is a `Value`, numbers included.
    pub parse_numbers: bool,
}

impl Default for LexerConfig {
    fn default() -> Self {
        LexerConfig {
            terminals: "{}(),=".to_string(),
            separators: " \t\r\n".to_string(),
            line_comment: "//".to_string(),
            block_comment_begin: "/*".to_string(),
            block_comment_end: "*/".to_string(),
            escape_policy: EscapePolicy::Preserve,
            parse_numbers: true,
        }
    }
}

/// Adapts a byte reader into a character source, decoding UTF-8.
///
/// A read error ends the stream; it is logged and kept for [`ByteSource::take_error`].
pub struct ByteSource<R> {
    bytes: io::Bytes<R>,
    /// A byte read while decoding a sequence that turned out not to belong to it.
    pending: Option<u8>,
    error: Option<io::Error>,
}

impl<R: Read> ByteSource<R> {
    pub fn new(reader: R) -> Self {
        ByteSource {
            bytes: reader.bytes(),
            pending: None,
            error: None,
        }
    }

    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    fn read_byte(&mut self) -> Option<u8> {
        if let Some(byte) = self.pending.take() {
            return Some(byte);
        }
        if self.error.is_some() {
            return None;
        }
        match self.bytes.next()? {
            Ok(byte) => Some(byte),
            Err(err) => {
                error!("character source failed: {err}");
                self.error = Some(err);
                None
            }
        }
    }
}

impl<R: Read> Iterator for ByteSource<R> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        let first = self.read_byte()?;
        let width = match first {
            0x00..=0x7F => return Some(char::from(first)),
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return Some(char::REPLACEMENT_CHARACTER),
        };
        let mut buffer = [first, 0, 0, 0];
        for slot in buffer.iter_mut().take(width).skip(1) {
            match self.read_byte() {
                Some(byte @ 0x80..=0xBF) => *slot = byte,
                Some(other) => {
                    self.pending = Some(other);
                    return Some(char::REPLACEMENT_CHARACTER);
                }
                None => return Some(char::REPLACEMENT_CHARACTER),
            }
        }
        let decoded = std::str::from_utf8(&buffer[..width])
            .ok()
            .and_then(|s| s.chars().next());
        Some(decoded.unwrap_or(char::REPLACEMENT_CHARACTER))
    }
}

/// Character cursor with unlimited pushback and line counting.
struct CharReader<S> {
    source: S,
    pushback: VecDeque<char>,
    line: u32,
}

impl<S: Iterator<Item = char>> CharReader<S> {
    fn next(&mut self) -> Option<char> {
        let c = self.pushback.pop_front().or_else(|| self.source.next());
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn unread(&mut self, c: char) {
        if c == '\n' {
            self.line = self.line.saturating_sub(1);
        }
        self.pushback.push_front(c);
    }

    /// Consumes `rest` if the upcoming characters match it, otherwise leaves the input untouched.
    fn follows(&mut self, rest: &[char]) -> bool {
        let mut read = Vec::with_capacity(rest.len());
        for expected in rest {
            match self.next() {
                Some(c) => {
                    read.push(c);
                    if c != *expected {
                        break;
                    }
                }
                None => break,
            }
        }
        if read.as_slice() == rest {
            return true;
        }
        for c in read.into_iter().rev() {
            self.unread(c);
        }
        false
    }
}

enum Comment {
    Line,
    Block,
}

/// Turns characters into tokens on demand, buffering them for lookahead.
pub struct Lexer<S> {
    reader: CharReader<S>,
    terminals: Vec<char>,
    separators: Vec<char>,
    line_comment: Vec<char>,
    block_begin: Vec<char>,
    block_end: Vec<char>,
    escape_policy: EscapePolicy,
    parse_numbers: bool,
    queue: VecDeque<Token>,
    finished: bool,
}

impl<S: Iterator<Item = char>> Lexer<S> {
    pub fn new(source: S) -> Self {
        Self::with_config(source, &LexerConfig::default())
    }

    pub fn with_config(source: S, config: &LexerConfig) -> Self {
        Self {
            reader: CharReader {
                source,
                pushback: VecDeque::new(),
                line: 1,
            },
            terminals: config.terminals.chars().collect(),
            separators: config.separators.chars().collect(),
            line_comment: config.line_comment.chars().collect(),
            block_begin: config.block_comment_begin.chars().collect(),
            block_end: config.block_comment_end.chars().collect(),
            escape_policy: config.escape_policy,
            parse_numbers: config.parse_numbers,
            queue: VecDeque::new(),
            finished: false,
        }
    }

    /// Consumes and returns the next token.
    pub fn next_token(&mut self) -> Token {
        if self.queue.is_empty() {
            self.tokenize();
        }
        match self.queue.pop_front() {
            Some(token) => token,
            None => Token::new(TokenKind::End, "", self.reader.line),
        }
    }

    /// Returns the token `position` places ahead without consuming anything.
    pub fn peek_token(&mut self, position: usize) -> &Token {
        while self.queue.len() <= position {
            self.tokenize();
        }
        &self.queue[position]
    }

    /// Line the character cursor is on.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.reader.line
    }

    /// Gives the character source back, e.g. to inspect a reader error.
    pub fn into_source(self) -> S {
        self.reader.source
    }

    /// Appends at least one token to the queue.
    fn tokenize(&mut self) {
        if self.finished {
            self.push(TokenKind::End, String::new(), self.reader.line);
            return;
        }
        let first = loop {
            let Some(c) = self.reader.next() else {
                self.finished = true;
                self.push(TokenKind::End, String::new(), self.reader.line);
                return;
            };
            if self.separators.contains(&c) {
                continue;
            }
            match self.comment_start(c) {
                Some(Comment::Line) => self.skip_line_comment(),
                Some(Comment::Block) => {
                    let line = self.reader.line;
                    if !self.skip_block_comment() {
                        let marker: String = self.block_begin.iter().collect();
                        self.push(
                            TokenKind::Error(LexicalIssue::UnterminatedComment),
                            marker,
                            line,
                        );
                        return;
                    }
                }
                None => break c,
            }
        };

        let line = self.reader.line;
        if self.terminals.contains(&first) {
            self.push(TokenKind::Terminal, first.to_string(), line);
        } else if first == '"' {
            self.read_quoted(line);
        } else {
            self.read_word(first, line);
        }
    }

    fn comment_start(&mut self, c: char) -> Option<Comment> {
        if self.line_comment.first() == Some(&c) && self.reader.follows(&self.line_comment[1..]) {
            return Some(Comment::Line);
        }
        if self.block_begin.first() == Some(&c) && self.reader.follows(&self.block_begin[1..]) {
            return Some(Comment::Block);
        }
        None
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.reader.next() {
            if c == '\n' {
                break;
            }
        }
    }

    /// Returns false when the input ends before the end marker.
    fn skip_block_comment(&mut self) -> bool {
        while let Some(c) = self.reader.next() {
            if self.block_end.first() == Some(&c) && self.reader.follows(&self.block_end[1..]) {
                return true;
            }
        }
        false
    }

    /// Reads the character after a backslash into `text`.
    fn read_escape(&mut self, text: &mut String) -> Result<(), LexicalIssue> {
        let Some(c) = self.reader.next() else {
            text.push('\\');
            return Ok(());
        };
        match c {
            'n' => text.push('\n'),
            't' => text.push('\t'),
            'r' => text.push('\r'),
            '"' => text.push('"'),
            '\\' => text.push('\\'),
            other => match self.escape_policy {
                EscapePolicy::Preserve => {
                    text.push('\\');
                    text.push(other);
                }
                EscapePolicy::Strict => {
                    text.push('\\');
                    text.push(other);
                    return Err(LexicalIssue::UnknownEscape);
                }
            },
        }
        Ok(())
    }

    fn read_quoted(&mut self, line: u32) {
        let mut text = String::new();
        loop {
            match self.reader.next() {
                None => {
                    self.push(
                        TokenKind::Error(LexicalIssue::UnterminatedString),
                        text,
                        line,
                    );
                    return;
                }
                Some('"') => {
                    self.push(TokenKind::Value, text, line);
                    return;
                }
                Some('\\') => {
                    if let Err(issue) = self.read_escape(&mut text) {
                        self.push(TokenKind::Error(issue), text, line);
                        return;
                    }
                }
                Some(c) => text.push(c),
            }
        }
    }

    fn read_word(&mut self, first: char, line: u32) {
        let mut text = String::new();
        let mut c = first;
        loop {
            if c == '\\' {
                if let Err(issue) = self.read_escape(&mut text) {
                    self.push(TokenKind::Error(issue), text, line);
                    return;
                }
            } else if c == '"' {
                text.push(c);
                self.push(
                    TokenKind::Error(LexicalIssue::QuoteInsideWord),
                    text,
                    line,
                );
                return;
            } else {
                text.push(c);
            }

            let Some(next) = self.reader.next() else {
                break;
            };
            if self.separators.contains(&next) {
                break;
            }
            if self.terminals.contains(&next) {
                self.reader.unread(next);
                break;
            }
            match self.comment_start(next) {
                Some(Comment::Line) => {
                    self.skip_line_comment();
                    break;
                }
                Some(Comment::Block) => {
                    let comment_line = self.reader.line;
                    if self.skip_block_comment() {
                        break;
                    }
                    self.push_word(text, line);
                    let marker: String = self.block_begin.iter().collect();
                    self.push(
                        TokenKind::Error(LexicalIssue::UnterminatedComment),
                        marker,
                        comment_line,
                    );
                    return;
                }
                None => c = next,
            }
        }
        self.push_word(text, line);
    }

    fn push_word(&mut self, text: String, line: u32) {
        let kind = if self.parse_numbers {
            classify_word(&text)
        } else {
            TokenKind::Value
        };
        self.push(kind, text, line);
    }

    fn push(&mut self, kind: TokenKind, text: String, line: u32) {
        let token = Token::new(kind, text, line);
        trace!("lexer: {} at line {}", token, line);
        self.queue.push_back(token);
    }
}

const MAX_HEX_DIGITS: u8 = 16;

#[derive(Clone, Copy)]
enum NumberScan {
    Start,
    Zero,
    Integer,
    HexPrefix,
    Hex(u8),
    Fraction,
    Exponent,
    ExponentSign,
    ExponentDigits,
}

/// Decides whether an unquoted word is a number, a plain value or a broken literal.
pub(crate) fn classify_word(text: &str) -> TokenKind {
    let body = text.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(text);
    if !body.starts_with(|c: char| c.is_ascii_digit()) {
        return TokenKind::Value;
    }

    let mut state = NumberScan::Start;
    for c in body.chars() {
        state = match (state, c) {
            (NumberScan::Start, '0') => NumberScan::Zero,
            (NumberScan::Start | NumberScan::Zero | NumberScan::Integer, d) if d.is_ascii_digit() => {
                NumberScan::Integer
            }
            (NumberScan::Zero, 'x' | 'X') => NumberScan::HexPrefix,
            (NumberScan::HexPrefix, h) if h.is_ascii_hexdigit() => NumberScan::Hex(1),
            (NumberScan::Hex(n), h) if h.is_ascii_hexdigit() => {
                if n >= MAX_HEX_DIGITS {
                    return TokenKind::Error(LexicalIssue::HexTooLong);
                }
                NumberScan::Hex(n + 1)
            }
            (NumberScan::HexPrefix | NumberScan::Hex(_), '.') => {
                return TokenKind::Error(LexicalIssue::HexWithDot)
            }
            (NumberScan::HexPrefix | NumberScan::Hex(_), _) => {
                return TokenKind::Error(LexicalIssue::MalformedHex)
            }
            (NumberScan::Zero | NumberScan::Integer, '.') => NumberScan::Fraction,
            (NumberScan::Fraction, d) if d.is_ascii_digit() => NumberScan::Fraction,
            (NumberScan::Zero | NumberScan::Integer | NumberScan::Fraction, 'e' | 'E') => {
                NumberScan::Exponent
            }
            (NumberScan::Exponent, '+' | '-') => NumberScan::ExponentSign,
            (
                NumberScan::Exponent | NumberScan::ExponentSign | NumberScan::ExponentDigits,
                d,
            ) if d.is_ascii_digit() => NumberScan::ExponentDigits,
            _ => return TokenKind::Error(LexicalIssue::MalformedNumber),
        };
    }

    match state {
        NumberScan::Zero
        | NumberScan::Integer
        | NumberScan::Fraction
        | NumberScan::ExponentDigits
        | NumberScan::Hex(_) => TokenKind::Number,
        NumberScan::HexPrefix => TokenKind::Error(LexicalIssue::MalformedHex),
        NumberScan::Exponent | NumberScan::ExponentSign => {
            TokenKind::Error(LexicalIssue::MalformedNumber)
        }
        NumberScan::Start => TokenKind::Value,
    }
}
