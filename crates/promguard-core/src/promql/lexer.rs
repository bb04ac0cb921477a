//! PromQL tokenizer (panic-free).
//!
//! Rules:
//! - Walk a char buffer through bounds-checked `get`, never slice by byte offset.
//! - Inside `[...]` a `:` is the subquery separator, elsewhere it is part of
//!   a metric identifier (`job:rate5m`).

use crate::error::{GateError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Number(f64),
    /// Duration in milliseconds.
    Duration(i64),
    Str(String),

    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    At,

    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eql,
    Neq,
    Lss,
    Lte,
    Gtr,
    Gte,
    Assign,
    EqlRegex,
    NeqRegex,

    Eof,
}

/// Token plus its char offset in the source, for error reporting.
#[derive(Debug, Clone)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

const MS_PER_UNIT: [(&str, i64); 7] = [
    ("ms", 1),
    ("s", 1_000),
    ("m", 60_000),
    ("h", 3_600_000),
    ("d", 86_400_000),
    ("w", 604_800_000),
    ("y", 31_536_000_000),
];

pub fn tokenize(input: &str) -> Result<Vec<Spanned>> {
    let chars: Vec<char> = input.chars().collect();
    Lexer { chars, pos: 0, bracket_depth: 0, out: Vec::new() }.run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    bracket_depth: usize,
    out: Vec<Spanned>,
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, off: usize) -> Option<char> {
        self.chars.get(self.pos + off).copied()
    }

    fn push(&mut self, token: Token, pos: usize) {
        self.out.push(Spanned { token, pos });
    }

    fn run(mut self) -> Result<Vec<Spanned>> {
        while let Some(c) = self.peek() {
            let start = self.pos;
            if c.is_whitespace() {
                self.pos += 1;
                continue;
            }
            if c == '#' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.pos += 1;
                }
                continue;
            }

            if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())) {
                let tok = self.number_or_duration()?;
                self.push(tok, start);
                continue;
            }
            if c == '"' || c == '\'' || c == '`' {
                let s = self.string(c)?;
                self.push(Token::Str(s), start);
                continue;
            }
            if is_ident_start(c, self.bracket_depth) {
                let mut s = String::new();
                while let Some(c) = self.peek() {
                    if !is_ident_continue(c, self.bracket_depth) {
                        break;
                    }
                    s.push(c);
                    self.pos += 1;
                }
                self.push(Token::Ident(s), start);
                continue;
            }

            let next = self.peek_at(1);
            let (tok, len) = match (c, next) {
                ('=', Some('=')) => (Token::Eql, 2),
                ('=', Some('~')) => (Token::EqlRegex, 2),
                ('=', _) => (Token::Assign, 1),
                ('!', Some('=')) => (Token::Neq, 2),
                ('!', Some('~')) => (Token::NeqRegex, 2),
                ('<', Some('=')) => (Token::Lte, 2),
                ('<', _) => (Token::Lss, 1),
                ('>', Some('=')) => (Token::Gte, 2),
                ('>', _) => (Token::Gtr, 1),
                ('+', _) => (Token::Add, 1),
                ('-', _) => (Token::Sub, 1),
                ('*', _) => (Token::Mul, 1),
                ('/', _) => (Token::Div, 1),
                ('%', _) => (Token::Mod, 1),
                ('^', _) => (Token::Pow, 1),
                ('{', _) => (Token::LBrace, 1),
                ('}', _) => (Token::RBrace, 1),
                ('(', _) => (Token::LParen, 1),
                (')', _) => (Token::RParen, 1),
                ('[', _) => {
                    self.bracket_depth += 1;
                    (Token::LBracket, 1)
                }
                (']', _) => {
                    self.bracket_depth = self.bracket_depth.saturating_sub(1);
                    (Token::RBracket, 1)
                }
                (',', _) => (Token::Comma, 1),
                (':', _) => (Token::Colon, 1),
                ('@', _) => (Token::At, 1),
                (other, _) => {
                    return Err(GateError::parse(start, format!("unexpected character {other:?}")))
                }
            };
            self.pos += len;
            self.push(tok, start);
        }
        let end = self.pos;
        self.push(Token::Eof, end);
        Ok(self.out)
    }

    fn number_or_duration(&mut self) -> Result<Token> {
        let start = self.pos;

        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x' | 'X')) {
            self.pos += 2;
            let digits = self.take_while(|c| c.is_ascii_hexdigit());
            return i64::from_str_radix(&digits, 16)
                .map(|v| Token::Number(v as f64))
                .map_err(|_| GateError::parse(start, "bad hexadecimal number"));
        }

        let int_part = self.take_while(|c| c.is_ascii_digit());
        if !int_part.is_empty() && self.peek().is_some_and(is_unit_start) {
            return self.duration(start, int_part);
        }

        let mut text = int_part;
        if self.peek() == Some('.') {
            self.pos += 1;
            text.push('.');
            text.push_str(&self.take_while(|c| c.is_ascii_digit()));
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let sign = matches!(self.peek_at(1), Some('+' | '-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                for _ in 0..digit_at {
                    if let Some(c) = self.peek() {
                        text.push(c);
                    }
                    self.pos += 1;
                }
                text.push_str(&self.take_while(|c| c.is_ascii_digit()));
            }
        }
        if self.peek().is_some_and(|c| is_ident_continue(c, self.bracket_depth)) {
            return Err(GateError::parse(start, format!("bad number or duration syntax: {text:?}")));
        }
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| GateError::parse(start, format!("bad number {text:?}")))
    }

    /// `1h30m`, `5m`, `250ms`: sum of integer/unit pairs.
    fn duration(&mut self, start: usize, first: String) -> Result<Token> {
        let mut total: i64 = 0;
        let mut digits = first;
        loop {
            let unit = self.take_while(|c| c.is_ascii_alphabetic());
            let mult = MS_PER_UNIT
                .iter()
                .find(|(u, _)| *u == unit)
                .map(|(_, m)| *m)
                .ok_or_else(|| GateError::parse(start, format!("unknown duration unit {unit:?}")))?;
            let n: i64 = digits
                .parse()
                .map_err(|_| GateError::parse(start, "bad duration"))?;
            total = n
                .checked_mul(mult)
                .and_then(|v| total.checked_add(v))
                .ok_or_else(|| GateError::parse(start, "duration out of range"))?;

            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                break;
            }
            digits = self.take_while(|c| c.is_ascii_digit());
            if !self.peek().is_some_and(is_unit_start) {
                return Err(GateError::parse(start, "duration component without unit"));
            }
        }
        if self.peek().is_some_and(|c| is_ident_continue(c, self.bracket_depth)) {
            return Err(GateError::parse(start, "bad duration syntax"));
        }
        Ok(Token::Duration(total))
    }

    fn string(&mut self, quote: char) -> Result<String> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        loop {
            let c = self
                .peek()
                .ok_or_else(|| GateError::parse(start, "unterminated quoted string"))?;
            self.pos += 1;
            if c == quote {
                return Ok(out);
            }
            if quote == '`' {
                out.push(c);
                continue;
            }
            if c == '\n' {
                return Err(GateError::parse(start, "unterminated quoted string"));
            }
            if c != '\\' {
                out.push(c);
                continue;
            }
            let esc = self
                .peek()
                .ok_or_else(|| GateError::parse(start, "unterminated escape sequence"))?;
            self.pos += 1;
            match esc {
                'a' => out.push('\u{07}'),
                'b' => out.push('\u{08}'),
                'f' => out.push('\u{0c}'),
                'n' => out.push('\n'),
                'r' => out.push('\r'),
                't' => out.push('\t'),
                'v' => out.push('\u{0b}'),
                '\\' | '"' | '\'' => out.push(esc),
                'x' => out.push(self.hex_escape(start, 2)?),
                'u' => out.push(self.hex_escape(start, 4)?),
                'U' => out.push(self.hex_escape(start, 8)?),
                '0'..='7' => {
                    let mut v = esc.to_digit(8).unwrap_or(0);
                    for _ in 0..2 {
                        let d = self
                            .peek()
                            .and_then(|c| c.to_digit(8))
                            .ok_or_else(|| GateError::parse(start, "bad octal escape"))?;
                        v = v * 8 + d;
                        self.pos += 1;
                    }
                    out.push(
                        char::from_u32(v).ok_or_else(|| GateError::parse(start, "bad octal escape"))?,
                    );
                }
                other => {
                    return Err(GateError::parse(start, format!("unknown escape sequence \\{other}")))
                }
            }
        }
    }

    fn hex_escape(&mut self, start: usize, len: usize) -> Result<char> {
        let mut v: u32 = 0;
        for _ in 0..len {
            let d = self
                .peek()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| GateError::parse(start, "bad hex escape"))?;
            v = v * 16 + d;
            self.pos += 1;
        }
        char::from_u32(v).ok_or_else(|| GateError::parse(start, "escape is not a valid code point"))
    }

    fn take_while(&mut self, f: impl Fn(char) -> bool) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if !f(c) {
                break;
            }
            s.push(c);
            self.pos += 1;
        }
        s
    }
}

fn is_unit_start(c: char) -> bool {
    matches!(c, 'm' | 's' | 'h' | 'd' | 'w' | 'y')
}

fn is_ident_start(c: char, bracket_depth: usize) -> bool {
    c.is_ascii_alphabetic() || c == '_' || (c == ':' && bracket_depth == 0)
}

fn is_ident_continue(c: char, bracket_depth: usize) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || (c == ':' && bracket_depth == 0)
}
