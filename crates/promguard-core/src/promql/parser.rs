//! Recursive-descent PromQL parser.
//!
//! Binary operators use precedence climbing; postfix `[range]`, `[range:step]`,
//! `offset` and `@` bind to the primary expression they follow.

use crate::error::{GateError, Result};
use crate::matcher::{MatchKind, Matcher};

use super::ast::{
    AggregateExpr, AggregateOp, AtModifier, BinModifier, BinaryExpr, BinaryOp, Call, Expr,
    GroupModifier, Grouping, MatrixSelector, PromDuration, SubqueryExpr, TimeModifiers,
    UnaryExpr, VectorMatching, VectorSelector,
};
use super::lexer::{tokenize, Spanned, Token};

/// Longest accepted query text, in bytes.
pub const MAX_QUERY_BYTES: usize = 256 * 1024;

/// Deepest accepted nesting of sub-expressions. Bounds the recursion of the
/// parser and of every later walk over the tree.
pub const MAX_DEPTH: usize = 128;

/// Parse a complete PromQL expression.
pub fn parse_expr(input: &str) -> Result<Expr> {
    if input.len() > MAX_QUERY_BYTES {
        return Err(GateError::parse(
            0,
            format!("query longer than {MAX_QUERY_BYTES} bytes"),
        ));
    }
    let mut p = Parser::new(input)?;
    if p.at_eof() {
        return Err(GateError::parse(0, "no expression found in input"));
    }
    let expr = p.expr(0)?;
    p.expect_eof()?;
    Ok(expr)
}

/// Parse a single label matcher (`name="value"`, `name=~"re"`, ...).
///
/// Accepts an optional surrounding `{}` so both `a="b"` and `{a="b"}` work.
pub fn parse_matcher(input: &str) -> Result<Matcher> {
    let mut p = Parser::new(input)?;
    let braced = p.eat(&Token::LBrace);
    let m = p.matcher()?;
    if braced {
        p.expect(&Token::RBrace)?;
    }
    p.expect_eof()?;
    Ok(m)
}

/// Parse an Alertmanager filter matcher.
///
/// Same as [`parse_matcher`], but the value may also be unquoted
/// (`alertname=Foo`), in which case everything after the operator, trimmed,
/// is the value.
pub fn parse_filter_matcher(input: &str) -> Result<Matcher> {
    let quoted_err = match parse_matcher(input) {
        Ok(m) => return Ok(m),
        Err(e) => e,
    };

    let mut text = input.trim();
    if let Some(inner) = text.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
        text = inner.trim();
    }
    let name_len = text
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_alphabetic() || c == '_' || (i > 0 && c.is_ascii_digit())))
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    if name_len == 0 {
        return Err(quoted_err);
    }
    let (name, rest) = text.split_at(name_len);
    let rest = rest.trim_start();

    let (kind, value) = if let Some(v) = rest.strip_prefix("=~") {
        (MatchKind::Regexp, v)
    } else if let Some(v) = rest.strip_prefix("!~") {
        (MatchKind::NotRegexp, v)
    } else if let Some(v) = rest.strip_prefix("!=") {
        (MatchKind::NotEqual, v)
    } else if let Some(v) = rest.strip_prefix('=') {
        (MatchKind::Equal, v)
    } else {
        return Err(quoted_err);
    };
    let value = value.trim();
    if value.starts_with(['"', '\'', '`']) {
        return Err(quoted_err);
    }
    Matcher::new(name, kind, value).map_err(|e| GateError::parse(name_len, e.to_string()))
}

struct Parser {
    tokens: Vec<Spanned>,
    idx: usize,
    depth: usize,
}

impl Parser {
    fn new(input: &str) -> Result<Self> {
        Ok(Self { tokens: tokenize(input)?, idx: 0, depth: 0 })
    }

    /// One more level of tree depth; restored by `expr` on return.
    fn descend(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(GateError::parse(self.pos(), "expression nested too deeply"));
        }
        Ok(())
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.idx).map(|s| &s.token).unwrap_or(&Token::Eof)
    }

    fn peek_nth(&self, n: usize) -> &Token {
        self.tokens.get(self.idx + n).map(|s| &s.token).unwrap_or(&Token::Eof)
    }

    fn pos(&self) -> usize {
        self.tokens
            .get(self.idx)
            .or_else(|| self.tokens.last())
            .map(|s| s.pos)
            .unwrap_or(0)
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.idx < self.tokens.len() {
            self.idx += 1;
        }
        tok
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.peek() == tok {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: &Token) -> Result<()> {
        if self.eat(tok) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected {tok:?}")))
        }
    }

    fn expect_eof(&self) -> Result<()> {
        if self.at_eof() {
            Ok(())
        } else {
            Err(self.unexpected("expected end of input"))
        }
    }

    fn unexpected(&self, context: &str) -> GateError {
        GateError::parse(self.pos(), format!("unexpected {:?}, {context}", self.peek()))
    }

    fn peek_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Token::Ident(s) if s.eq_ignore_ascii_case(kw))
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.peek_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    // ---------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------

    fn expr(&mut self, min_prec: u8) -> Result<Expr> {
        let depth = self.depth;
        let result = self.binary_chain(min_prec);
        self.depth = depth;
        result
    }

    // Every operator in a left-associative chain deepens the tree by one
    // even though the parser itself does not recurse, so it is counted too.
    fn binary_chain(&mut self, min_prec: u8) -> Result<Expr> {
        self.descend()?;
        let mut lhs = self.unary()?;
        while let Some(op) = self.peek_binary_op() {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.advance();
            self.descend()?;
            let modifier = self.bin_modifier(op)?;
            let next_min = if op.is_right_assoc() { prec } else { prec + 1 };
            let rhs = self.expr(next_min)?;
            lhs = Expr::Binary(BinaryExpr {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                modifier,
            });
        }
        Ok(lhs)
    }

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        let op = match self.peek() {
            Token::Add => BinaryOp::Add,
            Token::Sub => BinaryOp::Sub,
            Token::Mul => BinaryOp::Mul,
            Token::Div => BinaryOp::Div,
            Token::Mod => BinaryOp::Mod,
            Token::Pow => BinaryOp::Pow,
            Token::Eql => BinaryOp::Eql,
            Token::Neq => BinaryOp::Neq,
            Token::Gtr => BinaryOp::Gtr,
            Token::Lss => BinaryOp::Lss,
            Token::Gte => BinaryOp::Gte,
            Token::Lte => BinaryOp::Lte,
            Token::Ident(s) if s.eq_ignore_ascii_case("and") => BinaryOp::And,
            Token::Ident(s) if s.eq_ignore_ascii_case("or") => BinaryOp::Or,
            Token::Ident(s) if s.eq_ignore_ascii_case("unless") => BinaryOp::Unless,
            Token::Ident(s) if s.eq_ignore_ascii_case("atan2") => BinaryOp::Atan2,
            _ => return None,
        };
        Some(op)
    }

    fn bin_modifier(&mut self, op: BinaryOp) -> Result<BinModifier> {
        let mut m = BinModifier::default();
        if self.peek_keyword("bool") {
            if !op.is_comparison() {
                return Err(self.unexpected("bool modifier is only allowed on comparison operators"));
            }
            self.advance();
            m.return_bool = true;
        }
        if self.eat_keyword("on") {
            m.matching = Some(VectorMatching::On(self.label_list()?));
        } else if self.eat_keyword("ignoring") {
            m.matching = Some(VectorMatching::Ignoring(self.label_list()?));
        }
        let left = self.peek_keyword("group_left");
        if left || self.peek_keyword("group_right") {
            if m.matching.is_none() {
                return Err(self.unexpected("group modifiers require on(...) or ignoring(...)"));
            }
            if op.is_set_operator() {
                return Err(self.unexpected("no grouping allowed for set operations"));
            }
            self.advance();
            let labels = if matches!(self.peek(), Token::LParen) {
                self.label_list()?
            } else {
                Vec::new()
            };
            m.group = Some(if left {
                GroupModifier::Left(labels)
            } else {
                GroupModifier::Right(labels)
            });
        }
        Ok(m)
    }

    fn unary(&mut self) -> Result<Expr> {
        match self.peek() {
            Token::Sub => {
                self.advance();
                let operand = self.expr(BinaryOp::Pow.precedence())?;
                Ok(match operand {
                    Expr::NumberLiteral(n) => Expr::NumberLiteral(-n),
                    other => Expr::Unary(UnaryExpr { expr: Box::new(other) }),
                })
            }
            Token::Add => {
                self.advance();
                self.expr(BinaryOp::Pow.precedence())
            }
            _ => {
                let primary = self.primary()?;
                self.postfix(primary)
            }
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.peek().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(Expr::NumberLiteral(n))
            }
            Token::Str(s) => {
                self.advance();
                Ok(Expr::StringLiteral(s))
            }
            Token::LParen => {
                self.advance();
                let inner = self.expr(0)?;
                self.expect(&Token::RParen)?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            Token::LBrace => {
                let matchers = self.matcher_list()?;
                self.selector(None, matchers)
            }
            Token::Ident(name) => self.ident_expr(name),
            _ => Err(self.unexpected("expected expression")),
        }
    }

    fn ident_expr(&mut self, name: String) -> Result<Expr> {
        if name.eq_ignore_ascii_case("inf") {
            self.advance();
            return Ok(Expr::NumberLiteral(f64::INFINITY));
        }
        if name.eq_ignore_ascii_case("nan") {
            self.advance();
            return Ok(Expr::NumberLiteral(f64::NAN));
        }

        let next = self.peek_nth(1);
        let opens_call = matches!(next, Token::LParen);
        let opens_grouping = matches!(next, Token::Ident(s)
            if s.eq_ignore_ascii_case("by") || s.eq_ignore_ascii_case("without"));

        if let Some(op) = AggregateOp::from_ident(&name) {
            if opens_call || opens_grouping {
                self.advance();
                return self.aggregate(op);
            }
        }

        self.advance();
        if opens_call {
            let args = self.call_args()?;
            return Ok(Expr::Call(Call { func: name, args }));
        }

        let matchers = if matches!(self.peek(), Token::LBrace) {
            self.matcher_list()?
        } else {
            Vec::new()
        };
        self.selector(Some(name), matchers)
    }

    fn selector(&mut self, name: Option<String>, matchers: Vec<Matcher>) -> Result<Expr> {
        let pos = self.pos();
        let names_metric = matchers.iter().any(|m| m.name() == "__name__");
        if name.is_some() && names_metric {
            return Err(GateError::parse(pos, "metric name must not be set twice"));
        }
        if name.is_none() && matchers.iter().all(|m| m.matches("")) {
            return Err(GateError::parse(
                pos,
                "vector selector must contain at least one non-empty matcher",
            ));
        }
        Ok(Expr::VectorSelector(VectorSelector {
            name,
            matchers,
            modifiers: TimeModifiers::default(),
        }))
    }

    fn aggregate(&mut self, op: AggregateOp) -> Result<Expr> {
        let mut grouping = self.grouping()?;

        self.expect(&Token::LParen)?;
        let param = if op.takes_param() {
            let p = self.expr(0)?;
            self.expect(&Token::Comma)?;
            Some(Box::new(p))
        } else {
            None
        };
        let expr = self.expr(0)?;
        self.eat(&Token::Comma);
        self.expect(&Token::RParen)?;

        if let Some(trailing) = self.grouping()? {
            if grouping.is_some() {
                return Err(self.unexpected("grouping given twice"));
            }
            grouping = Some(trailing);
        }

        Ok(Expr::Aggregate(AggregateExpr {
            op,
            grouping,
            param,
            expr: Box::new(expr),
        }))
    }

    fn grouping(&mut self) -> Result<Option<Grouping>> {
        if self.eat_keyword("by") {
            return Ok(Some(Grouping::By(self.label_list()?)));
        }
        if self.eat_keyword("without") {
            return Ok(Some(Grouping::Without(self.label_list()?)));
        }
        Ok(None)
    }

    fn call_args(&mut self) -> Result<Vec<Expr>> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expr(0)?);
            if self.eat(&Token::Comma) {
                if self.eat(&Token::RParen) {
                    return Ok(args);
                }
                continue;
            }
            self.expect(&Token::RParen)?;
            return Ok(args);
        }
    }

    fn postfix(&mut self, mut expr: Expr) -> Result<Expr> {
        loop {
            match self.peek() {
                Token::LBracket => expr = self.range_or_subquery(expr)?,
                Token::At => {
                    self.advance();
                    let at = self.at_modifier()?;
                    let mods = self.time_modifiers_of(&mut expr)?;
                    if mods.at.is_some() {
                        return Err(self.unexpected("@ may not be set multiple times"));
                    }
                    mods.at = Some(at);
                }
                Token::Ident(s) if s.eq_ignore_ascii_case("offset") => {
                    self.advance();
                    let offset = self.signed_duration()?;
                    let mods = self.time_modifiers_of(&mut expr)?;
                    if mods.offset.is_some() {
                        return Err(self.unexpected("offset may not be set multiple times"));
                    }
                    mods.offset = Some(offset);
                }
                _ => return Ok(expr),
            }
        }
    }

    fn time_modifiers_of<'a>(&self, expr: &'a mut Expr) -> Result<&'a mut TimeModifiers> {
        match expr {
            Expr::VectorSelector(vs) => Ok(&mut vs.modifiers),
            Expr::MatrixSelector(ms) => Ok(&mut ms.selector.modifiers),
            Expr::Subquery(sq) => Ok(&mut sq.modifiers),
            _ => Err(GateError::parse(
                self.pos(),
                "offset and @ modifiers must follow a selector or subquery",
            )),
        }
    }

    fn range_or_subquery(&mut self, expr: Expr) -> Result<Expr> {
        self.expect(&Token::LBracket)?;
        let range = self.duration()?;

        if self.eat(&Token::Colon) {
            self.descend()?;
            let step = if matches!(self.peek(), Token::Duration(_)) {
                Some(self.duration()?)
            } else {
                None
            };
            self.expect(&Token::RBracket)?;
            return Ok(Expr::Subquery(SubqueryExpr {
                expr: Box::new(expr),
                range,
                step,
                modifiers: TimeModifiers::default(),
            }));
        }

        self.expect(&Token::RBracket)?;
        match expr {
            Expr::VectorSelector(selector)
                if selector.modifiers == TimeModifiers::default() =>
            {
                Ok(Expr::MatrixSelector(MatrixSelector { selector, range }))
            }
            _ => Err(GateError::parse(
                self.pos(),
                "ranges only allowed for vector selectors",
            )),
        }
    }

    fn duration(&mut self) -> Result<PromDuration> {
        match self.peek() {
            Token::Duration(ms) => {
                let d = PromDuration(*ms);
                self.advance();
                Ok(d)
            }
            _ => Err(self.unexpected("expected duration")),
        }
    }

    fn signed_duration(&mut self) -> Result<PromDuration> {
        let negative = self.eat(&Token::Sub);
        let d = self.duration()?;
        Ok(if negative { PromDuration(-d.0) } else { d })
    }

    fn at_modifier(&mut self) -> Result<AtModifier> {
        let negative = self.eat(&Token::Sub);
        match self.peek().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(AtModifier::Timestamp(if negative { -n } else { n }))
            }
            Token::Ident(s)
                if !negative
                    && (s.eq_ignore_ascii_case("start") || s.eq_ignore_ascii_case("end")) =>
            {
                self.advance();
                self.expect(&Token::LParen)?;
                self.expect(&Token::RParen)?;
                Ok(if s.eq_ignore_ascii_case("start") {
                    AtModifier::Start
                } else {
                    AtModifier::End
                })
            }
            _ => Err(self.unexpected("expected timestamp, start() or end() after @")),
        }
    }

    // ---------------------------------------------------------------
    // Labels
    // ---------------------------------------------------------------

    fn label_list(&mut self) -> Result<Vec<String>> {
        self.expect(&Token::LParen)?;
        let mut labels = Vec::new();
        loop {
            match self.advance() {
                Token::RParen => return Ok(labels),
                Token::Ident(s) => labels.push(s),
                Token::Str(s) => labels.push(s),
                _ => return Err(self.unexpected("expected label name")),
            }
            if !self.eat(&Token::Comma) {
                self.expect(&Token::RParen)?;
                return Ok(labels);
            }
        }
    }

    fn matcher_list(&mut self) -> Result<Vec<Matcher>> {
        self.expect(&Token::LBrace)?;
        let mut matchers = Vec::new();
        loop {
            if self.eat(&Token::RBrace) {
                return Ok(matchers);
            }
            matchers.push(self.matcher()?);
            if !self.eat(&Token::Comma) {
                self.expect(&Token::RBrace)?;
                return Ok(matchers);
            }
        }
    }

    fn matcher(&mut self) -> Result<Matcher> {
        let pos = self.pos();
        let name = match self.advance() {
            Token::Ident(s) => s,
            _ => return Err(GateError::parse(pos, "expected label name")),
        };
        let kind = match self.advance() {
            Token::Assign => MatchKind::Equal,
            Token::Neq => MatchKind::NotEqual,
            Token::EqlRegex => MatchKind::Regexp,
            Token::NeqRegex => MatchKind::NotRegexp,
            _ => return Err(GateError::parse(pos, "expected label matching operator")),
        };
        let value = match self.advance() {
            Token::Str(s) => s,
            _ => return Err(GateError::parse(pos, "expected quoted label value")),
        };
        Matcher::new(name, kind, value).map_err(|e| GateError::parse(pos, e.to_string()))
    }
}
