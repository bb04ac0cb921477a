//! AST -> PromQL text.
//!
//! Output re-parses to an equal tree, which makes enforcement idempotent at
//! the text level as well as the AST level.

use std::fmt::{self, Display, Formatter, Write};

use super::ast::{
    AggregateExpr, AtModifier, BinModifier, BinaryExpr, Call, Expr, GroupModifier, Grouping,
    MatrixSelector, PromDuration, SubqueryExpr, TimeModifiers, UnaryExpr, VectorMatching,
    VectorSelector,
};

/// Write `s` as a double-quoted PromQL string literal.
pub(crate) fn write_quoted(f: &mut impl Write, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '"' => f.write_str("\\\"")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c.is_control() => write!(f, "\\u{:04x}", c as u32)?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

fn is_plain_label(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `(a, b)`; names that would not lex back as identifiers are quoted.
fn write_labels(f: &mut Formatter<'_>, labels: &[String]) -> fmt::Result {
    f.write_char('(')?;
    for (i, label) in labels.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        if is_plain_label(label) {
            f.write_str(label)?;
        } else {
            write_quoted(f, label)?;
        }
    }
    f.write_char(')')
}

fn write_number(f: &mut Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n == f64::INFINITY {
        f.write_str("Inf")
    } else if n == f64::NEG_INFINITY {
        f.write_str("-Inf")
    } else {
        write!(f, "{n}")
    }
}

impl Display for PromDuration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        const UNITS: [(&str, i64, bool); 7] = [
            ("y", 31_536_000_000, true),
            ("w", 604_800_000, true),
            ("d", 86_400_000, false),
            ("h", 3_600_000, false),
            ("m", 60_000, false),
            ("s", 1_000, false),
            ("ms", 1, false),
        ];
        if self.0 == 0 {
            return f.write_str("0s");
        }
        if self.0 < 0 {
            f.write_char('-')?;
        }
        let mut ms = self.0.unsigned_abs() as i64;
        for (unit, mult, exact) in UNITS {
            if exact && ms % mult != 0 {
                continue;
            }
            let v = ms / mult;
            if v > 0 {
                write!(f, "{v}{unit}")?;
                ms -= v * mult;
            }
        }
        Ok(())
    }
}

impl Display for TimeModifiers {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.at {
            Some(AtModifier::Timestamp(ts)) => {
                f.write_str(" @ ")?;
                write_number(f, ts)?;
            }
            Some(AtModifier::Start) => f.write_str(" @ start()")?,
            Some(AtModifier::End) => f.write_str(" @ end()")?,
            None => {}
        }
        if let Some(offset) = self.offset {
            write!(f, " offset {offset}")?;
        }
        Ok(())
    }
}

impl VectorSelector {
    fn fmt_body(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            f.write_str(name)?;
        }
        if self.name.is_none() || !self.matchers.is_empty() {
            f.write_char('{')?;
            for (i, m) in self.matchers.iter().enumerate() {
                if i > 0 {
                    f.write_char(',')?;
                }
                write!(f, "{m}")?;
            }
            f.write_char('}')?;
        }
        Ok(())
    }
}

impl Display for VectorSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.fmt_body(f)?;
        write!(f, "{}", self.modifiers)
    }
}

impl Display for MatrixSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.selector.fmt_body(f)?;
        write!(f, "[{}]{}", self.range, self.selector.modifiers)
    }
}

impl Display for BinModifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.return_bool {
            f.write_str(" bool")?;
        }
        match &self.matching {
            Some(VectorMatching::On(labels)) => {
                f.write_str(" on ")?;
                write_labels(f, labels)?;
            }
            Some(VectorMatching::Ignoring(labels)) => {
                f.write_str(" ignoring ")?;
                write_labels(f, labels)?;
            }
            None => {}
        }
        match &self.group {
            Some(GroupModifier::Left(labels)) => {
                f.write_str(" group_left ")?;
                write_labels(f, labels)?;
            }
            Some(GroupModifier::Right(labels)) => {
                f.write_str(" group_right ")?;
                write_labels(f, labels)?;
            }
            None => {}
        }
        Ok(())
    }
}

impl Display for BinaryExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}{} {}", self.lhs, self.op.as_str(), self.modifier, self.rhs)
    }
}

impl Display for UnaryExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "-{}", self.expr)
    }
}

impl Display for AggregateExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.op.as_str())?;
        match &self.grouping {
            Some(Grouping::By(labels)) => {
                f.write_str(" by ")?;
                write_labels(f, labels)?;
                f.write_char(' ')?;
            }
            Some(Grouping::Without(labels)) => {
                f.write_str(" without ")?;
                write_labels(f, labels)?;
                f.write_char(' ')?;
            }
            None => {}
        }
        f.write_char('(')?;
        if let Some(param) = &self.param {
            write!(f, "{param}, ")?;
        }
        write!(f, "{})", self.expr)
    }
}

impl Display for Call {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.func)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_char(')')
    }
}

impl Display for SubqueryExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}:", self.expr, self.range)?;
        if let Some(step) = self.step {
            write!(f, "{step}")?;
        }
        write!(f, "]{}", self.modifiers)
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::NumberLiteral(n) => write_number(f, *n),
            Expr::StringLiteral(s) => write_quoted(f, s),
            Expr::VectorSelector(vs) => vs.fmt(f),
            Expr::MatrixSelector(ms) => ms.fmt(f),
            Expr::Unary(u) => u.fmt(f),
            Expr::Binary(b) => b.fmt(f),
            Expr::Aggregate(a) => a.fmt(f),
            Expr::Call(c) => c.fmt(f),
            Expr::Subquery(sq) => sq.fmt(f),
            Expr::Paren(inner) => write!(f, "({inner})"),
        }
    }
}
