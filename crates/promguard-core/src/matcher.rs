//! Label matchers: the single building block of tenant enforcement.

use std::fmt;

use regex::Regex;

use crate::error::{GateError, Result};
use crate::promql::printer::write_quoted;

/// Match operator of a label matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    Equal,
    NotEqual,
    Regexp,
    NotRegexp,
}

impl MatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchKind::Equal => "=",
            MatchKind::NotEqual => "!=",
            MatchKind::Regexp => "=~",
            MatchKind::NotRegexp => "!~",
        }
    }

    fn is_regex(self) -> bool {
        matches!(self, MatchKind::Regexp | MatchKind::NotRegexp)
    }
}

/// Immutable `(name, kind, value)` predicate over one label.
///
/// Regex values are validated at construction, anchored the same way the
/// query engine anchors them (`^(?:value)$`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Matcher {
    name: String,
    kind: MatchKind,
    value: String,
}

impl Matcher {
    pub fn new(name: impl Into<String>, kind: MatchKind, value: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let value = value.into();
        if name.is_empty() {
            return Err(GateError::BadRequest("label matcher name must not be empty".into()));
        }
        if kind.is_regex() {
            anchored(&value)?;
        }
        Ok(Self { name, kind, value })
    }

    /// Build the matcher that scopes a request to `values` of `label`.
    ///
    /// One value yields an equality matcher, several yield an anchored
    /// alternation. Values are regex-escaped so they are matched literally.
    pub fn for_tenant(label: &str, values: &[String]) -> Result<Self> {
        debug_assert!(!values.is_empty(), "tenant matcher built from zero values");
        match values {
            [] => Err(GateError::Internal(format!(
                "empty tenant value set for label {label:?}"
            ))),
            [single] => Self::new(label, MatchKind::Equal, single.clone()),
            many => {
                let alternation = many
                    .iter()
                    .map(|v| regex::escape(v))
                    .collect::<Vec<_>>()
                    .join("|");
                Self::new(label, MatchKind::Regexp, format!("^(?:{alternation})$"))
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MatchKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Compile into a predicate usable against label values.
    pub fn compile(&self) -> Result<LabelPredicate> {
        let re = if self.kind.is_regex() {
            Some(anchored(&self.value)?)
        } else {
            None
        };
        Ok(LabelPredicate { matcher: self.clone(), re })
    }

    /// One-shot evaluation against a label value.
    ///
    /// An invalid regex cannot exist past `new`, so compile failure here
    /// simply reports no match.
    pub fn matches(&self, value: &str) -> bool {
        self.compile().map(|p| p.matches(value)).unwrap_or(false)
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.kind.as_str())?;
        write_quoted(f, &self.value)
    }
}

/// A matcher with its regex compiled once, for evaluating many label sets.
#[derive(Debug, Clone)]
pub struct LabelPredicate {
    matcher: Matcher,
    re: Option<Regex>,
}

impl LabelPredicate {
    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn matches(&self, value: &str) -> bool {
        match (self.matcher.kind, &self.re) {
            (MatchKind::Equal, _) => value == self.matcher.value,
            (MatchKind::NotEqual, _) => value != self.matcher.value,
            (MatchKind::Regexp, Some(re)) => re.is_match(value),
            (MatchKind::NotRegexp, Some(re)) => !re.is_match(value),
            (MatchKind::Regexp | MatchKind::NotRegexp, None) => false,
        }
    }

    /// Membership check over a label set: an absent label never matches.
    pub fn matches_label(&self, value: Option<&str>) -> bool {
        value.is_some_and(|v| self.matches(v))
    }
}

fn anchored(value: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{value})$"))
        .map_err(|e| GateError::BadRequest(format!("invalid regular expression {value:?}: {e}")))
}
