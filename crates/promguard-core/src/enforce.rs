//! Label enforcement over PromQL trees and flat matcher lists.
//!
//! Every selector reachable from the root must end up carrying every enforced
//! matcher. A selector that already constrains an enforced label differently
//! is a conflict and fails the whole call: overriding silently would either
//! widen the tenant scope or hide what the client asked for.

use tracing::trace;

use crate::error::{GateError, Result};
use crate::matcher::Matcher;
use crate::promql::ast::{AggregateExpr, BinaryExpr, Call, Expr, SubqueryExpr, UnaryExpr};

#[derive(Debug, Clone)]
pub struct Enforcer {
    matchers: Vec<Matcher>,
}

impl Enforcer {
    pub fn new(matchers: Vec<Matcher>) -> Self {
        Self { matchers }
    }

    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    /// Rewrite `expr` so every selector carries the enforced matchers.
    ///
    /// Takes the tree by value: on error the partially rewritten tree is
    /// dropped and can never reach the caller.
    pub fn enforce(&self, mut expr: Expr) -> Result<Expr> {
        self.enforce_node(&mut expr)?;
        Ok(expr)
    }

    fn enforce_node(&self, expr: &mut Expr) -> Result<()> {
        match expr {
            Expr::VectorSelector(vs) => self.enforce_matchers(&mut vs.matchers),
            Expr::MatrixSelector(ms) => self.enforce_matchers(&mut ms.selector.matchers),
            Expr::Unary(UnaryExpr { expr }) => self.enforce_node(expr),
            Expr::Paren(inner) => self.enforce_node(inner),
            Expr::Subquery(SubqueryExpr { expr, .. }) => self.enforce_node(expr),
            Expr::Binary(BinaryExpr { lhs, rhs, .. }) => {
                self.enforce_node(lhs)?;
                self.enforce_node(rhs)
            }
            Expr::Aggregate(AggregateExpr { param, expr, .. }) => {
                if let Some(param) = param {
                    self.enforce_node(param)?;
                }
                self.enforce_node(expr)
            }
            Expr::Call(Call { args, .. }) => {
                for arg in args.iter_mut() {
                    self.enforce_node(arg)?;
                }
                Ok(())
            }
            Expr::NumberLiteral(_) | Expr::StringLiteral(_) => Ok(()),
        }
    }

    /// Inject/verify the enforced matchers on a single matcher list.
    ///
    /// Used for selectors and, directly, for silence matcher lists.
    pub fn enforce_matchers(&self, targets: &mut Vec<Matcher>) -> Result<()> {
        for enforced in &self.matchers {
            let mut present = false;
            for existing in targets.iter().filter(|m| m.name() == enforced.name()) {
                if existing != enforced {
                    return Err(GateError::Conflict {
                        existing: existing.to_string(),
                        enforced: enforced.to_string(),
                    });
                }
                present = true;
            }
            if !present {
                trace!(matcher = %enforced, "injecting label matcher");
                targets.push(enforced.clone());
            }
        }
        Ok(())
    }
}
