//! Enforcement vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use promguard_core::promql::parse_expr;
use promguard_core::{Enforcer, Matcher, Result};

mod vector_loader;
use vector_loader::EnforceVector;

fn enforce_text(tenants: &[String], query: &str) -> Result<String> {
    let matcher = Matcher::for_tenant("tenant", tenants)?;
    let enforcer = Enforcer::new(vec![matcher]);
    let expr = parse_expr(query)?;
    Ok(enforcer.enforce(expr)?.to_string())
}

#[test]
fn enforce_vectors() {
    let vectors: Vec<EnforceVector> = vector_loader::load("enforce.json");
    assert!(!vectors.is_empty());

    for v in vectors {
        let res = enforce_text(&v.tenants, &v.query);

        if let Some(err) = v.expect_error {
            let e = res.expect_err("expected error");
            assert_eq!(e.client_code().as_str(), err.code, "vector={}", v.description);
            continue;
        }

        let out = res.unwrap_or_else(|e| panic!("vector={}: {e}", v.description));
        let expect = v.expect.expect("missing expect");
        assert_eq!(out, expect, "vector={}", v.description);
    }
}

#[test]
fn enforcement_is_idempotent() {
    let vectors: Vec<EnforceVector> = vector_loader::load("enforce.json");

    for v in vectors.into_iter().filter(|v| v.expect.is_some()) {
        let once = enforce_text(&v.tenants, &v.query).unwrap();
        let twice = enforce_text(&v.tenants, &once).unwrap();
        assert_eq!(once, twice, "vector={}", v.description);

        // AST level as well: re-enforcing the parsed output changes nothing.
        let enforcer = Enforcer::new(vec![Matcher::for_tenant("tenant", &v.tenants).unwrap()]);
        let parsed = parse_expr(&once).unwrap();
        assert_eq!(enforcer.enforce(parsed.clone()).unwrap(), parsed, "vector={}", v.description);
    }
}

#[test]
fn every_selector_carries_the_tenant_matcher() {
    use promguard_core::promql::ast::Expr;

    fn selectors<'a>(e: &'a Expr, out: &mut Vec<&'a [Matcher]>) {
        match e {
            Expr::VectorSelector(vs) => out.push(&vs.matchers),
            Expr::MatrixSelector(ms) => out.push(&ms.selector.matchers),
            Expr::Unary(u) => selectors(&u.expr, out),
            Expr::Paren(inner) => selectors(inner, out),
            Expr::Subquery(sq) => selectors(&sq.expr, out),
            Expr::Binary(b) => {
                selectors(&b.lhs, out);
                selectors(&b.rhs, out);
            }
            Expr::Aggregate(a) => {
                if let Some(p) = &a.param {
                    selectors(p, out);
                }
                selectors(&a.expr, out);
            }
            Expr::Call(c) => c.args.iter().for_each(|a| selectors(a, out)),
            Expr::NumberLiteral(_) | Expr::StringLiteral(_) => {}
        }
    }

    let tenants = vec!["a".to_string(), "b".to_string()];
    let matcher = Matcher::for_tenant("tenant", &tenants).unwrap();
    let enforcer = Enforcer::new(vec![matcher.clone()]);

    let query = r#"
        histogram_quantile(0.9, sum by (le) (rate(req_bucket{job="api"}[5m])))
          > bool on (job) group_right (instance)
        (count_values("v", build_info) unless absent(up offset 1d))
        or label_replace(max_over_time(up[1h:5m]), "x", "$1", "job", "(.*)")
    "#;
    let out = enforcer.enforce(parse_expr(query).unwrap()).unwrap();

    let mut found = Vec::new();
    selectors(&out, &mut found);
    assert_eq!(found.len(), 4);
    for matchers in found {
        assert!(matchers.contains(&matcher), "selector missing tenant matcher: {matchers:?}");
    }
}

#[test]
fn conflict_error_names_both_matchers() {
    let err = enforce_text(&["a".to_string()], r#"foo{tenant="b"}"#).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains(r#"tenant="b""#), "{msg}");
    assert!(msg.contains(r#"tenant="a""#), "{msg}");
}

#[test]
fn flat_matcher_list_follows_the_same_policy() {
    use promguard_core::MatchKind;

    let enforcer = Enforcer::new(vec![Matcher::for_tenant("tenant", &["a".to_string()]).unwrap()]);

    let mut list = vec![Matcher::new("alertname", MatchKind::Equal, "Down").unwrap()];
    enforcer.enforce_matchers(&mut list).unwrap();
    assert_eq!(list.len(), 2);
    enforcer.enforce_matchers(&mut list).unwrap();
    assert_eq!(list.len(), 2);

    let mut foreign = vec![Matcher::new("tenant", MatchKind::Equal, "b").unwrap()];
    assert!(enforcer.enforce_matchers(&mut foreign).is_err());
}
