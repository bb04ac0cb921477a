#![allow(clippy::unwrap_used)]

use promguard_gateway::proxy::params::RequestParams;

#[test]
fn body_values_come_before_url_values() {
    let p = RequestParams::parse(Some("query=url&x=1"), Some(b"query=body".as_slice()));
    assert_eq!(p.first("query"), Some("body"));
    assert_eq!(p.all("query"), ["body", "url"]);
    assert_eq!(p.first("x"), Some("1"));
    assert_eq!(p.first("missing"), None);
}

#[test]
fn set_clears_both_sources_and_writes_to_the_body() {
    let mut p = RequestParams::parse(Some("query=url&x=1"), Some(b"query=body&y=2".as_slice()));
    p.set("query", ["up".to_owned()]);
    assert_eq!(p.query_string(), "x=1");
    assert_eq!(p.form_body().unwrap(), "y=2&query=up");
}

#[test]
fn set_without_body_writes_to_the_url() {
    let mut p = RequestParams::parse(Some("match%5B%5D=a&match%5B%5D=b"), None);
    p.set("match[]", ["{x=\"1\"}".to_owned()]);
    assert!(!p.has_form());
    assert_eq!(p.all("match[]"), ["{x=\"1\"}"]);
    assert_eq!(p.form_body(), None);
}

#[test]
fn remove_drops_every_occurrence() {
    let mut p = RequestParams::parse(Some("ns=a&ns=b&q=1"), Some(b"ns=c".as_slice()));
    p.remove("ns");
    assert!(p.all("ns").is_empty());
    assert_eq!(p.query_string(), "q=1");
    assert_eq!(p.form_body().unwrap(), "");
}
