//! Literal quoting against hostile payloads.
//!
//! Every generated payload is dollar-quoted and read back with the same rule
//! the server applies; the body must come back unchanged with nothing left
//! over.

mod common;
use common::*;

use carto_sql_core::builder::{col, table};
use carto_sql_core::encode::{dollar_quote, negotiate_tag, quote_string};

const FRAGMENTS: &[&str] = &["$", "cartodb", "0", "1", "$cartodb$", "$cartodb0$", "x", "$$", "'"];

fn payloads(max_len: usize) -> Vec<String> {
    let mut all = vec![String::new()];
    let mut frontier = vec![String::new()];
    for _ in 0..max_len {
        let mut next = vec![];
        for prefix in &frontier {
            for fragment in FRAGMENTS {
                next.push(format!("{prefix}{fragment}"));
            }
        }
        all.extend(next.iter().cloned());
        frontier = next;
    }
    all
}

#[test]
fn dollar_quote_never_closes_early() {
    for payload in payloads(4) {
        let quoted = dollar_quote(&payload);
        let (body, rest) = read_dollar_quoted(&quoted)
            .unwrap_or_else(|| panic!("unreadable literal for {payload:?}: {quoted}"));
        assert_eq!(body, payload, "literal {quoted} closed early");
        assert!(rest.is_empty(), "literal {quoted} left {rest:?}");
    }
}

#[test]
fn negotiated_tag_is_smallest_safe_one() {
    assert_eq!(negotiate_tag("plain"), "$cartodb$");
    assert_eq!(negotiate_tag("a$cartodb$b"), "$cartodb0$");
    assert_eq!(negotiate_tag("$cartodb$ and $cartodb0$"), "$cartodb1$");
    // A trailing `$cartodb` would complete into a closing tag.
    assert_eq!(negotiate_tag("ends with $cartodb"), "$cartodb0$");
}

#[test]
fn control_characters_are_escaped_before_quoting() {
    let quoted = quote_string("line\nbreak\tand\\slash");
    assert_eq!(quoted, "$cartodb$line\\nbreak\\tand\\\\slash$cartodb$");
}

#[test]
fn injection_attempt_stays_inside_literal() {
    let payload = "x$cartodb$); DROP TABLE users; --";
    let op = table("users")
        .select(&["id"])
        .where_clause(col("name").eq(payload))
        .build();
    let sql = to_bare_sql(&op);
    let args = execute_args(&sql);
    assert_eq!(args.len(), 1);
    let (body, rest) = read_dollar_quoted(args[0]).unwrap();
    assert_eq!(body, payload);
    assert!(rest.is_empty());
}
