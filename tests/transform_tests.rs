//! Transform tests: body sanitization, tag/app parsing, reputation scoring,
//! and the full row -> document mapping.

mod common;

use common::sample_row;
use postmirror::pipeline::transform::{
    doc_from_row, parse_app, parse_tags, reputation_to_score, sanitize_post_body,
};
use serde_json::json;

// --- sanitize_post_body ---

#[test]
fn sanitize_strips_heading_marks() {
    assert_eq!(sanitize_post_body("#this is a h1"), "this is a h1");
}

#[test]
fn sanitize_keeps_code_fence_contents() {
    assert_eq!(
        sanitize_post_body("```lorem ipsum dolor sit amet``` There are many variations"),
        "lorem ipsum dolor sit amet There are many variations"
    );
}

#[test]
fn sanitize_strips_html_and_keeps_link_text() {
    assert_eq!(
        sanitize_post_body("<center>using [eSteem](https://play.google.com/store/apps)</center>"),
        "using eSteem"
    );
}

#[test]
fn sanitize_drops_images_and_emphasis() {
    let s = "![img](https://img.example/11.jpg)[Source](https://img.example/photo) \
             Lorem ipsum dolor sit amet ![img2](https://img.example/222.jpg) *foo* **bar** baz";
    assert_eq!(
        sanitize_post_body(s),
        "Source Lorem ipsum dolor sit amet foo bar baz"
    );
}

#[test]
fn sanitize_collapses_whitespace() {
    assert_eq!(sanitize_post_body("  a\n\n  b\t c  "), "a b c");
}

// --- parse_tags ---

#[test]
fn tags_from_bare_string() {
    assert_eq!(parse_tags(Some(&json!("writing"))), vec!["writing"]);
}

#[test]
fn tags_keep_only_string_members() {
    let tags = json!(["news", "steemit", 3, {"5": {}}, {}, "esteem"]);
    assert_eq!(
        parse_tags(Some(&tags)),
        vec!["news", "steemit", "esteem"]
    );
}

#[test]
fn tags_from_clean_list() {
    let tags = json!(["dlive", "dlive-broadcast", "game", "DLIVEGAMING"]);
    assert_eq!(
        parse_tags(Some(&tags)),
        vec!["dlive", "dlive-broadcast", "game", "DLIVEGAMING"]
    );
}

#[test]
fn tags_from_garbage_are_empty() {
    assert!(parse_tags(Some(&json!(2))).is_empty());
    assert!(parse_tags(None).is_empty());
}

// --- parse_app ---

#[test]
fn app_variants() {
    assert_eq!(parse_app(None), "");
    assert_eq!(parse_app(Some(&json!({}))), "");
    assert_eq!(parse_app(Some(&json!({"name": "esteem"}))), "esteem");
    assert_eq!(parse_app(Some(&json!({"version": 2}))), "");
    assert_eq!(
        parse_app(Some(&json!({"name": "esteem", "version": 2}))),
        "esteem 2"
    );
    assert_eq!(parse_app(Some(&json!("esteem 1.1.1"))), "esteem 1.1.1");
}

// --- reputation_to_score ---

#[test]
fn reputation_zero_is_baseline() {
    assert_eq!(reputation_to_score(0.0), 25.0);
}

#[test]
fn reputation_score_passes_through() {
    assert_eq!(reputation_to_score(65.5), 65.5);
}

#[test]
fn reputation_raw_value_is_scored() {
    // log10(1e12) - 9 = 3; 3 * 9 + 25 = 52
    let score = reputation_to_score(1_000_000_000_000.0);
    assert!((score - 52.0).abs() < 1e-9, "got {score}");
}

#[test]
fn reputation_negative_raw_value_scores_below_baseline() {
    let score = reputation_to_score(-1_000_000_000_000.0);
    assert!(score < 25.0, "got {score}");
}

// --- doc_from_row ---

#[test]
fn doc_from_row_maps_payload_fields() {
    let doc = doc_from_row(&sample_row(42)).unwrap();
    assert_eq!(doc.post_id, 42);
    assert_eq!(doc.tags, vec!["news", "steemit"]);
    assert_eq!(doc.app, "esteem 1.6");
    assert_eq!(doc.body_sanitized, "Hello world from post 42");
    assert_eq!(doc.searchable, "Post 42 | Hello world from post 42");
    // 2018-05-01T12:00:00 UTC
    assert_eq!(doc.created_at_ts, 1_525_176_000);
}

#[test]
fn doc_from_row_rejects_malformed_payload() {
    let mut row = sample_row(7);
    row.json = "{not json".into();
    assert!(doc_from_row(&row).is_err());
}

#[test]
fn doc_from_row_tolerates_empty_payload() {
    let mut row = sample_row(7);
    row.json = String::new();
    let doc = doc_from_row(&row).unwrap();
    assert!(doc.tags.is_empty());
    assert_eq!(doc.app, "");
}

#[test]
fn doc_from_row_rejects_unparseable_timestamp() {
    let mut row = sample_row(7);
    row.created_at = "not a date".into();
    assert!(doc_from_row(&row).is_err());
}
