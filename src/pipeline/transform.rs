//! Row -> document transform. Pure and side-effect-free, so batches are
//! mapped on the worker pool in whatever order the pool picks.
//!
//! A malformed row is the row's problem: it is skipped with a warning and
//! never blocks the rest of its batch.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime};
use rayon::prelude::*;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

use crate::types::{PostDoc, SourceRow};

/// Transform one batch on the pool. Rows that fail to transform are dropped
/// with a logged warning; the surviving documents keep source order.
pub fn transform_batch(pool: &rayon::ThreadPool, rows: &[SourceRow]) -> Vec<PostDoc> {
    pool.install(|| {
        rows.par_iter()
            .filter_map(|row| match doc_from_row(row) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    log::warn!("skipping post {}: {:#}", row.post_id, e);
                    None
                }
            })
            .collect()
    })
}

/// Build the search document for one row.
pub fn doc_from_row(row: &SourceRow) -> Result<PostDoc> {
    let payload: Value = if row.json.trim().is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&row.json).context("malformed json payload")?
    };
    let tags = parse_tags(payload.get("tags"));
    let app = parse_app(payload.get("app"));
    let body_sanitized = sanitize_post_body(&row.body);

    Ok(PostDoc {
        post_id: row.post_id,
        author: row.author.clone(),
        permlink: row.permlink.clone(),
        category: row.category.clone(),
        depth: row.depth,
        children: row.children,
        author_rep: reputation_to_score(row.author_rep),
        flag_weight: row.flag_weight,
        total_votes: row.total_votes,
        up_votes: row.up_votes,
        title: row.title.clone(),
        img_url: row.img_url.clone(),
        payout: row.payout,
        promoted: row.promoted,
        created_at_ts: parse_timestamp(&row.created_at).context("created_at")?,
        payout_at_ts: parse_timestamp(&row.payout_at).context("payout_at")?,
        updated_at_ts: parse_timestamp(&row.updated_at).context("updated_at")?,
        is_paidout: row.is_paidout,
        is_nsfw: row.is_nsfw,
        is_declined: row.is_declined,
        is_full_power: row.is_full_power,
        is_hidden: row.is_hidden,
        is_grayed: row.is_grayed,
        rshares: row.rshares,
        sc_trend: row.sc_trend,
        sc_hot: row.sc_hot,
        body: row.body.clone(),
        searchable: format!("{} | {}", row.title, body_sanitized),
        body_sanitized,
        votes: row.votes.clone(),
        tags,
        app,
    })
}

/// Parse a source timestamp (RFC 3339, or a bare `YYYY-MM-DD HH:MM:SS` /
/// `YYYY-MM-DDTHH:MM:SS` treated as UTC) into epoch seconds.
pub fn parse_timestamp(s: &str) -> Result<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc().timestamp());
        }
    }
    anyhow::bail!("unparseable timestamp {s:?}")
}

/// Strip markdown and HTML down to plain text for the analyzed body field:
/// images dropped, link text kept, tags removed, emphasis marks removed,
/// whitespace collapsed.
pub fn sanitize_post_body(body: &str) -> String {
    static IMAGE: OnceLock<Regex> = OnceLock::new();
    static LINK: OnceLock<Regex> = OnceLock::new();
    static TAG: OnceLock<Regex> = OnceLock::new();
    static SPACE: OnceLock<Regex> = OnceLock::new();

    let image = IMAGE.get_or_init(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("image regex"));
    let link = LINK.get_or_init(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("link regex"));
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag regex"));
    let space = SPACE.get_or_init(|| Regex::new(r"\s+").expect("space regex"));

    let s = image.replace_all(body, "");
    let s = link.replace_all(&s, "$1");
    let s = tag.replace_all(&s, "");
    let s: String = s.chars().filter(|c| !matches!(c, '*' | '#' | '`' | '~')).collect();
    space.replace_all(&s, " ").trim().to_string()
}

/// Tags from the raw payload: a bare string is one tag, a list keeps only
/// its string members, anything else is no tags.
pub fn parse_tags(tags: Option<&Value>) -> Vec<String> {
    match tags {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

/// App attribution from the raw payload: `{name, version}` objects become
/// `"name version"`, scalars are stringified, a nameless object is empty.
pub fn parse_app(app: Option<&Value>) -> String {
    match app {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Object(map)) => match map.get("name").and_then(Value::as_str) {
            Some(name) => {
                let version = match map.get("version") {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    _ => String::new(),
                };
                format!("{name} {version}").trim().to_string()
            }
            None => String::new(),
        },
        _ => String::new(),
    }
}

/// Convert a raw reputation value into the two-digit reputation score.
/// Values already in score form (10..100) pass through.
pub fn reputation_to_score(rep: f64) -> f64 {
    if (10.0..100.0).contains(&rep) {
        return rep;
    }
    if rep == 0.0 {
        return 25.0;
    }
    let mut score = (rep.abs().log10() - 9.0).max(0.0);
    if rep < 0.0 {
        score = -score;
    }
    score * 9.0 + 25.0
}
