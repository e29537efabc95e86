//! Bulk writer: batched idempotent upserts into one generation.
//!
//! The writer never retries on its own; retry policy belongs to the
//! orchestrator. Each upsert deletes any previous document with the same
//! `post_id` before adding, so redelivering a batch overwrites instead of
//! duplicating.

use std::collections::BTreeSet;

use log::debug;
use tantivy::{DateTime, IndexWriter, TantivyDocument, Term};

use crate::search::lifecycle::{Generation, IndexLifecycle};
use crate::search::schema::PostSchema;
use crate::search::SearchError;
use crate::types::PostDoc;
use crate::utils::config::WRITER_MEMORY_BUDGET;

/// Result of one batch write. `Unreachable` means the destination itself is
/// gone (commit failed); the caller must treat it as fatal rather than spend
/// the retry budget against a dead index.
#[derive(Debug)]
pub enum BulkOutcome {
    AllSucceeded {
        max_post_id: u64,
    },
    PartialFailure {
        failed_ids: BTreeSet<u64>,
        cause: String,
    },
    Unreachable(String),
}

pub struct BulkWriter {
    writer: IndexWriter,
    schema: PostSchema,
    generation: Generation,
}

impl BulkWriter {
    /// Open a writer on one generation. Tantivy's writer lock also enforces
    /// single-builder ownership of the generation directory.
    pub fn open(lifecycle: &IndexLifecycle, generation: &Generation) -> Result<Self, SearchError> {
        let index = lifecycle.open_index(generation)?;
        let schema = PostSchema::for_schema(index.schema())?;
        let writer = index.writer(WRITER_MEMORY_BUDGET)?;
        Ok(BulkWriter {
            writer,
            schema,
            generation: generation.clone(),
        })
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    /// Upsert a batch and commit it as one unit.
    ///
    /// Per-document rejections are collected into `PartialFailure` (nothing
    /// is committed in that case; the batch is rolled back so a retry
    /// rewrites it whole). A failed commit is `Unreachable`.
    pub fn write_batch(&mut self, docs: &[PostDoc]) -> BulkOutcome {
        if docs.is_empty() {
            return BulkOutcome::AllSucceeded { max_post_id: 0 };
        }

        let mut failed_ids = BTreeSet::new();
        let mut cause = String::new();
        let mut max_post_id = 0u64;

        for doc in docs {
            let term = Term::from_field_u64(self.schema.post_id, doc.post_id);
            self.writer.delete_term(term);
            match self.writer.add_document(self.to_document(doc)) {
                Ok(_) => max_post_id = max_post_id.max(doc.post_id),
                Err(e) => {
                    failed_ids.insert(doc.post_id);
                    cause = e.to_string();
                }
            }
        }

        if !failed_ids.is_empty() {
            if let Err(e) = self.writer.rollback() {
                return BulkOutcome::Unreachable(e.to_string());
            }
            return BulkOutcome::PartialFailure { failed_ids, cause };
        }

        match self.writer.commit() {
            Ok(opstamp) => {
                debug!("committed {} docs (opstamp {})", docs.len(), opstamp);
                BulkOutcome::AllSucceeded { max_post_id }
            }
            Err(e) => BulkOutcome::Unreachable(e.to_string()),
        }
    }

    fn to_document(&self, doc: &PostDoc) -> TantivyDocument {
        let s = &self.schema;
        let mut out = TantivyDocument::default();
        out.add_u64(s.post_id, doc.post_id);
        out.add_text(s.author, &doc.author);
        out.add_text(s.permlink, &doc.permlink);
        out.add_text(s.category, &doc.category);
        out.add_i64(s.depth, doc.depth);
        out.add_i64(s.children, doc.children);
        out.add_f64(s.author_rep, doc.author_rep);
        out.add_f64(s.flag_weight, doc.flag_weight);
        out.add_i64(s.total_votes, doc.total_votes);
        out.add_i64(s.up_votes, doc.up_votes);
        out.add_text(s.title, &doc.title);
        out.add_text(s.img_url, &doc.img_url);
        out.add_f64(s.payout, doc.payout);
        out.add_f64(s.promoted, doc.promoted);
        out.add_date(s.created_at, DateTime::from_timestamp_secs(doc.created_at_ts));
        out.add_date(s.payout_at, DateTime::from_timestamp_secs(doc.payout_at_ts));
        out.add_date(s.updated_at, DateTime::from_timestamp_secs(doc.updated_at_ts));
        out.add_bool(s.is_paidout, doc.is_paidout);
        out.add_bool(s.is_nsfw, doc.is_nsfw);
        out.add_bool(s.is_declined, doc.is_declined);
        out.add_bool(s.is_full_power, doc.is_full_power);
        out.add_bool(s.is_hidden, doc.is_hidden);
        out.add_bool(s.is_grayed, doc.is_grayed);
        out.add_i64(s.rshares, doc.rshares);
        out.add_f64(s.sc_trend, doc.sc_trend);
        out.add_f64(s.sc_hot, doc.sc_hot);
        out.add_text(s.body, &doc.body);
        out.add_text(s.body_sanitized, &doc.body_sanitized);
        out.add_text(s.votes, &doc.votes);
        for tag in &doc.tags {
            out.add_text(s.tags, tag);
        }
        out.add_text(s.app, &doc.app);
        out.add_text(s.searchable, &doc.searchable);
        out
    }
}
