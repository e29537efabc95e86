//! Tantivy schema for post documents.
//!
//! Field-for-field port of the posts mapping: ids and scores as numerics,
//! dates as date fields, free text analyzed, reference-only fields (permlink,
//! img_url, votes) stored but not indexed. `post_id` is FAST so the
//! max-committed-id query can read it per segment.

use tantivy::schema::{FAST, Field, INDEXED, STORED, STRING, Schema, TEXT};

use crate::search::SearchError;

/// Schema plus field handles for building and querying post documents.
#[derive(Clone)]
pub struct PostSchema {
    schema: Schema,
    pub post_id: Field,
    pub author: Field,
    pub permlink: Field,
    pub category: Field,
    pub depth: Field,
    pub children: Field,
    pub author_rep: Field,
    pub flag_weight: Field,
    pub total_votes: Field,
    pub up_votes: Field,
    pub title: Field,
    pub img_url: Field,
    pub payout: Field,
    pub promoted: Field,
    pub created_at: Field,
    pub payout_at: Field,
    pub updated_at: Field,
    pub is_paidout: Field,
    pub is_nsfw: Field,
    pub is_declined: Field,
    pub is_full_power: Field,
    pub is_hidden: Field,
    pub is_grayed: Field,
    pub rshares: Field,
    pub sc_trend: Field,
    pub sc_hot: Field,
    pub body: Field,
    pub body_sanitized: Field,
    pub votes: Field,
    pub tags: Field,
    pub app: Field,
    pub searchable: Field,
}

impl PostSchema {
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Build the canonical post schema.
    pub fn build() -> PostSchema {
        let mut b = Schema::builder();

        let post_id = b.add_u64_field("post_id", INDEXED | STORED | FAST);
        let author = b.add_text_field("author", STRING | STORED);
        let permlink = b.add_text_field("permlink", STORED);
        let category = b.add_text_field("category", STRING | STORED);
        let depth = b.add_i64_field("depth", INDEXED | STORED);
        let children = b.add_i64_field("children", STORED);
        let author_rep = b.add_f64_field("author_rep", STORED);
        let flag_weight = b.add_f64_field("flag_weight", STORED);
        let total_votes = b.add_i64_field("total_votes", STORED);
        let up_votes = b.add_i64_field("up_votes", STORED);
        let title = b.add_text_field("title", TEXT | STORED);
        let img_url = b.add_text_field("img_url", STORED);
        let payout = b.add_f64_field("payout", STORED);
        let promoted = b.add_f64_field("promoted", STORED);
        let created_at = b.add_date_field("created_at", INDEXED | STORED);
        let payout_at = b.add_date_field("payout_at", STORED);
        let updated_at = b.add_date_field("updated_at", STORED);
        let is_paidout = b.add_bool_field("is_paidout", INDEXED | STORED);
        let is_nsfw = b.add_bool_field("is_nsfw", INDEXED | STORED);
        let is_declined = b.add_bool_field("is_declined", INDEXED | STORED);
        let is_full_power = b.add_bool_field("is_full_power", INDEXED | STORED);
        let is_hidden = b.add_bool_field("is_hidden", INDEXED | STORED);
        let is_grayed = b.add_bool_field("is_grayed", INDEXED | STORED);
        let rshares = b.add_i64_field("rshares", STORED);
        let sc_trend = b.add_f64_field("sc_trend", STORED);
        let sc_hot = b.add_f64_field("sc_hot", STORED);
        let body = b.add_text_field("body", TEXT | STORED);
        let body_sanitized = b.add_text_field("body_sanitized", TEXT);
        let votes = b.add_text_field("votes", STORED);
        let tags = b.add_text_field("tags", TEXT | STORED);
        let app = b.add_text_field("app", STRING | STORED);
        let searchable = b.add_text_field("searchable", TEXT);

        PostSchema {
            schema: b.build(),
            post_id,
            author,
            permlink,
            category,
            depth,
            children,
            author_rep,
            flag_weight,
            total_votes,
            up_votes,
            title,
            img_url,
            payout,
            promoted,
            created_at,
            payout_at,
            updated_at,
            is_paidout,
            is_nsfw,
            is_declined,
            is_full_power,
            is_hidden,
            is_grayed,
            rshares,
            sc_trend,
            sc_hot,
            body,
            body_sanitized,
            votes,
            tags,
            app,
            searchable,
        }
    }

    /// Rebind field handles against the schema of an already-open index.
    /// Fails when the on-disk index was built with a different mapping.
    pub fn for_schema(schema: Schema) -> Result<PostSchema, SearchError> {
        let field = |name: &str| {
            schema
                .get_field(name)
                .map_err(|_| SearchError::SchemaMismatch(format!("missing field {name}")))
        };
        Ok(PostSchema {
            post_id: field("post_id")?,
            author: field("author")?,
            permlink: field("permlink")?,
            category: field("category")?,
            depth: field("depth")?,
            children: field("children")?,
            author_rep: field("author_rep")?,
            flag_weight: field("flag_weight")?,
            total_votes: field("total_votes")?,
            up_votes: field("up_votes")?,
            title: field("title")?,
            img_url: field("img_url")?,
            payout: field("payout")?,
            promoted: field("promoted")?,
            created_at: field("created_at")?,
            payout_at: field("payout_at")?,
            updated_at: field("updated_at")?,
            is_paidout: field("is_paidout")?,
            is_nsfw: field("is_nsfw")?,
            is_declined: field("is_declined")?,
            is_full_power: field("is_full_power")?,
            is_hidden: field("is_hidden")?,
            is_grayed: field("is_grayed")?,
            rshares: field("rshares")?,
            sc_trend: field("sc_trend")?,
            sc_hot: field("sc_hot")?,
            body: field("body")?,
            body_sanitized: field("body_sanitized")?,
            votes: field("votes")?,
            tags: field("tags")?,
            app: field("app")?,
            searchable: field("searchable")?,
            schema,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_has_key_fields() {
        let s = PostSchema::build();
        assert!(s.schema().get_field("post_id").is_ok());
        assert!(s.schema().get_field("searchable").is_ok());
        assert!(s.schema().get_field("body_sanitized").is_ok());
    }

    #[test]
    fn for_schema_round_trip() {
        let built = PostSchema::build();
        let rebound = PostSchema::for_schema(built.schema().clone()).unwrap();
        assert_eq!(rebound.post_id, built.post_id);
        assert_eq!(rebound.tags, built.tags);
    }

    #[test]
    fn for_schema_rejects_foreign_schema() {
        let mut b = Schema::builder();
        b.add_text_field("something_else", TEXT);
        assert!(PostSchema::for_schema(b.build()).is_err());
    }
}
