//! Destination index: schema, alias resolution, generation lifecycle, and
//! the bulk writer.

pub mod aliases;
mod error;
pub mod lifecycle;
pub mod schema;
pub mod writer;

pub use aliases::{Aliases, ALIASES_FILENAME, BUILDING_ALIAS};
pub use error::SearchError;
pub use lifecycle::{Generation, IndexLifecycle};
pub use schema::PostSchema;
pub use writer::{BulkOutcome, BulkWriter};
