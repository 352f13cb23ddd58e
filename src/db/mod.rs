//! Database layer: MongoDB wrapper and document schemas

pub mod mongo;
pub mod schemas;

pub use mongo::{is_duplicate_key_error, IntoIndexes, MongoClient, MongoCollection, MutMetadata};
