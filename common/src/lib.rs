pub mod domain;
pub mod infrastructure;
pub mod test_utils;

// Persisted article field names

pub const ARTICLES_TABLE_NAME: &str = "articles";
pub const ID_FIELD_NAME: &str = "id";
pub const CREATED_FIELD_NAME: &str = "created_at";

// expose domain module

pub use domain::*;

// expose database module

pub use infrastructure::database;
