/// Database plumbing: connection pool and schema migrations
///
/// SQL for individual tables lives on the models in [`crate::models`].

pub mod migrations;
pub mod pool;
