//! # Taskboard Shared Library
//!
//! Domain core of the Taskboard task-management backend: users register and
//! log in, create tasks, assign them to each other and complete them.
//!
//! ## Module Organization
//!
//! - `models`: users, tasks and their SQL
//! - `repository`: persistence ports plus the PostgreSQL and in-memory stores
//! - `db`: connection pool and migrations
//! - `auth`: password hashing, JWT, request context, task authorization
//! - `notify`: fire-and-forget registration notifications
//! - `services`: the user and task workflows
//! - `error`: the domain error taxonomy

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod repository;
pub mod services;

pub use error::{DomainError, DomainResult, ErrorKind};

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
