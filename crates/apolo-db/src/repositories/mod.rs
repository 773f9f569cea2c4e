//! Repository implementations
//!
//! Concrete PostgreSQL-backed storage for the collaborator traits defined
//! in apolo-core, using sqlx runtime queries.

pub mod cdr_repo;

pub use cdr_repo::PgCdrStorage;
