//! Database layer for the forum.
//!
//! - [`DatabaseConnection`]: a SQLite pool with foreign keys enforced
//! - [`TransactionScope`]: explicit begin/commit/rollback, including
//!   `BEGIN IMMEDIATE` for read-modify-write sequences
//! - [`Migrator`]: ordered, named schema migrations recorded in the database
//!
//! Queries are built with `sea-query` and executed through `sqlx`.

pub mod connection;
pub mod migrations;
pub mod timestamp;
pub mod transaction;

pub use connection::{DatabaseConnection, is_unique_violation};
pub use migrations::{Migration, Migrator};
pub use transaction::{TransactionMode, TransactionScope, TransactionState};
