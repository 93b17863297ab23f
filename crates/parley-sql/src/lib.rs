//! Parley SQL - local database access for generated queries
//!
//! This crate provides:
//! - Table descriptions (DDL plus sample rows) for prompts
//! - Execution of generated SQL text with printable results
//! - A read-only guard for model-written statements

pub mod database;
pub mod error;
pub mod guard;
pub mod value;

pub use database::{DatabaseOptions, QueryResult, SqlDatabase};
pub use error::DatabaseError;
pub use guard::check_read_only;
pub use value::SqlValue;
