//! Database module for PostgreSQL connectivity
//!
//! Pools are created here and handed to `execution::PostgresHandle`; the
//! caller owns and closes them.

pub mod connection;

pub use connection::{init_pool, DbPool};
