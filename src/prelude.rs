//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and traits
//! to make it easier to get started with the library.

pub use crate::config::{ConfigSource, ConnectionConfig};
pub use crate::error::StoreMiddlewareError;
pub use crate::results::{ResultSet, StoreRow};
pub use crate::schema::{ReplicationSpec, RowData, SchemaDefinition, TableDescription, TableKey};
pub use crate::statement::{CqlDialect, Dialect, PostgresDialect, QueryAndParams};
pub use crate::store::{AnyStore, Store, script_statements};
pub use crate::types::{RowValues, StoreKind};

#[cfg(feature = "cassandra")]
pub use crate::cassandra::CassandraStore;
#[cfg(feature = "postgres")]
pub use crate::postgres::PostgresStore;
