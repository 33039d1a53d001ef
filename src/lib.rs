//! Typed session and statement-builder layer over Cassandra/ScyllaDB and PostgreSQL.
//!
//! A [`Store`] owns one session to one store. The [`Dialect`] builders render DDL/DML text from
//! structured inputs ([`SchemaDefinition`], [`RowData`]) and always hand values back as bound
//! parameters, never formatted into the statement.
//!
//! ```no_run
//! use store_middleware::prelude::*;
//!
//! # async fn demo() -> Result<(), StoreMiddlewareError> {
//! let config = ConnectionConfig::new("localhost", 9042, "cassandra", "cassandra");
//! let store = AnyStore::new(StoreKind::Cassandra, config)?;
//! store.connect().await?;
//! store.create_namespace("mykeyspace", None).await?;
//! let schema = SchemaDefinition::new().column("id", "int").column("name", "text");
//! store
//!     .create_table(Some("mykeyspace"), "people", &schema, &TableKey::partition("id"))
//!     .await?;
//! let row = RowData::new().value("id", 2).value("name", "mohamed");
//! store.insert(Some("mykeyspace"), "people", &row).await?;
//! store.disconnect().await;
//! # Ok(())
//! # }
//! ```

#[cfg(not(any(feature = "postgres", feature = "cassandra")))]
compile_error!("enable at least one backend feature: `postgres` or `cassandra`");

pub mod config;
pub mod error;
pub mod prelude;
pub mod results;
pub mod schema;
pub mod statement;
pub mod store;
pub mod types;

#[cfg(feature = "cassandra")]
pub mod cassandra;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use config::{ConfigSource, ConnectionConfig};
pub use error::{NativeError, StoreMiddlewareError};
pub use results::{ResultSet, StoreRow};
pub use schema::{ReplicationSpec, RowData, SchemaDefinition, TableDescription, TableKey};
pub use statement::{CqlDialect, Dialect, PostgresDialect, QueryAndParams};
pub use store::{AnyStore, Store, script_statements};
pub use types::{PlaceholderStyle, RowValues, StoreKind};

#[cfg(feature = "cassandra")]
pub use cassandra::CassandraStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresStore;
