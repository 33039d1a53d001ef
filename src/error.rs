use thiserror::Error;

#[cfg(feature = "cassandra")]
use scylla::transport::errors::QueryError;

use crate::types::StoreKind;

/// The driver error a store returned for a rejected or failed statement.
///
/// Kept as-is so callers can inspect it through `std::error::Error::source`.
#[derive(Debug, Error)]
pub enum NativeError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),

    #[cfg(feature = "cassandra")]
    #[error(transparent)]
    Cassandra(#[from] QueryError),
}

#[derive(Debug, Error)]
pub enum StoreMiddlewareError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Not connected: no open {0} session")]
    NotConnected(StoreKind),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Invalid row: {0}")]
    InvalidRow(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("{store} execution error: {source}")]
    ExecutionError {
        store: StoreKind,
        #[source]
        source: NativeError,
    },
}

impl StoreMiddlewareError {
    #[cfg(feature = "postgres")]
    pub(crate) fn postgres(err: tokio_postgres::Error) -> Self {
        StoreMiddlewareError::ExecutionError {
            store: StoreKind::Postgres,
            source: NativeError::Postgres(err),
        }
    }

    #[cfg(feature = "cassandra")]
    pub(crate) fn cassandra(err: QueryError) -> Self {
        StoreMiddlewareError::ExecutionError {
            store: StoreKind::Cassandra,
            source: NativeError::Cassandra(err),
        }
    }

    /// True for the error returned when a session operation runs before `connect`.
    #[must_use]
    pub fn is_not_connected(&self) -> bool {
        matches!(self, StoreMiddlewareError::NotConnected(_))
    }
}
