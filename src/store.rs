use async_trait::async_trait;
use tracing::warn;

use crate::config::ConnectionConfig;
use crate::error::StoreMiddlewareError;
use crate::results::{ResultSet, StoreRow};
use crate::schema::{ReplicationSpec, RowData, SchemaDefinition, TableDescription, TableKey};
use crate::statement::Dialect;
use crate::types::{RowValues, StoreKind};

#[cfg(feature = "cassandra")]
use crate::cassandra::CassandraStore;
#[cfg(feature = "postgres")]
use crate::postgres::PostgresStore;

/// Split script text into executable lines.
///
/// One statement per line; blank lines and lines starting with `--` or `//` are skipped.
pub fn script_statements(script: &str) -> Vec<&str> {
    script
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("--") && !line.starts_with("//"))
        .collect()
}

/// One session to one store, plus the statement helpers built on top of it.
///
/// States are Unconnected and Connected. `connect` moves to Connected (and stays Unconnected on
/// failure); `disconnect` always ends Unconnected. Everything else requires Connected and fails
/// with `StoreMiddlewareError::NotConnected` otherwise.
#[async_trait]
pub trait Store: Send + Sync {
    fn kind(&self) -> StoreKind;

    fn config(&self) -> &ConnectionConfig;

    fn dialect(&self) -> &dyn Dialect;

    /// Open the session. A no-op if one is already open.
    ///
    /// # Errors
    /// `ConnectionError` if the store is unreachable, rejects the credentials, the target
    /// namespace does not exist, or the connect timeout elapses.
    async fn connect(&self) -> Result<(), StoreMiddlewareError>;

    /// Release the session and its transport. A no-op when not connected.
    async fn disconnect(&self);

    async fn is_connected(&self) -> bool;

    /// Submit one statement with its bound parameters.
    ///
    /// # Errors
    /// `NotConnected` without a session; `ParameterError` if a value cannot be bound;
    /// `ExecutionError` wrapping the driver error if the store rejects the statement.
    async fn execute(
        &self,
        statement: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, StoreMiddlewareError>;

    /// Run statements one at a time, in order, without parameters. Blank and comment entries are
    /// skipped. Stops at the first failure and returns it; earlier statements stay applied.
    ///
    /// # Errors
    /// The first error returned by `execute`.
    async fn execute_script(&self, statements: &[&str]) -> Result<(), StoreMiddlewareError> {
        self.ensure_connected().await?;
        for (idx, statement) in statements.iter().enumerate() {
            let statement = statement.trim();
            if statement.is_empty() || statement.starts_with("--") || statement.starts_with("//")
            {
                continue;
            }
            if let Err(err) = self.execute(statement, &[]).await {
                warn!(store = %self.kind(), index = idx, "script statement failed: {err}");
                return Err(err);
            }
        }
        Ok(())
    }

    /// # Errors
    /// `NotConnected` when no session is open.
    async fn ensure_connected(&self) -> Result<(), StoreMiddlewareError> {
        if self.is_connected().await {
            Ok(())
        } else {
            Err(StoreMiddlewareError::NotConnected(self.kind()))
        }
    }

    /// Execute and return the first row, if any.
    ///
    /// # Errors
    /// Same as `execute`.
    async fn fetch_first(
        &self,
        statement: &str,
        params: &[RowValues],
    ) -> Result<Option<StoreRow>, StoreMiddlewareError> {
        Ok(self.execute(statement, params).await?.into_iter().next())
    }

    /// # Errors
    /// `NotConnected`, builder errors, or the execution error.
    async fn create_namespace(
        &self,
        name: &str,
        replication: Option<&ReplicationSpec>,
    ) -> Result<(), StoreMiddlewareError> {
        self.ensure_connected().await?;
        let statement = self.dialect().build_create_namespace(name, replication)?;
        self.execute(&statement, &[]).await.map(drop)
    }

    /// # Errors
    /// `NotConnected`, builder errors, or the execution error.
    async fn create_table(
        &self,
        namespace: Option<&str>,
        table: &str,
        schema: &SchemaDefinition,
        key: &TableKey,
    ) -> Result<(), StoreMiddlewareError> {
        self.ensure_connected().await?;
        let statement = self
            .dialect()
            .build_create_table(namespace, table, schema, key)?;
        self.execute(&statement, &[]).await.map(drop)
    }

    /// # Errors
    /// `NotConnected`, builder errors, or the execution error.
    async fn insert(
        &self,
        namespace: Option<&str>,
        table: &str,
        row: &RowData,
    ) -> Result<ResultSet, StoreMiddlewareError> {
        self.ensure_connected().await?;
        let qp = self.dialect().build_insert(namespace, table, row)?;
        self.execute(&qp.query, &qp.params).await
    }

    /// The predicate is appended verbatim; it must come from trusted code.
    ///
    /// # Errors
    /// `NotConnected`, builder errors, or the execution error.
    async fn update(
        &self,
        namespace: Option<&str>,
        table: &str,
        row: &RowData,
        predicate: &str,
    ) -> Result<ResultSet, StoreMiddlewareError> {
        self.ensure_connected().await?;
        let qp = self
            .dialect()
            .build_update(namespace, table, row, predicate)?;
        self.execute(&qp.query, &qp.params).await
    }

    /// The predicate is appended verbatim; it must come from trusted code.
    ///
    /// # Errors
    /// `NotConnected`, builder errors, or the execution error.
    async fn delete(
        &self,
        namespace: Option<&str>,
        table: &str,
        predicate: &str,
    ) -> Result<ResultSet, StoreMiddlewareError> {
        self.ensure_connected().await?;
        let statement = self.dialect().build_delete(namespace, table, predicate)?;
        self.execute(&statement, &[]).await
    }

    /// # Errors
    /// `NotConnected`, builder errors, or the execution error.
    async fn drop_table(
        &self,
        namespace: Option<&str>,
        table: &str,
    ) -> Result<(), StoreMiddlewareError> {
        self.ensure_connected().await?;
        let statement = self.dialect().build_drop_table(namespace, table)?;
        self.execute(&statement, &[]).await.map(drop)
    }

    /// # Errors
    /// `NotConnected`, builder errors, or the execution error.
    async fn drop_namespace(&self, name: &str) -> Result<(), StoreMiddlewareError> {
        self.ensure_connected().await?;
        let statement = self.dialect().build_drop_namespace(name)?;
        self.execute(&statement, &[]).await.map(drop)
    }

    /// Read a table's columns and primary key back from the store's catalog.
    ///
    /// Returns `None` when the table does not exist. Feeding the description to
    /// `build_create_table` yields an equivalent create statement.
    ///
    /// # Errors
    /// `NotConnected`, `InvalidSchema` for malformed names, or the execution error.
    async fn describe_table(
        &self,
        namespace: Option<&str>,
        table: &str,
    ) -> Result<Option<TableDescription>, StoreMiddlewareError>;
}

/// Either backend behind one value, for callers that pick the store at runtime.
#[derive(Debug)]
pub enum AnyStore {
    #[cfg(feature = "cassandra")]
    Cassandra(CassandraStore),
    #[cfg(feature = "postgres")]
    Postgres(PostgresStore),
}

impl AnyStore {
    /// Create an unconnected store of the given kind.
    ///
    /// # Errors
    /// `ConfigError` if that backend is not enabled in this build.
    pub fn new(kind: StoreKind, config: ConnectionConfig) -> Result<Self, StoreMiddlewareError> {
        match kind {
            #[cfg(feature = "cassandra")]
            StoreKind::Cassandra => Ok(AnyStore::Cassandra(CassandraStore::new(config))),
            #[cfg(feature = "postgres")]
            StoreKind::Postgres => Ok(AnyStore::Postgres(PostgresStore::new(config))),
            #[allow(unreachable_patterns)]
            _ => {
                let _ = config;
                Err(StoreMiddlewareError::ConfigError(format!(
                    "{kind} support is not enabled in this build"
                )))
            }
        }
    }

    fn inner(&self) -> &dyn Store {
        match self {
            #[cfg(feature = "cassandra")]
            AnyStore::Cassandra(store) => store,
            #[cfg(feature = "postgres")]
            AnyStore::Postgres(store) => store,
        }
    }
}

#[async_trait]
impl Store for AnyStore {
    fn kind(&self) -> StoreKind {
        self.inner().kind()
    }

    fn config(&self) -> &ConnectionConfig {
        self.inner().config()
    }

    fn dialect(&self) -> &dyn Dialect {
        self.inner().dialect()
    }

    async fn connect(&self) -> Result<(), StoreMiddlewareError> {
        self.inner().connect().await
    }

    async fn disconnect(&self) {
        self.inner().disconnect().await;
    }

    async fn is_connected(&self) -> bool {
        self.inner().is_connected().await
    }

    async fn execute(
        &self,
        statement: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, StoreMiddlewareError> {
        self.inner().execute(statement, params).await
    }

    async fn execute_script(&self, statements: &[&str]) -> Result<(), StoreMiddlewareError> {
        self.inner().execute_script(statements).await
    }

    async fn describe_table(
        &self,
        namespace: Option<&str>,
        table: &str,
    ) -> Result<Option<TableDescription>, StoreMiddlewareError> {
        self.inner().describe_table(namespace, table).await
    }
}
