use std::sync::Arc;

use async_trait::async_trait;
use scylla::{Session, SessionBuilder};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::query::{CatalogColumn, build_result_set, describe_from_catalog};
use crate::config::ConnectionConfig;
use crate::error::StoreMiddlewareError;
use crate::results::ResultSet;
use crate::schema::TableDescription;
use crate::statement::{CqlDialect, Dialect, check_identifier};
use crate::store::Store;
use crate::types::{RowValues, StoreKind};

const DESCRIBE_COLUMNS: &str = "SELECT column_name, type, kind, position \
     FROM system_schema.columns WHERE keyspace_name = ? AND table_name = ?";

/// Session manager for a Cassandra/ScyllaDB cluster.
///
/// Holds at most one `scylla::Session`. The mutex serializes connect/disconnect; executions
/// clone the `Arc` out of it and run concurrently, which the driver supports.
pub struct CassandraStore {
    config: ConnectionConfig,
    session: Mutex<Option<Arc<Session>>>,
}

impl CassandraStore {
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            session: Mutex::new(None),
        }
    }

    async fn session(&self) -> Result<Arc<Session>, StoreMiddlewareError> {
        self.session
            .lock()
            .await
            .clone()
            .ok_or(StoreMiddlewareError::NotConnected(StoreKind::Cassandra))
    }

    async fn open_session(&self) -> Result<Session, StoreMiddlewareError> {
        let config = &self.config;
        let node = format!("{}:{}", config.host(), config.port());
        info!("Connecting to Cassandra node: {node}");

        let mut builder = SessionBuilder::new()
            .known_node(&node)
            .connection_timeout(config.connect_timeout());

        // Clusters without authentication are configured with empty credentials
        if !config.username().is_empty() {
            builder = builder.user(config.username(), config.password());
        }
        if let Some(keyspace) = config.namespace() {
            builder = builder.use_keyspace(keyspace, false);
        }

        match tokio::time::timeout(config.connect_timeout(), builder.build()).await {
            Ok(Ok(session)) => Ok(session),
            Ok(Err(e)) => Err(StoreMiddlewareError::ConnectionError(format!(
                "Failed to connect to Cassandra at {node}: {e}"
            ))),
            Err(_) => Err(StoreMiddlewareError::ConnectionError(format!(
                "Timed out after {:?} connecting to Cassandra at {node}",
                config.connect_timeout()
            ))),
        }
    }
}

impl std::fmt::Debug for CassandraStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CassandraStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Store for CassandraStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Cassandra
    }

    fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn dialect(&self) -> &dyn Dialect {
        &CqlDialect
    }

    async fn connect(&self) -> Result<(), StoreMiddlewareError> {
        let mut slot = self.session.lock().await;
        if slot.is_some() {
            debug!("Cassandra session already open");
            return Ok(());
        }
        let session = self.open_session().await?;
        *slot = Some(Arc::new(session));
        info!("Connected to Cassandra at {}:{}", self.config.host(), self.config.port());
        Ok(())
    }

    async fn disconnect(&self) {
        // Dropping the last handle closes the driver's connection pool
        if self.session.lock().await.take().is_some() {
            info!("Disconnected from Cassandra at {}:{}", self.config.host(), self.config.port());
        }
    }

    async fn is_connected(&self) -> bool {
        self.session.lock().await.is_some()
    }

    async fn execute(
        &self,
        statement: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, StoreMiddlewareError> {
        let session = self.session().await?;
        debug!(params = params.len(), "cql: {statement}");
        let result = if params.is_empty() {
            session.query(statement, ()).await
        } else {
            session.query(statement, params.to_vec()).await
        }
        .map_err(StoreMiddlewareError::cassandra)?;
        Ok(build_result_set(result))
    }

    /// Falls back to the session keyspace when `namespace` is `None`. Unquoted names are stored
    /// in lower case, so lookups are too.
    async fn describe_table(
        &self,
        namespace: Option<&str>,
        table: &str,
    ) -> Result<Option<TableDescription>, StoreMiddlewareError> {
        self.ensure_connected().await?;
        let keyspace = namespace.or(self.config.namespace()).ok_or_else(|| {
            StoreMiddlewareError::InvalidSchema(
                "describe_table needs a keyspace when the session has none".to_string(),
            )
        })?;
        check_identifier(keyspace, StoreMiddlewareError::InvalidSchema)?;
        check_identifier(table, StoreMiddlewareError::InvalidSchema)?;

        let rows = self
            .execute(
                DESCRIBE_COLUMNS,
                &[
                    RowValues::from(keyspace.to_lowercase()),
                    RowValues::from(table.to_lowercase()),
                ],
            )
            .await?;
        let columns = rows
            .into_iter()
            .map(|row| CatalogColumn::from_row(&row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(describe_from_catalog(columns))
    }
}
