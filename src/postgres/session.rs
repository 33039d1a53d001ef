use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, info, warn};

use super::params::Params;
use super::query::build_result_set;
use crate::config::ConnectionConfig;
use crate::error::StoreMiddlewareError;
use crate::results::ResultSet;
use crate::schema::{SchemaDefinition, TableDescription, TableKey};
use crate::statement::{Dialect, PostgresDialect, check_identifier};
use crate::store::Store;
use crate::types::{RowValues, StoreKind};

const DEFAULT_SCHEMA: &str = "public";

const DESCRIBE_COLUMNS: &str = "SELECT a.attname::text AS column_name, \
     format_type(a.atttypid, a.atttypmod) AS data_type \
     FROM pg_attribute a \
     JOIN pg_class c ON c.oid = a.attrelid \
     JOIN pg_namespace n ON n.oid = c.relnamespace \
     WHERE n.nspname = $1 AND c.relname = $2 AND a.attnum > 0 AND NOT a.attisdropped \
     ORDER BY a.attnum";

const DESCRIBE_PRIMARY_KEY: &str = "SELECT a.attname::text AS column_name \
     FROM pg_index i \
     JOIN pg_class c ON c.oid = i.indrelid \
     JOIN pg_namespace n ON n.oid = c.relnamespace \
     JOIN pg_attribute a ON a.attrelid = c.oid AND a.attnum = ANY(i.indkey) \
     WHERE i.indisprimary AND n.nspname = $1 AND c.relname = $2 \
     ORDER BY array_position(i.indkey::int2[], a.attnum)";

/// Live connection: the client plus the task driving its socket.
struct PgHandle {
    client: Arc<Client>,
    driver: JoinHandle<()>,
}

/// Session manager for a `PostgreSQL` database.
///
/// Holds at most one `tokio_postgres::Client`. The mutex serializes connect/disconnect;
/// executions clone the `Arc<Client>` out of it and may run concurrently (the client pipelines
/// them over the one connection).
pub struct PostgresStore {
    config: ConnectionConfig,
    handle: Mutex<Option<PgHandle>>,
}

impl PostgresStore {
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            handle: Mutex::new(None),
        }
    }

    async fn client(&self) -> Result<Arc<Client>, StoreMiddlewareError> {
        self.handle
            .lock()
            .await
            .as_ref()
            .map(|handle| Arc::clone(&handle.client))
            .ok_or(StoreMiddlewareError::NotConnected(StoreKind::Postgres))
    }

    fn pg_config(&self) -> tokio_postgres::Config {
        let config = &self.config;
        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(config.host())
            .port(config.port())
            .user(config.username())
            .password(config.password())
            .connect_timeout(config.connect_timeout());
        if let Some(dbname) = config.namespace() {
            pg_config.dbname(dbname);
        }
        pg_config
    }

    /// Create database `name` unless it already exists. Returns whether it was created.
    ///
    /// `CREATE DATABASE` has no `IF NOT EXISTS` form, so existence is checked first with a bound
    /// parameter against `pg_database`.
    ///
    /// # Errors
    /// `NotConnected`, `InvalidSchema` for a malformed name, or the execution error.
    pub async fn create_database(&self, name: &str) -> Result<bool, StoreMiddlewareError> {
        check_identifier(name, StoreMiddlewareError::InvalidSchema)?;
        let client = self.client().await?;
        let existing = client
            .query_opt(
                "SELECT 1 FROM pg_database WHERE datname = $1",
                &[&name.to_lowercase()],
            )
            .await
            .map_err(StoreMiddlewareError::postgres)?;
        if existing.is_some() {
            debug!("database {name} already exists");
            return Ok(false);
        }
        // Must run outside a transaction block, so use the simple protocol
        client
            .batch_execute(&format!("CREATE DATABASE {name}"))
            .await
            .map_err(StoreMiddlewareError::postgres)?;
        info!("created database {name}");
        Ok(true)
    }
}

impl std::fmt::Debug for PostgresStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Store for PostgresStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Postgres
    }

    fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn dialect(&self) -> &dyn Dialect {
        &PostgresDialect
    }

    async fn connect(&self) -> Result<(), StoreMiddlewareError> {
        let mut slot = self.handle.lock().await;
        if slot.is_some() {
            debug!("Postgres session already open");
            return Ok(());
        }

        let target = format!("{}:{}", self.config.host(), self.config.port());
        info!("Connecting to Postgres at {target}");
        let timeout = self.config.connect_timeout();
        let (client, connection) =
            match tokio::time::timeout(timeout, self.pg_config().connect(NoTls)).await {
                Ok(Ok(pair)) => pair,
                Ok(Err(e)) => {
                    return Err(StoreMiddlewareError::ConnectionError(format!(
                        "Failed to connect to Postgres at {target}: {e}"
                    )));
                }
                Err(_) => {
                    return Err(StoreMiddlewareError::ConnectionError(format!(
                        "Timed out after {timeout:?} connecting to Postgres at {target}"
                    )));
                }
            };

        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!("Postgres connection closed with error: {e}");
            }
        });

        *slot = Some(PgHandle {
            client: Arc::new(client),
            driver,
        });
        info!("Connected to Postgres at {target}");
        Ok(())
    }

    async fn disconnect(&self) {
        let Some(PgHandle { client, driver }) = self.handle.lock().await.take() else {
            return;
        };
        drop(client);
        // Executions still holding a client clone see a closed connection from here on
        driver.abort();
        info!(
            "Disconnected from Postgres at {}:{}",
            self.config.host(),
            self.config.port()
        );
    }

    async fn is_connected(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    async fn execute(
        &self,
        statement: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, StoreMiddlewareError> {
        let client = self.client().await?;
        debug!(params = params.len(), "sql: {statement}");

        let converted = Params::convert(params);
        let stmt = client
            .prepare(statement)
            .await
            .map_err(StoreMiddlewareError::postgres)?;

        if stmt.columns().is_empty() {
            let rows = client
                .execute(&stmt, converted.as_refs())
                .await
                .map_err(StoreMiddlewareError::postgres)?;
            let affected = usize::try_from(rows).map_err(|e| {
                StoreMiddlewareError::ParameterError(format!(
                    "postgres affected rows conversion error: {e}"
                ))
            })?;
            Ok(ResultSet::affected(affected))
        } else {
            let rows = client
                .query(&stmt, converted.as_refs())
                .await
                .map_err(StoreMiddlewareError::postgres)?;
            build_result_set(&stmt, &rows)
        }
    }

    /// Scripts go through the simple query protocol, one statement per round trip, so utility
    /// statements that refuse to run in a transaction block still work.
    async fn execute_script(&self, statements: &[&str]) -> Result<(), StoreMiddlewareError> {
        let client = self.client().await?;
        for (idx, statement) in statements.iter().enumerate() {
            let statement = statement.trim();
            if statement.is_empty() || statement.starts_with("--") || statement.starts_with("//")
            {
                continue;
            }
            debug!("sql script[{idx}]: {statement}");
            if let Err(e) = client.batch_execute(statement).await {
                warn!(store = %StoreKind::Postgres, index = idx, "script statement failed: {e}");
                return Err(StoreMiddlewareError::postgres(e));
            }
        }
        Ok(())
    }

    /// Unquoted names are folded to lower case, matching how `build_create_table` creates them.
    /// `namespace` defaults to the `public` schema.
    async fn describe_table(
        &self,
        namespace: Option<&str>,
        table: &str,
    ) -> Result<Option<TableDescription>, StoreMiddlewareError> {
        self.ensure_connected().await?;
        let schema_name = namespace.unwrap_or(DEFAULT_SCHEMA);
        check_identifier(schema_name, StoreMiddlewareError::InvalidSchema)?;
        check_identifier(table, StoreMiddlewareError::InvalidSchema)?;
        let params = [
            RowValues::Text(schema_name.to_lowercase()),
            RowValues::Text(table.to_lowercase()),
        ];

        let columns = self.execute(DESCRIBE_COLUMNS, &params).await?;
        if columns.is_empty() {
            return Ok(None);
        }
        let mut schema = SchemaDefinition::new();
        for row in columns {
            let (Some(name), Some(type_tag)) = (
                row.get("column_name").and_then(RowValues::as_text),
                row.get("data_type").and_then(RowValues::as_text),
            ) else {
                return Err(StoreMiddlewareError::InvalidSchema(
                    "pg_attribute row without name or type".to_string(),
                ));
            };
            schema.try_column(name, type_tag)?;
        }

        let partition: Vec<String> = self
            .execute(DESCRIBE_PRIMARY_KEY, &params)
            .await?
            .into_iter()
            .filter_map(|row| row.get("column_name").and_then(RowValues::as_text).map(str::to_string))
            .collect();
        let key = if partition.is_empty() {
            TableKey::NoKey
        } else {
            TableKey::Explicit {
                partition,
                clustering: Vec::new(),
            }
        };

        Ok(Some(TableDescription { schema, key }))
    }
}
