use crate::error::StoreMiddlewareError;
use crate::schema::{ReplicationSpec, SchemaDefinition, TableKey};
use crate::types::StoreKind;

use super::{Dialect, check_identifier, column_definitions, qualified_name};

/// SQL rendering for `PostgreSQL`.
///
/// Namespaces are schemas: `CREATE DATABASE` has no `IF NOT EXISTS` form and tables cannot be
/// qualified by database, so `namespace.table` only works for schemas. Databases themselves are
/// created through `PostgresStore::create_database`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn kind(&self) -> StoreKind {
        StoreKind::Postgres
    }

    fn build_create_namespace(
        &self,
        name: &str,
        replication: Option<&ReplicationSpec>,
    ) -> Result<String, StoreMiddlewareError> {
        if replication.is_some() {
            return Err(StoreMiddlewareError::InvalidSchema(
                "postgres namespaces take no replication settings".to_string(),
            ));
        }
        check_identifier(name, StoreMiddlewareError::InvalidSchema)?;
        Ok(format!("CREATE SCHEMA IF NOT EXISTS {name}"))
    }

    /// `NoKey` renders no key clause; otherwise partition then clustering columns form one
    /// composite primary key.
    fn build_create_table(
        &self,
        namespace: Option<&str>,
        table: &str,
        schema: &SchemaDefinition,
        key: &TableKey,
    ) -> Result<String, StoreMiddlewareError> {
        let target = qualified_name(namespace, table)?;
        let columns = column_definitions(schema)?;
        let key_clause = match key.resolve(schema)? {
            Some((partition, clustering)) => {
                let key_columns: Vec<&str> = partition.into_iter().chain(clustering).collect();
                format!(", PRIMARY KEY ({})", key_columns.join(", "))
            }
            None => String::new(),
        };
        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {target} ({columns}{key_clause})"
        ))
    }

    fn build_drop_namespace(&self, name: &str) -> Result<String, StoreMiddlewareError> {
        check_identifier(name, StoreMiddlewareError::InvalidSchema)?;
        Ok(format!("DROP SCHEMA IF EXISTS {name}"))
    }
}
