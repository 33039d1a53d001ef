use crate::error::StoreMiddlewareError;
use crate::schema::{ReplicationSpec, SchemaDefinition, TableKey};
use crate::types::StoreKind;

use super::{Dialect, check_identifier, column_definitions, qualified_name};

/// CQL rendering for Cassandra and ScyllaDB.
#[derive(Debug, Clone, Copy, Default)]
pub struct CqlDialect;

impl Dialect for CqlDialect {
    fn kind(&self) -> StoreKind {
        StoreKind::Cassandra
    }

    /// Without a replication spec the keyspace gets `SimpleStrategy` with factor 1.
    fn build_create_namespace(
        &self,
        name: &str,
        replication: Option<&ReplicationSpec>,
    ) -> Result<String, StoreMiddlewareError> {
        check_identifier(name, StoreMiddlewareError::InvalidSchema)?;
        let replication = match replication {
            Some(spec) => spec.to_cql()?,
            None => ReplicationSpec::default().to_cql()?,
        };
        Ok(format!(
            "CREATE KEYSPACE IF NOT EXISTS {name} WITH replication = {replication}"
        ))
    }

    fn build_create_table(
        &self,
        namespace: Option<&str>,
        table: &str,
        schema: &SchemaDefinition,
        key: &TableKey,
    ) -> Result<String, StoreMiddlewareError> {
        let target = qualified_name(namespace, table)?;
        let columns = column_definitions(schema)?;
        let Some((partition, clustering)) = key.resolve(schema)? else {
            return Err(StoreMiddlewareError::InvalidSchema(
                "CQL tables require a primary key".to_string(),
            ));
        };

        let partition = if partition.len() == 1 {
            partition[0].to_string()
        } else {
            format!("({})", partition.join(", "))
        };
        let key_clause = if clustering.is_empty() {
            partition
        } else {
            format!("{partition}, {}", clustering.join(", "))
        };

        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {target} ({columns}, PRIMARY KEY ({key_clause}))"
        ))
    }

    fn build_drop_namespace(&self, name: &str) -> Result<String, StoreMiddlewareError> {
        check_identifier(name, StoreMiddlewareError::InvalidSchema)?;
        Ok(format!("DROP KEYSPACE IF EXISTS {name}"))
    }
}
