// Statement builder - renders DDL/DML text from structured inputs
//
// - cql: Cassandra/ScyllaDB dialect (`?` placeholders, keyspaces, mandatory primary key)
// - postgres: PostgreSQL dialect (`$n` placeholders, schemas as namespaces)
//
// Builders are pure: no I/O, same output for the same input. Values are always returned as
// bound parameters next to the statement text and never formatted into it.

mod cql;
mod postgres;

use std::sync::LazyLock;

use regex::Regex;

use crate::error::StoreMiddlewareError;
use crate::schema::{ReplicationSpec, RowData, SchemaDefinition, TableKey};
use crate::types::{PlaceholderStyle, RowValues, StoreKind};

pub use cql::CqlDialect;
pub use postgres::PostgresDialect;

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is a valid regex")
});

/// A query and its parameters bundled together
///
/// This type makes it easier to pass around a rendered statement and the values to bind to it
/// as a single unit.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAndParams {
    /// The statement text, containing placeholders only
    pub query: String,
    /// The parameters to be bound to the statement, in placeholder order
    pub params: Vec<RowValues>,
}

impl QueryAndParams {
    pub fn new(query: impl Into<String>, params: Vec<RowValues>) -> Self {
        Self {
            query: query.into(),
            params,
        }
    }

    pub fn new_without_params(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            params: Vec::new(),
        }
    }
}

/// Reject names that cannot be rendered unquoted.
///
/// `err` picks the error kind so schema input reports `InvalidSchema` and row input
/// `InvalidRow`.
pub(crate) fn check_identifier(
    name: &str,
    err: fn(String) -> StoreMiddlewareError,
) -> Result<(), StoreMiddlewareError> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(err(format!("`{name}` is not a valid identifier")))
    }
}

fn check_type_tag(column: &str, type_tag: &str) -> Result<(), StoreMiddlewareError> {
    if type_tag.trim().is_empty() {
        return Err(StoreMiddlewareError::InvalidSchema(format!(
            "column `{column}` has an empty type"
        )));
    }
    if type_tag.contains(';') {
        return Err(StoreMiddlewareError::InvalidSchema(format!(
            "type of column `{column}` contains `;`"
        )));
    }
    Ok(())
}

/// `namespace.table` or bare `table`, after validating both names.
fn qualified_name(namespace: Option<&str>, table: &str) -> Result<String, StoreMiddlewareError> {
    check_identifier(table, StoreMiddlewareError::InvalidSchema)?;
    match namespace {
        Some(ns) => {
            check_identifier(ns, StoreMiddlewareError::InvalidSchema)?;
            Ok(format!("{ns}.{table}"))
        }
        None => Ok(table.to_string()),
    }
}

/// `col type, col type, ...` for a non-empty schema.
fn column_definitions(schema: &SchemaDefinition) -> Result<String, StoreMiddlewareError> {
    if schema.is_empty() {
        return Err(StoreMiddlewareError::InvalidSchema(
            "schema has no columns".to_string(),
        ));
    }
    let mut defs = Vec::with_capacity(schema.len());
    for (name, type_tag) in schema.columns() {
        check_identifier(name, StoreMiddlewareError::InvalidSchema)?;
        check_type_tag(name, type_tag)?;
        defs.push(format!("{name} {type_tag}"));
    }
    Ok(defs.join(", "))
}

/// Validated column list of a non-empty row.
fn row_columns(row: &RowData) -> Result<Vec<&str>, StoreMiddlewareError> {
    if row.is_empty() {
        return Err(StoreMiddlewareError::InvalidRow(
            "row has no columns".to_string(),
        ));
    }
    let columns: Vec<&str> = row.columns().collect();
    for column in &columns {
        check_identifier(column, StoreMiddlewareError::InvalidRow)?;
    }
    Ok(columns)
}

/// Store-specific statement rendering.
///
/// Required methods cover the parts where the two query languages differ (namespaces and key
/// clauses); DML is shared and only varies by placeholder style.
pub trait Dialect: Send + Sync {
    fn kind(&self) -> StoreKind;

    fn placeholder_style(&self) -> PlaceholderStyle {
        self.kind().placeholder_style()
    }

    /// Idempotent "create if absent" for a keyspace (CQL) or schema (Postgres).
    ///
    /// # Errors
    /// `InvalidSchema` for a malformed name or a replication spec the store does not accept.
    fn build_create_namespace(
        &self,
        name: &str,
        replication: Option<&ReplicationSpec>,
    ) -> Result<String, StoreMiddlewareError>;

    /// Idempotent "create if absent" table statement, columns in schema order.
    ///
    /// # Errors
    /// `InvalidSchema` for an empty schema, malformed names or type tags, or a key the store
    /// cannot express.
    fn build_create_table(
        &self,
        namespace: Option<&str>,
        table: &str,
        schema: &SchemaDefinition,
        key: &TableKey,
    ) -> Result<String, StoreMiddlewareError>;

    /// # Errors
    /// `InvalidSchema` for a malformed name.
    fn build_drop_namespace(&self, name: &str) -> Result<String, StoreMiddlewareError>;

    /// # Errors
    /// `InvalidSchema` for a malformed name.
    fn build_drop_table(
        &self,
        namespace: Option<&str>,
        table: &str,
    ) -> Result<String, StoreMiddlewareError> {
        Ok(format!(
            "DROP TABLE IF EXISTS {}",
            qualified_name(namespace, table)?
        ))
    }

    /// `INSERT` with one placeholder per row entry; values come back as bound parameters.
    ///
    /// # Errors
    /// `InvalidRow` for an empty row or malformed column names, `InvalidSchema` for malformed
    /// namespace/table names.
    fn build_insert(
        &self,
        namespace: Option<&str>,
        table: &str,
        row: &RowData,
    ) -> Result<QueryAndParams, StoreMiddlewareError> {
        let target = qualified_name(namespace, table)?;
        let columns = row_columns(row)?;
        let style = self.placeholder_style();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| style.render(i)).collect();
        let query = format!(
            "INSERT INTO {target} ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );
        Ok(QueryAndParams::new(query, row.values()))
    }

    /// `UPDATE ... SET col = <placeholder>, ... WHERE <predicate>`.
    ///
    /// The predicate is appended verbatim and is not validated or escaped: it must come from
    /// trusted code, never from end-user input.
    ///
    /// # Errors
    /// `InvalidRow` for an empty row or malformed column names, `InvalidSchema` for malformed
    /// namespace/table names.
    fn build_update(
        &self,
        namespace: Option<&str>,
        table: &str,
        row: &RowData,
        predicate: &str,
    ) -> Result<QueryAndParams, StoreMiddlewareError> {
        let target = qualified_name(namespace, table)?;
        let columns = row_columns(row)?;
        let style = self.placeholder_style();
        let assignments: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{column} = {}", style.render(i + 1)))
            .collect();
        let query = format!(
            "UPDATE {target} SET {} WHERE {predicate}",
            assignments.join(", ")
        );
        Ok(QueryAndParams::new(query, row.values()))
    }

    /// `DELETE FROM ... WHERE <predicate>`; same trust rules as `build_update`.
    ///
    /// # Errors
    /// `InvalidSchema` for malformed namespace/table names.
    fn build_delete(
        &self,
        namespace: Option<&str>,
        table: &str,
        predicate: &str,
    ) -> Result<String, StoreMiddlewareError> {
        Ok(format!(
            "DELETE FROM {} WHERE {predicate}",
            qualified_name(namespace, table)?
        ))
    }

    /// `SELECT` of the given columns (`*` when empty), optionally filtered by a trusted predicate.
    ///
    /// # Errors
    /// `InvalidSchema` for malformed names.
    fn build_select(
        &self,
        namespace: Option<&str>,
        table: &str,
        columns: &[&str],
        predicate: Option<&str>,
    ) -> Result<String, StoreMiddlewareError> {
        let target = qualified_name(namespace, table)?;
        let projection = if columns.is_empty() {
            "*".to_string()
        } else {
            for column in columns {
                check_identifier(column, StoreMiddlewareError::InvalidSchema)?;
            }
            columns.join(", ")
        };
        let mut query = format!("SELECT {projection} FROM {target}");
        if let Some(predicate) = predicate {
            query.push_str(" WHERE ");
            query.push_str(predicate);
        }
        Ok(query)
    }
}
