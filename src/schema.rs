//! Structured inputs for the statement builders: table schemas, row data, key selection and
//! keyspace replication.

use crate::error::StoreMiddlewareError;
use crate::types::RowValues;

/// Ordered column name → type tag mapping used to render a `CREATE TABLE`.
///
/// Column names are unique; type tags are store-specific (`int`, `text`, `varchar(64)`,
/// `map<text, int>`, ...) and passed through as written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDefinition {
    columns: Vec<(String, String)>,
}

impl SchemaDefinition {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form for literal schemas; a duplicate name replaces the earlier type tag in place.
    /// Use `try_column` to reject duplicates instead.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>, type_tag: impl Into<String>) -> Self {
        let name = name.into();
        let type_tag = type_tag.into();
        match self.columns.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = type_tag,
            None => self.columns.push((name, type_tag)),
        }
        self
    }

    /// Append a column, rejecting a name that is already present.
    ///
    /// # Errors
    /// Returns `StoreMiddlewareError::InvalidSchema` on a duplicate column name.
    pub fn try_column(
        &mut self,
        name: impl Into<String>,
        type_tag: impl Into<String>,
    ) -> Result<(), StoreMiddlewareError> {
        let name = name.into();
        if self.contains(&name) {
            return Err(StoreMiddlewareError::InvalidSchema(format!(
                "duplicate column `{name}`"
            )));
        }
        self.columns.push((name, type_tag.into()));
        Ok(())
    }

    /// Build from `(name, type)` pairs, keeping their order.
    ///
    /// # Errors
    /// Returns `StoreMiddlewareError::InvalidSchema` on a duplicate column name.
    pub fn try_from_iter<I, N, T>(columns: I) -> Result<Self, StoreMiddlewareError>
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        let mut schema = Self::new();
        for (name, type_tag) in columns {
            schema.try_column(name, type_tag)?;
        }
        Ok(schema)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|(existing, _)| existing == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .map(|(name, type_tag)| (name.as_str(), type_tag.as_str()))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }
}

/// Ordered column name → value mapping: one row to insert, or the new values of an update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowData {
    entries: Vec<(String, RowValues)>,
}

impl RowData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form; a duplicate name replaces the earlier value in place.
    /// Use `try_value` to reject duplicates instead.
    #[must_use]
    pub fn value(mut self, column: impl Into<String>, value: impl Into<RowValues>) -> Self {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == column) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((column, value)),
        }
        self
    }

    /// # Errors
    /// Returns `StoreMiddlewareError::InvalidRow` on a duplicate column name.
    pub fn try_value(
        &mut self,
        column: impl Into<String>,
        value: impl Into<RowValues>,
    ) -> Result<(), StoreMiddlewareError> {
        let column = column.into();
        if self.entries.iter().any(|(existing, _)| *existing == column) {
            return Err(StoreMiddlewareError::InvalidRow(format!(
                "duplicate column `{column}`"
            )));
        }
        self.entries.push((column, value.into()));
        Ok(())
    }

    /// # Errors
    /// Returns `StoreMiddlewareError::InvalidRow` on a duplicate column name.
    pub fn try_from_iter<I, C, V>(entries: I) -> Result<Self, StoreMiddlewareError>
    where
        I: IntoIterator<Item = (C, V)>,
        C: Into<String>,
        V: Into<RowValues>,
    {
        let mut row = Self::new();
        for (column, value) in entries {
            row.try_value(column, value)?;
        }
        Ok(row)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(column, _)| column.as_str())
    }

    /// Values in column order, ready to bind.
    #[must_use]
    pub fn values(&self) -> Vec<RowValues> {
        self.entries.iter().map(|(_, value)| value.clone()).collect()
    }
}

/// Primary key selection for `build_create_table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableKey {
    /// Restricted mode: every schema column joins the primary key, in schema order. For CQL the
    /// first column is the partition key and the rest are clustering columns.
    AllColumns,
    /// Caller-chosen partition columns followed by clustering columns.
    Explicit {
        partition: Vec<String>,
        clustering: Vec<String>,
    },
    /// No primary key clause. Only valid for the relational store.
    NoKey,
}

impl TableKey {
    /// Single-column partition key, no clustering columns.
    #[must_use]
    pub fn partition(column: impl Into<String>) -> Self {
        TableKey::Explicit {
            partition: vec![column.into()],
            clustering: Vec::new(),
        }
    }

    #[must_use]
    pub fn explicit<P, C>(partition: P, clustering: C) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        TableKey::Explicit {
            partition: partition.into_iter().map(Into::into).collect(),
            clustering: clustering.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolve to `(partition, clustering)` against `schema`, checking every key column exists.
    ///
    /// Returns `None` for `NoKey`.
    pub(crate) fn resolve<'a>(
        &'a self,
        schema: &'a SchemaDefinition,
    ) -> Result<Option<(Vec<&'a str>, Vec<&'a str>)>, StoreMiddlewareError> {
        match self {
            TableKey::NoKey => Ok(None),
            TableKey::AllColumns => {
                let mut names = schema.column_names();
                let partition: Vec<&str> = names.next().into_iter().collect();
                Ok(Some((partition, names.collect())))
            }
            TableKey::Explicit {
                partition,
                clustering,
            } => {
                if partition.is_empty() {
                    return Err(StoreMiddlewareError::InvalidSchema(
                        "primary key needs at least one partition column".to_string(),
                    ));
                }
                let mut seen: Vec<&str> = Vec::with_capacity(partition.len() + clustering.len());
                for column in partition.iter().chain(clustering) {
                    if !schema.contains(column) {
                        return Err(StoreMiddlewareError::InvalidSchema(format!(
                            "key column `{column}` is not in the schema"
                        )));
                    }
                    if seen.contains(&column.as_str()) {
                        return Err(StoreMiddlewareError::InvalidSchema(format!(
                            "key column `{column}` listed twice"
                        )));
                    }
                    seen.push(column);
                }
                Ok(Some((
                    partition.iter().map(String::as_str).collect(),
                    clustering.iter().map(String::as_str).collect(),
                )))
            }
        }
    }
}

/// Replication settings for a CQL keyspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationSpec {
    Simple { factor: u32 },
    NetworkTopology { data_centers: Vec<(String, u32)> },
}

impl ReplicationSpec {
    #[must_use]
    pub fn simple(factor: u32) -> Self {
        ReplicationSpec::Simple { factor }
    }

    /// CQL map literal, e.g. `{'class': 'SimpleStrategy', 'replication_factor': 1}`.
    pub(crate) fn to_cql(&self) -> Result<String, StoreMiddlewareError> {
        match self {
            ReplicationSpec::Simple { factor } => {
                if *factor == 0 {
                    return Err(StoreMiddlewareError::InvalidSchema(
                        "replication factor must be at least 1".to_string(),
                    ));
                }
                Ok(format!(
                    "{{'class': 'SimpleStrategy', 'replication_factor': {factor}}}"
                ))
            }
            ReplicationSpec::NetworkTopology { data_centers } => {
                if data_centers.is_empty() {
                    return Err(StoreMiddlewareError::InvalidSchema(
                        "network topology replication needs at least one data center".to_string(),
                    ));
                }
                let mut out = String::from("{'class': 'NetworkTopologyStrategy'");
                for (dc, factor) in data_centers {
                    // rendered as a string literal, not an identifier
                    if dc.trim().is_empty() {
                        return Err(StoreMiddlewareError::InvalidSchema(
                            "data center name must not be empty".to_string(),
                        ));
                    }
                    out.push_str(&format!(", '{}': {factor}", dc.replace('\'', "''")));
                }
                out.push('}');
                Ok(out)
            }
        }
    }
}

impl Default for ReplicationSpec {
    fn default() -> Self {
        ReplicationSpec::Simple { factor: 1 }
    }
}

/// Columns and primary key of an existing table, as read back from the store's catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescription {
    pub schema: SchemaDefinition,
    pub key: TableKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_keeps_insertion_order() {
        let schema = SchemaDefinition::new()
            .column("id", "int")
            .column("name", "text")
            .column("age", "int");
        let names: Vec<&str> = schema.column_names().collect();
        assert_eq!(names, ["id", "name", "age"]);
    }

    #[test]
    fn try_from_iter_rejects_duplicates() {
        let err = SchemaDefinition::try_from_iter([("id", "int"), ("id", "text")]).unwrap_err();
        assert!(matches!(err, StoreMiddlewareError::InvalidSchema(_)));

        let err = RowData::try_from_iter([("id", 1), ("id", 2)]).unwrap_err();
        assert!(matches!(err, StoreMiddlewareError::InvalidRow(_)));
    }

    #[test]
    fn builder_replaces_duplicate_in_place() {
        let row = RowData::new().value("a", 1).value("b", 2).value("a", 3);
        assert_eq!(row.values(), vec![RowValues::Int(3), RowValues::Int(2)]);

        let schema = SchemaDefinition::new()
            .column("id", "int")
            .column("name", "text")
            .column("id", "bigint");
        let columns: Vec<(&str, &str)> = schema.columns().collect();
        assert_eq!(columns, [("id", "bigint"), ("name", "text")]);

        let mut schema = schema;
        assert!(matches!(
            schema.try_column("name", "varchar"),
            Err(StoreMiddlewareError::InvalidSchema(_))
        ));
        assert_eq!(schema.len(), 2);
    }

    #[test]
    fn all_columns_key_splits_first_column() {
        let schema = SchemaDefinition::new().column("a", "int").column("b", "int");
        let (partition, clustering) = TableKey::AllColumns.resolve(&schema).unwrap().unwrap();
        assert_eq!(partition, ["a"]);
        assert_eq!(clustering, ["b"]);
    }

    #[test]
    fn explicit_key_must_reference_schema_columns() {
        let schema = SchemaDefinition::new().column("a", "int");
        let err = TableKey::partition("missing").resolve(&schema).unwrap_err();
        assert!(matches!(err, StoreMiddlewareError::InvalidSchema(_)));

        let err = TableKey::explicit(Vec::<String>::new(), ["a"])
            .resolve(&schema)
            .unwrap_err();
        assert!(matches!(err, StoreMiddlewareError::InvalidSchema(_)));

        let err = TableKey::explicit(["a"], ["a"]).resolve(&schema).unwrap_err();
        assert!(matches!(err, StoreMiddlewareError::InvalidSchema(_)));
    }

    #[test]
    fn replication_renders_cql_map() {
        assert_eq!(
            ReplicationSpec::simple(3).to_cql().unwrap(),
            "{'class': 'SimpleStrategy', 'replication_factor': 3}"
        );
        let nts = ReplicationSpec::NetworkTopology {
            data_centers: vec![("dc1".into(), 3), ("dc2".into(), 2)],
        };
        assert_eq!(
            nts.to_cql().unwrap(),
            "{'class': 'NetworkTopologyStrategy', 'dc1': 3, 'dc2': 2}"
        );
        assert!(ReplicationSpec::simple(0).to_cql().is_err());
    }

    #[test]
    fn data_center_names_are_quoted_literals() {
        let nts = ReplicationSpec::NetworkTopology {
            data_centers: vec![("us-east".into(), 3), ("DC-1".into(), 1), ("o'hare".into(), 2)],
        };
        assert_eq!(
            nts.to_cql().unwrap(),
            "{'class': 'NetworkTopologyStrategy', 'us-east': 3, 'DC-1': 1, 'o''hare': 2}"
        );

        let blank = ReplicationSpec::NetworkTopology { data_centers: vec![(" ".into(), 1)] };
        assert!(matches!(blank.to_cql(), Err(StoreMiddlewareError::InvalidSchema(_))));
    }
}
