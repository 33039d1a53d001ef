use std::collections::HashMap;
use std::sync::Arc;

use crate::types::RowValues;

/// A row from a query result
///
/// Column names and the name → index map are shared by every row of the same result set.
#[derive(Debug, Clone)]
pub struct StoreRow {
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
    values: Vec<RowValues>,
}

impl StoreRow {
    pub(crate) fn new(
        column_names: Arc<Vec<String>>,
        column_index: Arc<HashMap<String, usize>>,
        values: Vec<RowValues>,
    ) -> Self {
        Self {
            column_names,
            column_index,
            values,
        }
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_index.get(column_name).copied()
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Column values in column order.
    #[must_use]
    pub fn into_values(self) -> Vec<RowValues> {
        self.values
    }
}
