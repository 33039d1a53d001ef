use std::collections::HashMap;
use std::sync::Arc;

use super::row::StoreRow;
use crate::types::RowValues;

/// Rows produced by one statement execution.
///
/// Consumed by value: iterating a `ResultSet` moves its rows out, so a result set can only be
/// read once.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    rows: Vec<StoreRow>,
    rows_affected: usize,
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
}

impl ResultSet {
    /// Create an empty result set for the given columns with room for `capacity` rows.
    #[must_use]
    pub fn with_columns(column_names: Vec<String>, capacity: usize) -> ResultSet {
        let column_index = column_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect::<HashMap<_, _>>();
        ResultSet {
            rows: Vec::with_capacity(capacity),
            rows_affected: 0,
            column_names: Arc::new(column_names),
            column_index: Arc::new(column_index),
        }
    }

    /// Result of a statement that returns no rows but reports how many it touched.
    #[must_use]
    pub fn affected(rows_affected: usize) -> ResultSet {
        ResultSet {
            rows_affected,
            ..ResultSet::default()
        }
    }

    /// Add a row to the result set
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        self.rows.push(StoreRow::new(
            Arc::clone(&self.column_names),
            Arc::clone(&self.column_index),
            row_values,
        ));
        self.rows_affected += 1;
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Rows returned, or rows changed for DML on stores that report it.
    #[must_use]
    pub fn rows_affected(&self) -> usize {
        self.rows_affected
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl IntoIterator for ResultSet {
    type Item = StoreRow;
    type IntoIter = std::vec::IntoIter<StoreRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
