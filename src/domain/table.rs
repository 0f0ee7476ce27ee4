//! Table module.
//!
//! This module contains the tabular recipient data as handed over by
//! the data source (CSV file, upload, spreadsheet). The header list
//! of the first load is authoritative for the whole session.

use serde::{Deserialize, Serialize};

/// Represents one row of the source table: ordered column name to
/// cell value pairs. A column absent from the row is distinct from a
/// column holding an empty cell.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Row(pub Vec<(String, String)>);

impl Row {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Row(iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect())
    }
}

/// Represents the loaded recipient table.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    /// Builds a table from positional records, pairing each cell with
    /// the header at the same index. Missing trailing cells are left
    /// absent from the row.
    pub fn from_records<H, R, C>(headers: H, records: R) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator,
        R::Item: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let headers: Vec<String> = headers.into_iter().map(Into::into).collect();
        let rows = records
            .into_iter()
            .map(|record| {
                let cells = record.into_iter().map(|cell| -> String { cell.into() });
                Row(headers.iter().cloned().zip(cells).collect())
            })
            .collect();
        Self { headers, rows }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|header| header == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_records() {
        let table = Table::from_records(
            ["Email", "First Name"],
            vec![vec!["a@b.com", "Ada"], vec!["c@d.com"]],
        );

        assert_eq!(2, table.len());
        assert!(table.has_column("First Name"));
        assert!(!table.has_column("first name"));
        assert_eq!(Some("Ada"), table.rows[0].get("First Name"));
        assert_eq!(None, table.rows[1].get("First Name"));
        assert_eq!(Some("c@d.com"), table.rows[1].get("Email"));
    }
}
