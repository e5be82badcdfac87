use crate::models::Record;
use serde_json::Value;

static NULL: Value = Value::Null;

/// Combined tabular result: rows in fetch order, columns in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl Table {
    /// An empty, zero-row table.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(rows: Vec<Record>) -> Self {
        let mut t = Self::new();
        t.extend(rows);
        t
    }

    /// A table with a fixed column set (e.g. from a CSV header), even when
    /// there are no rows.
    pub fn with_columns(columns: Vec<String>, rows: Vec<Record>) -> Self {
        let mut t = Self {
            columns,
            rows: Vec::with_capacity(rows.len()),
        };
        t.extend(rows);
        t
    }

    /// Append records, adding any keys not seen before to the column list.
    pub fn extend(&mut self, records: impl IntoIterator<Item = Record>) {
        for r in records {
            for k in r.keys() {
                if !self.columns.iter().any(|c| c == k) {
                    self.columns.push(k.clone());
                }
            }
            self.rows.push(r);
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Record] {
        &mut self.rows
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }

    /// Cell value, `None` when the row lacks the column.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Values of one column; missing cells are `Value::Null`.
    pub fn column(&self, name: &str) -> Vec<&Value> {
        self.rows
            .iter()
            .map(|r| r.get(name).unwrap_or(&NULL))
            .collect()
    }

    /// Keep only rows matching the predicate; columns are unchanged.
    pub fn retain(&mut self, keep: impl FnMut(&Record) -> bool) {
        self.rows.retain(keep);
    }
}
