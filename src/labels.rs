//! Code → text label lookup built from the `api-variables` metadata.

use crate::error::{Error, Result};
use crate::table::Table;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Integer code to label text for one variable.
pub type LabelMap = BTreeMap<i64, String>;

/// Column names that usually carry coded categories.
const CATEGORICAL_HINTS: &[&str] = &[
    "race",
    "sex",
    "gender",
    "fips",
    "grade",
    "school_level",
    "school_type",
    "inst_level",
    "inst_control",
    "disability",
    "lep",
];

#[derive(Debug, Clone, Default)]
pub struct LabelMapper {
    labels: HashMap<String, LabelMap>,
}

impl LabelMapper {
    /// Build from variable metadata entries. Each entry names its variable in
    /// `variable` or `name` and carries labels either as an object
    /// (`{"1": "White"}`) or a list (`[{"code": 1, "label": "White"}]`) under
    /// `labels` or `value_labels`. Entries without labels are skipped.
    pub fn from_metadata(variables: &[Value]) -> Self {
        let mut labels = HashMap::new();
        for var in variables {
            let Some(name) = var
                .get("variable")
                .or_else(|| var.get("name"))
                .and_then(Value::as_str)
            else {
                continue;
            };
            let raw = var
                .get("labels")
                .filter(|v| !v.is_null())
                .or_else(|| var.get("value_labels"));
            if let Some(map) = raw.and_then(parse_labels).filter(|m| !m.is_empty()) {
                labels.insert(name.to_string(), map);
            }
        }
        Self { labels }
    }

    pub fn label_mapping(&self, variable: &str) -> Option<&LabelMap> {
        self.labels.get(variable)
    }

    /// Replace integer codes in `column` with their labels. Codes without a
    /// label are left as they are. No-op when the column or labels are absent.
    pub fn apply_labels(&self, table: &mut Table, column: &str) -> Result<()> {
        if !table.has_column(column) {
            return Ok(());
        }
        let Some(map) = self.labels.get(column) else {
            return Ok(());
        };
        for (i, row) in table.rows_mut().iter_mut().enumerate() {
            let Some(cell) = row.get_mut(column) else {
                continue;
            };
            let code = match cell {
                Value::Null => continue,
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            let code = code.ok_or_else(|| {
                Error::data(
                    format!("apply labels to '{}'", column),
                    format!("row {} holds non-integer code {}", i, cell),
                )
            })?;
            if let Some(text) = map.get(&code) {
                *cell = Value::String(text.clone());
            }
        }
        Ok(())
    }

    /// Label `columns`, or every column that looks categorical when `None`.
    pub fn apply_labels_to_table(
        &self,
        table: &mut Table,
        columns: Option<&[String]>,
    ) -> Result<()> {
        let cols: Vec<String> = match columns {
            Some(c) => c.to_vec(),
            None => categorical_columns(table),
        };
        for c in &cols {
            self.apply_labels(table, c)?;
        }
        Ok(())
    }
}

fn parse_labels(v: &Value) -> Option<LabelMap> {
    match v {
        Value::Object(m) => Some(
            m.iter()
                .filter_map(|(k, label)| {
                    let code = k.trim().parse::<i64>().ok()?;
                    Some((code, label_text(label)))
                })
                .collect(),
        ),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| {
                    let code = match item.get("code")? {
                        Value::Number(n) => n.as_i64()?,
                        Value::String(s) => s.trim().parse().ok()?,
                        _ => return None,
                    };
                    Some((code, label_text(item.get("label")?)))
                })
                .collect(),
        ),
        _ => None,
    }
}

fn label_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Columns whose names suggest coded categories.
pub fn categorical_columns(table: &Table) -> Vec<String> {
    table
        .columns()
        .iter()
        .filter(|c| {
            let lc = c.to_lowercase();
            CATEGORICAL_HINTS.iter().any(|h| lc.contains(h))
        })
        .cloned()
        .collect()
}
