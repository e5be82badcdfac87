use crate::error::{Error, Result};
use crate::models::Record;
use crate::table::Table;
use csv::{ReaderBuilder, WriterBuilder};
use serde_json::{Number, Value};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Parse CSV text (with header) into a table. Integers and floats become JSON
/// numbers, empty cells become null, everything else stays a string.
/// Numeric-looking codes with leading zeros (e.g. `010000100277`) stay strings.
pub fn read_csv<R: Read>(reader: R) -> Result<Table> {
    let mut rdr = ReaderBuilder::new().from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| Error::data("read CSV header", e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec.map_err(|e| Error::data(format!("read CSV row {}", i + 1), e))?;
        let row: Record = headers
            .iter()
            .zip(rec.iter())
            .map(|(h, cell)| (h.clone(), typed_cell(cell)))
            .collect();
        rows.push(row);
    }
    Ok(Table::with_columns(headers, rows))
}

fn typed_cell(cell: &str) -> Value {
    let s = cell.trim();
    if s.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        if i.to_string() == s {
            return Value::Number(i.into());
        }
    }
    if let Ok(f) = s.parse::<f64>() {
        if !s.starts_with('0') || s.starts_with("0.") {
            if let Some(n) = Number::from_f64(f) {
                return Value::Number(n);
            }
        }
    }
    Value::String(s.to_string())
}

fn cell_text(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Write a table as CSV with a header row to any writer.
pub fn write_csv<W: Write>(table: &Table, out: W) -> Result<()> {
    let mut wtr = WriterBuilder::new().from_writer(out);
    let io = |e: csv::Error| Error::data("write CSV", e);
    wtr.write_record(table.columns()).map_err(io)?;
    for row in table.rows() {
        wtr.write_record(table.columns().iter().map(|c| cell_text(row.get(c))))
            .map_err(io)?;
    }
    wtr.flush().map_err(|e| Error::data("write CSV", e))?;
    Ok(())
}

/// Save a table as CSV with header.
pub fn save_csv<P: AsRef<Path>>(table: &Table, path: P) -> Result<()> {
    let path = path.as_ref();
    let f = File::create(path)
        .map_err(|e| Error::data(format!("create {}", path.display()), e))?;
    write_csv(table, f)
}

/// Save a table as a pretty JSON array of records.
pub fn save_json<P: AsRef<Path>>(table: &Table, path: P) -> Result<()> {
    let path = path.as_ref();
    let s = serde_json::to_string_pretty(table.rows()).map_err(|e| Error::data("encode JSON", e))?;
    let mut f = File::create(path)
        .map_err(|e| Error::data(format!("create {}", path.display()), e))?;
    f.write_all(s.as_bytes())
        .map_err(|e| Error::data(format!("write {}", path.display()), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn sample() -> Table {
        let rows = vec![
            json!({"year": 2020, "ncessch": "010000100277", "school_name": "Test, Elementary", "enrollment": 500}),
            json!({"year": 2020, "ncessch": "010000100278", "school_name": "Test High", "enrollment": null}),
        ];
        Table::from_records(rows.into_iter().filter_map(|v| v.as_object().cloned()).collect())
    }

    #[test]
    fn write_csv_and_json() {
        let dir = tempdir().unwrap();
        let csvp = dir.path().join("x.csv");
        let jsonp = dir.path().join("x.json");
        let t = sample();
        save_csv(&t, &csvp).unwrap();
        save_json(&t, &jsonp).unwrap();
        assert!(csvp.exists());
        assert!(jsonp.exists());
    }

    #[test]
    fn csv_round_trip_keeps_types_and_leading_zeros() {
        let mut buf = Vec::new();
        write_csv(&sample(), &mut buf).unwrap();
        let back = read_csv(buf.as_slice()).unwrap();
        assert_eq!(back.columns(), ["year", "ncessch", "school_name", "enrollment"]);
        assert_eq!(back.get(0, "year"), Some(&json!(2020)));
        assert_eq!(back.get(0, "ncessch"), Some(&json!("010000100277")));
        assert_eq!(back.get(0, "school_name"), Some(&json!("Test, Elementary")));
        assert_eq!(back.get(1, "enrollment"), Some(&Value::Null));
    }

    #[test]
    fn typed_cells() {
        assert_eq!(typed_cell("12.5"), json!(12.5));
        assert_eq!(typed_cell("-3"), json!(-3));
        assert_eq!(typed_cell("0.25"), json!(0.25));
        assert_eq!(typed_cell("007"), json!("007"));
        assert_eq!(typed_cell(" pk "), json!("pk"));
    }
}
