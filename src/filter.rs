//! Client-side row filtering, used after a bulk CSV download where the
//! server cannot filter for us.

use crate::models::Filters;
use crate::table::Table;

/// Keep rows whose cells match every filter.
///
/// A list value matches any of its elements. Filters naming a column the
/// table does not have are skipped, as are `Null` filters. Row order and the
/// column set are preserved.
pub fn apply_filters(table: &Table, filters: &Filters) -> Table {
    let active: Vec<_> = filters
        .iter()
        .filter(|(col, v)| !v.is_null() && table.has_column(col.as_str()))
        .collect();

    let mut out = table.clone();
    if active.is_empty() {
        return out;
    }
    out.retain(|row| {
        active.iter().all(|(col, v)| {
            row.get(col.as_str())
                .is_some_and(|cell| v.matches(cell))
        })
    });
    out
}
