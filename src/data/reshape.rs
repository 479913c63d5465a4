use std::collections::BTreeMap;

use super::model::{Table, Value};

/// Stable ascending sort by the given columns. Columns the table lacks are
/// ignored; with none left the table is returned as-is.
pub fn sort_by(table: &Table, columns: &[&str]) -> Table {
    let idx: Vec<usize> = columns.iter().filter_map(|c| table.column_index(c)).collect();
    if idx.is_empty() {
        return table.clone();
    }
    let rows = table.rows();
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| {
        idx.iter()
            .map(|&i| rows[a][i].cmp(&rows[b][i]))
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    table.take_rows(order)
}

/// Projection onto `columns`, in the order given. Absent columns are left
/// out of the result.
pub fn select(table: &Table, columns: &[&str]) -> Table {
    let picked: Vec<(usize, &str)> = columns
        .iter()
        .filter_map(|c| table.column_index(c).map(|i| (i, *c)))
        .collect();
    let mut out = Table::new(picked.iter().map(|(_, name)| *name));
    for row in table.rows() {
        let projected = picked.iter().map(|(i, _)| row[*i].clone()).collect();
        if let Err(err) = out.push_row(projected) {
            log::warn!("select: {err}");
        }
    }
    out
}

/// Keep the last `n` rows of every distinct `group_key` value, preserving
/// the table's existing row order. A table without `group_key` yields an
/// empty table.
pub fn top_n_per_group(table: &Table, group_key: &str, n: usize) -> Table {
    let Some(key) = table.column_index(group_key) else {
        log::debug!("top_n_per_group: no '{group_key}' column");
        return Table::new(table.columns().iter().cloned());
    };
    let mut remaining: BTreeMap<&Value, usize> = BTreeMap::new();
    for row in table.rows() {
        *remaining.entry(&row[key]).or_default() += 1;
    }
    // Walk forward; skip a row while its group still has more than n left.
    let kept = table.rows().iter().enumerate().filter_map(|(i, row)| {
        let left = remaining.get_mut(&row[key])?;
        let keep = *left <= n;
        *left -= 1;
        keep.then_some(i)
    });
    let kept: Vec<usize> = kept.collect();
    table.take_rows(kept)
}
