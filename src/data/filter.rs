use std::collections::BTreeMap;

use super::model::{DATE_COLUMN, RowRef, Table, Value};

// ---------------------------------------------------------------------------
// Filter predicate: optional date bounds + per-column exact matches
// ---------------------------------------------------------------------------

/// Row predicate built from a request's query string.
///
/// Every field is optional; an absent bound or column means "no constraint".
/// Present predicates compose with logical AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    /// Inclusive lower bound on the `date` column (`YYYY-MM-DD` or a prefix).
    pub date_from: Option<String>,
    /// Inclusive upper bound on the `date` column.
    pub date_to: Option<String>,
    /// column_name → value the cell must match exactly.
    pub equals: BTreeMap<String, Value>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn date_from(mut self, bound: impl Into<String>) -> Self {
        self.date_from = Some(bound.into());
        self
    }

    pub fn date_to(mut self, bound: impl Into<String>) -> Self {
        self.date_to = Some(bound.into());
        self
    }

    pub fn equal(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.equals.insert(column.into(), value.into());
        self
    }

    /// Whether the spec constrains nothing.
    pub fn is_empty(&self) -> bool {
        self.date_from.is_none() && self.date_to.is_none() && self.equals.is_empty()
    }

    /// Whether a single row passes every predicate.
    ///
    /// Date bounds compare the canonical `YYYY-MM-DD` rendering of the cell,
    /// which orders chronologically. A null cell, or a column the table does
    /// not have, fails any predicate placed on it.
    pub fn accepts(&self, row: RowRef<'_>) -> bool {
        if self.date_from.is_some() || self.date_to.is_some() {
            let cell = row.get_or_null(DATE_COLUMN);
            if cell.is_null() {
                return false;
            }
            let rendered = cell.to_string();
            if let Some(from) = &self.date_from {
                if rendered.as_str() < from.as_str() {
                    return false;
                }
            }
            if let Some(to) = &self.date_to {
                if rendered.as_str() > to.as_str() {
                    return false;
                }
            }
        }
        self.equals
            .iter()
            .all(|(col, expected)| row.get_or_null(col).matches(expected))
    }
}

/// Return indices of rows that pass the filter.
pub fn filtered_indices(table: &Table, spec: &FilterSpec) -> Vec<usize> {
    table
        .iter_rows()
        .enumerate()
        .filter(|(_, row)| spec.accepts(*row))
        .map(|(i, _)| i)
        .collect()
}

/// New table holding only the rows that pass `spec`. The input is untouched.
pub fn filter(table: &Table, spec: &FilterSpec) -> Table {
    if spec.is_empty() {
        return table.clone();
    }
    let kept = filtered_indices(table, spec);
    log::debug!("filter kept {} of {} rows", kept.len(), table.len());
    table.take_rows(kept)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use proptest::prelude::*;

    use super::*;

    fn sample() -> Table {
        let d = |s: &str| Value::Date(NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap());
        let n = Value::Integer;
        Table::from_rows(
            ["date", "region", "department", "revenue", "year"],
            vec![
                vec![d("2024-01-01"), "East".into(), "Sales".into(), n(100), n(2024)],
                vec![d("2024-02-01"), "West".into(), "Sales".into(), n(200), n(2024)],
                vec![d("2024-03-01"), "East".into(), "Ops".into(), n(300), n(2024)],
                vec![Value::Null, "East".into(), Value::Null, n(50), n(2023)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn empty_spec_keeps_everything() {
        let table = sample();
        assert_eq!(filter(&table, &FilterSpec::new()), table);
    }

    #[test]
    fn equality_predicates_compose_with_and() {
        let spec = FilterSpec::new().equal("region", "East").equal("department", "Sales");
        let out = filter(&sample(), &spec);
        assert_eq!(out.len(), 1);
        assert_eq!(out.value(0, "revenue"), Some(&Value::Integer(100)));
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let spec = FilterSpec::new().date_from("2024-02-01").date_to("2024-03-01");
        let out = filter(&sample(), &spec);
        assert_eq!(out.len(), 2);
        assert_eq!(out.value(0, "region"), Some(&Value::from("West")));
    }

    #[test]
    fn month_prefix_bound_works_lexicographically() {
        let out = filter(&sample(), &FilterSpec::new().date_to("2024-02"));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn null_and_absent_cells_fail_predicates() {
        let table = sample();
        assert_eq!(filter(&table, &FilterSpec::new().date_from("2000-01-01")).len(), 3);
        assert!(filter(&table, &FilterSpec::new().equal("product", "Widget")).is_empty());
    }

    #[test]
    fn query_text_matches_integer_column() {
        let out = filter(&sample(), &FilterSpec::new().equal("year", "2023"));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn filter_is_idempotent() {
        let table = sample();
        let spec = FilterSpec::new().equal("region", "East").date_from("2024-01-01");
        let once = filter(&table, &spec);
        assert_eq!(filter(&once, &spec), once);
    }

    const REGIONS: [&str; 3] = ["East", "West", "North"];

    fn day(n: u32) -> String {
        format!("2024-01-{n:02}")
    }

    proptest! {
        #[test]
        fn filtering_twice_equals_filtering_once(
            rows in proptest::collection::vec(
                (
                    proptest::option::of(1u32..29),
                    proptest::option::of(0usize..3),
                    2023i64..2026,
                ),
                0..40,
            ),
            region in proptest::option::of(0usize..3),
            year in proptest::option::of(2023i64..2026),
            from in proptest::option::of(1u32..29),
            to in proptest::option::of(1u32..29),
        ) {
            let table = Table::from_rows(
                ["date", "region", "year"],
                rows.iter()
                    .map(|(d, r, y)| {
                        vec![
                            Value::from(d.map(|d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap())),
                            Value::from(r.map(|r| REGIONS[r])),
                            Value::Integer(*y),
                        ]
                    })
                    .collect(),
            )
            .unwrap();

            let mut spec = FilterSpec::new();
            if let Some(r) = region {
                spec = spec.equal("region", REGIONS[r]);
            }
            if let Some(y) = year {
                spec = spec.equal("year", y.to_string());
            }
            if let Some(f) = from {
                spec = spec.date_from(day(f));
            }
            if let Some(t) = to {
                spec = spec.date_to(day(t));
            }

            let once = filter(&table, &spec);
            prop_assert!(once.len() <= table.len());
            prop_assert_eq!(filter(&once, &spec), once);
        }
    }
}
