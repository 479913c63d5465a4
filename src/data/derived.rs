use super::model::{Table, Value};
use super::reshape::sort_by;

// ---------------------------------------------------------------------------
// Period-over-period percent change
// ---------------------------------------------------------------------------

/// A derived percent-change column: `output` is computed from `metric`.
#[derive(Debug, Clone, PartialEq)]
pub struct PercentChange {
    pub metric: String,
    pub output: String,
}

impl PercentChange {
    pub fn new(metric: &str, output: &str) -> Self {
        PercentChange {
            metric: metric.to_string(),
            output: output.to_string(),
        }
    }
}

/// `(curr - prev) / prev * 100`, or `None` when either side is missing or
/// the previous value is zero.
pub fn percent_change(prev: Option<f64>, curr: Option<f64>) -> Option<f64> {
    let (prev, curr) = (prev?, curr?);
    if prev == 0.0 {
        return None;
    }
    let change = (curr - prev) / prev * 100.0;
    change.is_finite().then_some(change)
}

/// Sort by `order_by` (stable, so an already-sorted table is unchanged) and
/// append one percent-change column per metric.
///
/// The first row's derived value is null, as is any row whose previous
/// value is zero or null. Metrics the table lacks are skipped.
pub fn period_over_period(table: &Table, metrics: &[PercentChange], order_by: &[&str]) -> Table {
    let mut out = sort_by(table, order_by);
    for change in metrics {
        let Some(idx) = out.column_index(&change.metric) else {
            log::debug!("no '{}' column for '{}'", change.metric, change.output);
            continue;
        };
        let series: Vec<Option<f64>> = out.rows().iter().map(|r| r[idx].as_f64()).collect();
        let mut position = 0usize;
        out = out.with_column(&change.output, |_| {
            let value = match position {
                0 => None,
                i => percent_change(series[i - 1], series[i]),
            };
            position += 1;
            Value::from(value)
        });
    }
    out
}

// ---------------------------------------------------------------------------
// Scalar helpers
// ---------------------------------------------------------------------------

/// `min(cap, value / total * scale)`, or 0 when `total` is 0 or the result
/// is not a finite number.
pub fn normalized_score(value: f64, total: f64, scale: f64, cap: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    let score = (value / total * scale).min(cap);
    if score.is_finite() { score } else { 0.0 }
}

/// `numerator / denominator`, `None` on a zero denominator.
pub fn safe_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    let ratio = numerator / denominator;
    ratio.is_finite().then_some(ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monthly(values: &[Option<i64>]) -> Table {
        Table::from_rows(
            ["month", "revenue"],
            values
                .iter()
                .enumerate()
                .map(|(i, v)| vec![Value::String(format!("2024-{:02}", i + 1)), Value::from(*v)])
                .collect(),
        )
        .unwrap()
    }

    fn derived(table: &Table, column: &str) -> Vec<Option<f64>> {
        table
            .column_values(column)
            .unwrap()
            .map(Value::as_f64)
            .collect()
    }

    #[test]
    fn zero_denominator_is_null() {
        let table = monthly(&[Some(100), Some(150), Some(0), Some(50)]);
        let growth = [PercentChange::new("revenue", "growth")];
        let out = period_over_period(&table, &growth, &["month"]);
        assert_eq!(derived(&out, "growth"), [None, Some(50.0), Some(-100.0), None]);
    }

    #[test]
    fn sorts_by_order_column_first() {
        let table = Table::from_rows(
            ["month", "revenue"],
            vec![
                vec!["2024-02".into(), Value::Integer(200)],
                vec!["2024-01".into(), Value::Integer(100)],
            ],
        )
        .unwrap();
        let growth = [PercentChange::new("revenue", "growth")];
        let out = period_over_period(&table, &growth, &["month"]);
        assert_eq!(out.value(0, "month"), Some(&Value::from("2024-01")));
        assert_eq!(derived(&out, "growth"), [None, Some(100.0)]);
    }

    #[test]
    fn null_neighbours_and_missing_metrics() {
        let table = monthly(&[Some(100), None, Some(50)]);
        let out = period_over_period(
            &table,
            &[
                PercentChange::new("revenue", "growth"),
                PercentChange::new("profit", "profit_growth"),
            ],
            &["month"],
        );
        assert_eq!(derived(&out, "growth"), [None, None, None]);
        assert!(!out.has_column("profit_growth"));
    }

    #[test]
    fn empty_table_passes_through() {
        let table = Table::new(["month", "revenue"]);
        let out = period_over_period(&table, &[PercentChange::new("revenue", "g")], &["month"]);
        assert!(out.is_empty());
        assert!(out.has_column("g"));
    }

    #[test]
    fn normalized_score_caps_and_guards() {
        assert_eq!(normalized_score(10.0, 100.0, 500.0, 100.0), 50.0);
        assert_eq!(normalized_score(50.0, 100.0, 500.0, 100.0), 100.0);
        assert_eq!(normalized_score(50.0, 0.0, 500.0, 100.0), 0.0);
    }

    #[test]
    fn safe_ratio_guards_zero() {
        assert_eq!(safe_ratio(1.0, 4.0), Some(0.25));
        assert_eq!(safe_ratio(1.0, 0.0), None);
    }
}
