//! Report definitions: each turns a (filtered) table into a response body.
//!
//! Reports never fail on missing data. An absent column drops the fields
//! that depend on it, an empty table gives `[]` or `{}`, and a zero
//! denominator gives `null`.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Local};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue, json};

use crate::api::synthetic::{KpiJitter, SyntheticSource};
use crate::data::export::to_csv_bytes;
use crate::data::model::{DATE_COLUMN, RowRef, round_to};
use crate::data::{
    AggregationSpec, FilterSpec, PercentChange, Reducer, Table, Value, cross_tabulate, filter,
    group_and_aggregate, normalized_score, period_over_period, reduce_column, safe_ratio, select,
    top_n_per_group,
};

use Reducer::{Max, Mean, Std, Sum};

/// Month label used by the monthly summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthStyle {
    /// `January 2024`, with satisfaction and ROI averages.
    Detailed,
    /// `Jan 2024`, totals only.
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    Rows,
    Export,
    Filters,
    Kpis,
    RevenueTrend,
    MonthlySummary(MonthStyle),
    QuarterlyAnalysis,
    AnnualSummary,
    RegionPerformance,
    ProductMix,
    DepartmentPerformance,
    RegionDistribution,
    RevenueExpense,
    EmployeePerformance,
    QuarterlyTrends,
    DepartmentComparison,
    RegionalHeatmap,
    Profitability,
    AdvancedKpis,
    RollingMetrics,
    CompetitiveAnalysis,
    YtdPerformance,
}

/// A rendered report body.
#[derive(Debug)]
pub enum ReportOutput {
    Json(JsonValue),
    Csv(Vec<u8>),
}

/// Per-request inputs a report may need besides the table.
pub struct ReportContext<'a> {
    pub synthetic: &'a SyntheticSource,
    pub jitter: &'a KpiJitter,
    pub now: DateTime<Local>,
    /// Columns listed by the filters report.
    pub filter_columns: &'a [&'a str],
}

fn to_json<T: Serialize>(body: &T) -> Result<ReportOutput> {
    let value = serde_json::to_value(body).context("serializing report")?;
    Ok(ReportOutput::Json(value))
}

/// Apply `spec` to `table` and run `report` over the result.
///
/// The filters report lists options from the unfiltered table.
pub fn render(
    report: Report,
    table: &Table,
    spec: &FilterSpec,
    ctx: &ReportContext<'_>,
) -> Result<ReportOutput> {
    let filtered;
    let table = if spec.is_empty() || report == Report::Filters {
        table
    } else {
        filtered = filter(table, spec);
        &filtered
    };

    match report {
        Report::Filters => to_json(&filter_options(table, ctx.filter_columns)),
        Report::Rows => to_json(table),
        Report::Export => Ok(ReportOutput::Csv(to_csv_bytes(table)?)),
        Report::Kpis => {
            let mut body = kpis(table, &ctx.now.to_rfc3339());
            if !body.is_empty() {
                ctx.jitter.apply(&mut body);
            }
            Ok(ReportOutput::Json(JsonValue::Object(body)))
        }
        Report::RevenueTrend => to_json(&revenue_trend(table)),
        Report::MonthlySummary(style) => to_json(&monthly_summary(table, style)),
        Report::QuarterlyAnalysis => to_json(&quarterly_analysis(table)),
        Report::AnnualSummary => match annual_summary(table) {
            Some(summary) => to_json(&summary),
            None => Ok(ReportOutput::Json(json!({}))),
        },
        Report::RegionPerformance => to_json(&region_performance(table)),
        Report::ProductMix => to_json(&product_mix(table)),
        Report::DepartmentPerformance => to_json(&department_performance(table)),
        Report::RegionDistribution => to_json(&region_distribution(table)),
        Report::RevenueExpense => to_json(&revenue_expense(table)),
        Report::EmployeePerformance => to_json(&employee_performance(table)),
        Report::QuarterlyTrends => to_json(&quarterly_trends(table)),
        Report::DepartmentComparison => to_json(&department_comparison(table, ctx.synthetic)),
        Report::RegionalHeatmap => to_json(&regional_heatmap(table)),
        Report::Profitability => to_json(&profitability(table, ctx.synthetic)),
        Report::AdvancedKpis => to_json(&advanced_kpis(table)),
        Report::RollingMetrics => to_json(&rolling_metrics(table)),
        Report::CompetitiveAnalysis => to_json(&competitive_analysis(table)),
        Report::YtdPerformance => to_json(&ytd_performance(table, ctx.now.year())),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Group and aggregate, or an empty table when none of the aggregated
/// columns exist.
fn aggregate_or_empty(table: &Table, spec: &AggregationSpec) -> Table {
    if !spec.aggregations.iter().any(|a| table.has_column(&a.column)) {
        return Table::default();
    }
    group_and_aggregate(table, spec)
}

fn numeric(table: &Table, column: &str, reducer: Reducer) -> Option<f64> {
    reduce_column(table, column, reducer).and_then(|v| v.as_f64())
}

fn rounded(value: Option<f64>, places: i32) -> Option<f64> {
    value.filter(|v| v.is_finite()).map(|v| round_to(v, places))
}

fn rows_where(table: &Table, column: &str, keep: impl Fn(&Value) -> bool) -> Table {
    let Some(idx) = table.column_index(column) else {
        return Table::default();
    };
    let kept: Vec<usize> = table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| keep(&row[idx]))
        .map(|(i, _)| i)
        .collect();
    table.take_rows(kept)
}

// ---------------------------------------------------------------------------
// Filter options
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct DateRange {
    pub min: Value,
    pub max: Value,
}

/// Distinct values a client can filter on.
#[derive(Debug, Serialize)]
pub struct FilterOptions {
    pub options: BTreeMap<String, Vec<Value>>,
    pub date_range: Option<DateRange>,
}

pub fn filter_options(table: &Table, columns: &[&str]) -> FilterOptions {
    let options = columns
        .iter()
        .filter(|c| table.has_column(c))
        .map(|c| {
            let values = table
                .distinct_values(c)
                .into_iter()
                .filter(|v| !v.is_null())
                .collect();
            (c.to_string(), values)
        })
        .collect();
    let date_range = match (
        reduce_column(table, DATE_COLUMN, Reducer::Min),
        reduce_column(table, DATE_COLUMN, Reducer::Max),
    ) {
        (Some(min), Some(max)) if !min.is_null() => Some(DateRange { min, max }),
        _ => None,
    };
    FilterOptions { options, date_range }
}

// ---------------------------------------------------------------------------
// KPIs
// ---------------------------------------------------------------------------

/// Column averages reported as KPIs: (output, column, decimal places).
const KPI_AVERAGES: &[(&str, &str, i32)] = &[
    ("avg_performance", "performance_score", 1),
    ("avg_roi", "roi", 1),
    ("expense_efficiency", "expense_efficiency", 2),
    ("revenue_per_customer", "revenue_per_customer", 2),
    ("avg_customer_satisfaction", "customer_satisfaction", 1),
    ("avg_nps", "nps", 1),
    ("avg_esg_score", "esg_score", 1),
    ("market_share_avg", "market_share", 1),
    ("revenue_growth", "growth_rate", 1),
    ("customer_growth", "customer_growth_rate", 1),
];

/// Headline totals and averages over the whole table.
///
/// A field is present only when the columns it is computed from exist; an
/// empty table yields an empty object.
pub fn kpis(table: &Table, last_updated: &str) -> Map<String, JsonValue> {
    let mut out = Map::new();
    if table.is_empty() {
        return out;
    }

    let has = |column: &str| table.has_column(column);
    let revenue = numeric(table, "revenue", Sum);
    let expenses = numeric(table, "expenses", Sum);
    let profit = if has("profit") {
        numeric(table, "profit", Sum)
    } else {
        revenue.zip(expenses).map(|(r, e)| r - e)
    };

    if has("revenue") {
        out.insert("total_revenue".into(), json!(rounded(revenue, 2)));
    }
    if has("expenses") {
        out.insert("total_expenses".into(), json!(rounded(expenses, 2)));
    }
    if has("profit") || (has("revenue") && has("expenses")) {
        out.insert("total_profit".into(), json!(rounded(profit, 2)));
    }
    if has("employees") {
        let employees = numeric(table, "employees", Sum).map(|v| v.round() as i64);
        out.insert("total_employees".into(), json!(employees));
    }

    if has("profit_margin") {
        let margin = numeric(table, "profit_margin", Mean);
        out.insert("profit_margin".into(), json!(rounded(margin, 1)));
    } else if has("revenue") {
        let margin = profit
            .zip(revenue)
            .and_then(|(p, r)| safe_ratio(p, r))
            .map(|ratio| ratio * 100.0);
        out.insert("profit_margin".into(), json!(rounded(margin, 1)));
    }

    for (output, column, places) in KPI_AVERAGES {
        if table.has_column(column) {
            let mean = numeric(table, column, Mean);
            out.insert(output.to_string(), json!(rounded(mean, *places)));
        }
    }

    out.insert("last_updated".into(), json!(last_updated));
    out
}

// ---------------------------------------------------------------------------
// Time series
// ---------------------------------------------------------------------------

pub fn revenue_trend(table: &Table) -> Table {
    aggregate_or_empty(table, &AggregationSpec::by([DATE_COLUMN]).agg("revenue", Sum))
}

pub fn revenue_expense(table: &Table) -> Table {
    let spec = AggregationSpec::by([DATE_COLUMN])
        .agg("revenue", Sum)
        .agg("expenses", Sum);
    aggregate_or_empty(table, &spec)
}

fn month_label(row: RowRef<'_>, format: &str) -> Value {
    row.get_or_null(DATE_COLUMN)
        .as_date()
        .map(|d| d.format(format).to_string())
        .into()
}

/// Calendar-month totals with month-over-month growth of revenue and profit.
pub fn monthly_summary(table: &Table, style: MonthStyle) -> Table {
    if !table.has_column(DATE_COLUMN) {
        return Table::default();
    }
    let name_format = match style {
        MonthStyle::Detailed => "%B %Y",
        MonthStyle::Compact => "%b %Y",
    };
    let by_month = table
        .with_column("month_year", |row| month_label(row, "%Y-%m"))
        .with_column("month_name", |row| month_label(row, name_format));

    let mut spec = AggregationSpec::by(["month_year", "month_name"])
        .agg("revenue", Sum)
        .agg("expenses", Sum)
        .agg("profit", Sum)
        .agg("employees", Sum);
    if style == MonthStyle::Detailed {
        spec = spec
            .agg("performance_score", Mean)
            .agg("customer_satisfaction", Mean)
            .agg("roi", Mean);
    }

    let monthly = aggregate_or_empty(&by_month, &spec);
    period_over_period(
        &monthly,
        &[
            PercentChange::new("revenue", "revenue_growth"),
            PercentChange::new("profit", "profit_growth"),
        ],
        &["month_year"],
    )
}

pub fn quarterly_analysis(table: &Table) -> Table {
    let spec = AggregationSpec::by(["quarter", "year", "quarter_num"])
        .agg_each("revenue", &[Sum, Mean, Std])
        .agg_each("expenses", &[Sum, Mean])
        .agg_each("profit", &[Sum, Mean])
        .agg_each("employees", &[Sum, Mean])
        .agg_each("performance_score", &[Mean, Std])
        .agg_each("customer_satisfaction", &[Mean])
        .agg_each("roi", &[Mean])
        .agg_each("market_share", &[Mean])
        .agg_each("growth_rate", &[Mean]);
    let quarters = aggregate_or_empty(table, &spec);
    period_over_period(
        &quarters,
        &[
            PercentChange::new("revenue_sum", "revenue_qoq_growth"),
            PercentChange::new("profit_sum", "profit_qoq_growth"),
        ],
        &["year", "quarter_num"],
    )
}

pub fn quarterly_trends(table: &Table) -> Table {
    let spec = AggregationSpec::by(["quarter"])
        .agg("revenue", Sum)
        .agg("expenses", Sum);
    aggregate_or_empty(table, &spec)
}

pub fn advanced_kpis(table: &Table) -> Table {
    let mut spec = AggregationSpec::by(["quarter"]);
    for column in [
        "roi",
        "expense_efficiency",
        "customer_satisfaction",
        "nps",
        "esg_score",
        "profit_margin",
    ] {
        spec = spec.agg(column, Mean);
    }
    aggregate_or_empty(table, &spec)
}

// ---------------------------------------------------------------------------
// Annual summary
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct AnnualSummary {
    pub annual_summary: Table,
    pub department_breakdown: Table,
    pub region_breakdown: Table,
    pub total_years: usize,
    pub latest_year: Value,
    pub total_revenue_all_years: Value,
}

/// Per-year totals with year-over-year growth, plus revenue broken down by
/// department and region. `None` for an empty table.
pub fn annual_summary(table: &Table) -> Option<AnnualSummary> {
    if table.is_empty() {
        return None;
    }
    let mut spec = AggregationSpec::by(["year"]);
    for column in ["revenue", "expenses", "profit", "employees"] {
        spec = spec.agg_each(column, &[Sum, Mean]);
    }
    for column in [
        "performance_score",
        "customer_satisfaction",
        "roi",
        "market_share",
        "growth_rate",
        "nps",
        "esg_score",
    ] {
        spec = spec.agg_each(column, &[Mean]);
    }

    let years = period_over_period(
        &aggregate_or_empty(table, &spec),
        &[
            PercentChange::new("revenue_sum", "revenue_yoy_growth"),
            PercentChange::new("profit_sum", "profit_yoy_growth"),
        ],
        &["year"],
    );
    let breakdown = |key: &str| {
        aggregate_or_empty(table, &AggregationSpec::by(["year", key]).agg("revenue", Sum))
    };

    Some(AnnualSummary {
        department_breakdown: breakdown("department"),
        region_breakdown: breakdown("region"),
        total_years: years.len(),
        latest_year: reduce_column(&years, "year", Max).unwrap_or(Value::Null),
        total_revenue_all_years: reduce_column(&years, "revenue_sum", Sum).unwrap_or(Value::Null),
        annual_summary: years,
    })
}

// ---------------------------------------------------------------------------
// Breakdowns by region / department / product
// ---------------------------------------------------------------------------

pub fn region_performance(table: &Table) -> Table {
    let spec = AggregationSpec::by(["region"])
        .agg("revenue", Sum)
        .agg("expenses", Sum)
        .agg("employees", Sum);
    aggregate_or_empty(table, &spec)
}

pub fn region_distribution(table: &Table) -> Table {
    aggregate_or_empty(table, &AggregationSpec::by(["region"]).agg("revenue", Sum))
}

/// Revenue per product, or per department for tables without products.
pub fn product_mix(table: &Table) -> Table {
    let key = if table.has_column("product") {
        "product"
    } else {
        "department"
    };
    aggregate_or_empty(table, &AggregationSpec::by([key]).agg("revenue", Sum))
}

pub fn department_performance(table: &Table) -> Table {
    let spec = AggregationSpec::by(["department"])
        .agg("revenue", Sum)
        .agg("expenses", Sum)
        .agg("employees", Sum)
        .agg("performance_score", Mean);
    aggregate_or_empty(table, &spec)
}

pub fn employee_performance(table: &Table) -> Table {
    let spec = AggregationSpec::by(["department"])
        .agg("employees", Sum)
        .agg("performance_score", Mean);
    aggregate_or_empty(table, &spec)
}

/// Mean performance score per (region, department) cell.
pub fn regional_heatmap(table: &Table) -> Table {
    cross_tabulate(table, "region", "department", "performance_score", Mean)
}

// ---------------------------------------------------------------------------
// Department scorecards
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ComparisonPlaceholders {
    pub growth_score: f64,
    pub innovation_score: f64,
}

#[derive(Debug, Serialize)]
pub struct DepartmentScore {
    pub department: Value,
    pub revenue_score: Option<f64>,
    pub efficiency_score: Option<f64>,
    pub performance_score: Option<f64>,
    pub synthetic: ComparisonPlaceholders,
}

/// Per-department revenue share and expense efficiency on a 0-100 scale.
pub fn department_comparison(table: &Table, synthetic: &SyntheticSource) -> Vec<DepartmentScore> {
    let spec = AggregationSpec::by(["department"])
        .agg("revenue", Sum)
        .agg("expenses", Sum)
        .agg("performance_score", Mean);
    let departments = group_and_aggregate(table, &spec);
    let total_revenue = numeric(table, "revenue", Sum);

    departments
        .iter_rows()
        .map(|row| {
            let revenue = row.get_or_null("revenue").as_f64();
            let expenses = row.get_or_null("expenses").as_f64();
            let revenue_score = revenue
                .zip(total_revenue)
                .map(|(r, total)| normalized_score(r, total, 500.0, 100.0));
            let efficiency_score = expenses
                .zip(revenue)
                .and_then(|(e, r)| safe_ratio(e, r))
                .map(|ratio| (100.0 - ratio * 100.0).max(0.0));
            DepartmentScore {
                department: row.get_or_null("department").clone(),
                revenue_score: rounded(revenue_score, 1),
                efficiency_score: rounded(efficiency_score, 1),
                performance_score: rounded(row.get_or_null("performance_score").as_f64(), 1),
                synthetic: ComparisonPlaceholders {
                    growth_score: synthetic.uniform(60.0, 95.0),
                    innovation_score: synthetic.uniform(70.0, 98.0),
                },
            }
        })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct ProfitabilityPlaceholders {
    pub market_share: f64,
}

#[derive(Debug, Serialize)]
pub struct ProfitabilityPoint {
    pub department: Value,
    /// Revenue in millions.
    pub revenue: Option<f64>,
    pub profit_margin: Option<f64>,
    pub synthetic: ProfitabilityPlaceholders,
}

pub fn profitability(table: &Table, synthetic: &SyntheticSource) -> Vec<ProfitabilityPoint> {
    let spec = AggregationSpec::by(["department"])
        .agg("revenue", Sum)
        .agg("expenses", Sum);
    group_and_aggregate(table, &spec)
        .iter_rows()
        .map(|row| {
            let revenue = row.get_or_null("revenue").as_f64();
            let expenses = row.get_or_null("expenses").as_f64();
            let margin = revenue
                .zip(expenses)
                .and_then(|(r, e)| safe_ratio(r - e, r))
                .map(|ratio| ratio * 100.0);
            ProfitabilityPoint {
                department: row.get_or_null("department").clone(),
                revenue: rounded(revenue.map(|r| r / 1_000_000.0), 1),
                profit_margin: rounded(margin, 1),
                synthetic: ProfitabilityPlaceholders {
                    market_share: synthetic.uniform(10.0, 30.0),
                },
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Latest-period snapshots
// ---------------------------------------------------------------------------

/// The most recent rolling averages per department.
pub fn rolling_metrics(table: &Table) -> Table {
    if !table.has_column("rolling_revenue_avg") {
        return Table::default();
    }
    select(
        &top_n_per_group(table, "department", 1),
        &["department", "rolling_revenue_avg", "rolling_profit_avg", "profit_volatility"],
    )
}

/// Competitiveness rows for the latest quarter in the table.
pub fn competitive_analysis(table: &Table) -> Table {
    if !table.has_column("region_competitiveness_index") {
        return Table::default();
    }
    let latest = match reduce_column(table, "quarter", Max) {
        Some(latest) if !latest.is_null() => latest,
        _ => return Table::default(),
    };
    select(
        &rows_where(table, "quarter", |q| *q == latest),
        &["department", "region", "region_competitiveness_index", "profit_rank", "market_share"],
    )
}

/// Year-to-date peaks per department for `current_year`, or for the latest
/// year in the table when `current_year` has no rows.
pub fn ytd_performance(table: &Table, current_year: i32) -> Table {
    if !table.has_column("ytd_revenue") {
        return Table::default();
    }
    let target = Value::Integer(i64::from(current_year));
    let mut rows = rows_where(table, "year", |y| *y == target);
    if rows.is_empty() {
        let Some(latest) = reduce_column(table, "year", Max).filter(|v| !v.is_null()) else {
            return Table::default();
        };
        rows = rows_where(table, "year", |y| *y == latest);
    }
    let spec = AggregationSpec::by(["department"])
        .agg("ytd_revenue", Max)
        .agg("ytd_profit", Max)
        .agg("quarter_num", Max);
    aggregate_or_empty(&rows, &spec)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(y, m, day).unwrap())
    }

    /// Date, `[region, department, quarter]`, `[year, quarter_num, revenue,
    /// expenses, profit, employees]` and a performance score.
    fn row(date: (i32, u32, u32), labels: [&str; 3], numbers: [i64; 6], score: f64) -> Vec<Value> {
        let mut cells = vec![d(date.0, date.1, date.2)];
        cells.extend(labels.into_iter().map(Value::from));
        cells.extend(numbers.into_iter().map(Value::Integer));
        cells.push(Value::Float(score));
        cells
    }

    fn business() -> Table {
        Table::from_rows(
            [
                "date", "region", "department", "quarter", "year", "quarter_num", "revenue",
                "expenses", "profit", "employees", "performance_score",
            ],
            vec![
                row((2023, 12, 1), ["East", "Sales", "2023-Q4"], [2023, 4, 100, 60, 40, 10], 80.0),
                row((2024, 1, 1), ["East", "Sales", "2024-Q1"], [2024, 1, 150, 90, 60, 12], 90.0),
                row((2024, 1, 15), ["West", "IT", "2024-Q1"], [2024, 1, 50, 50, 0, 5], 70.0),
                row((2024, 2, 1), ["West", "IT", "2024-Q1"], [2024, 1, 200, 100, 100, 6], 75.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn kpis_totals_and_margin() {
        let k = kpis(&business(), "now");
        assert_eq!(k["total_revenue"], json!(500.0));
        assert_eq!(k["total_expenses"], json!(300.0));
        assert_eq!(k["total_profit"], json!(200.0));
        assert_eq!(k["total_employees"], json!(33));
        assert_eq!(k["profit_margin"], json!(40.0));
        assert_eq!(k["avg_performance"], json!(78.8));
        assert_eq!(k["last_updated"], json!("now"));
        assert!(!k.contains_key("avg_roi"));
    }

    #[test]
    fn kpis_margin_is_null_on_zero_revenue() {
        let table = Table::from_rows(
            ["revenue", "expenses"],
            vec![vec![Value::Integer(0), Value::Integer(10)]],
        )
        .unwrap();
        let k = kpis(&table, "now");
        assert_eq!(k["total_profit"], json!(-10.0));
        assert_eq!(k["profit_margin"], JsonValue::Null);
        assert!(!k.contains_key("total_employees"));
    }

    #[test]
    fn kpis_of_empty_table_is_empty_object() {
        assert!(kpis(&Table::default(), "now").is_empty());
    }

    #[test]
    fn monthly_summary_labels_and_growth() {
        let months = monthly_summary(&business(), MonthStyle::Detailed);
        let labels: Vec<&str> = months
            .column_values("month_name")
            .unwrap()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(labels, ["December 2023", "January 2024", "February 2024"]);
        let growth: Vec<Option<f64>> = months
            .column_values("revenue_growth")
            .unwrap()
            .map(Value::as_f64)
            .collect();
        assert_eq!(growth, [None, Some(100.0), Some(0.0)]);
        assert!(!months.has_column("roi"));

        let compact = monthly_summary(&business(), MonthStyle::Compact);
        assert_eq!(compact.value(0, "month_name"), Some(&Value::from("Dec 2023")));
        assert!(!compact.has_column("performance_score"));
    }

    #[test]
    fn quarterly_analysis_flattens_names_and_orders_by_period() {
        let quarters = quarterly_analysis(&business());
        assert_eq!(quarters.len(), 2);
        assert!(quarters.has_column("revenue_sum"));
        assert!(quarters.has_column("performance_score_std"));
        assert!(!quarters.has_column("roi_mean"));
        assert_eq!(quarters.value(0, "quarter"), Some(&Value::from("2023-Q4")));
        assert_eq!(quarters.value(1, "revenue_qoq_growth"), Some(&Value::Float(300.0)));
        assert_eq!(quarters.value(0, "revenue_qoq_growth"), Some(&Value::Null));
    }

    #[test]
    fn annual_summary_breakdowns() {
        let summary = annual_summary(&business()).unwrap();
        assert_eq!(summary.total_years, 2);
        assert_eq!(summary.latest_year, Value::Integer(2024));
        assert_eq!(summary.total_revenue_all_years, Value::Integer(500));
        assert_eq!(summary.department_breakdown.len(), 3);
        assert_eq!(summary.region_breakdown.len(), 3);
        assert!(annual_summary(&Table::default()).is_none());
    }

    #[test]
    fn product_mix_falls_back_to_department() {
        let mix = product_mix(&business());
        assert_eq!(mix.columns(), ["department", "revenue"]);
        assert_eq!(mix.value(0, "department"), Some(&Value::from("IT")));
        assert_eq!(mix.value(0, "revenue"), Some(&Value::Integer(250)));
    }

    #[test]
    fn breakdown_without_measures_is_empty() {
        let table = Table::from_rows(["region"], vec![vec!["East".into()]]).unwrap();
        assert!(region_performance(&table).is_empty());
        assert!(revenue_trend(&table).is_empty());
    }

    #[test]
    fn department_comparison_scores() {
        let synthetic = SyntheticSource::new(Some(1));
        let scores = department_comparison(&business(), &synthetic);
        assert_eq!(scores.len(), 2);
        let it = &scores[0];
        assert_eq!(it.department, Value::from("IT"));
        // 250 / 500 * 500 capped at 100
        assert_eq!(it.revenue_score, Some(100.0));
        // 100 - 150 / 250 * 100
        assert_eq!(it.efficiency_score, Some(40.0));
        assert_eq!(it.performance_score, Some(72.5));
        assert!((60.0..=95.0).contains(&it.synthetic.growth_score));
    }

    #[test]
    fn profitability_in_millions() {
        let synthetic = SyntheticSource::new(Some(1));
        let points = profitability(&business(), &synthetic);
        assert_eq!(points[1].department, Value::from("Sales"));
        assert_eq!(points[1].revenue, Some(0.0));
        assert_eq!(points[1].profit_margin, Some(40.0));
        assert!((10.0..=30.0).contains(&points[1].synthetic.market_share));
    }

    #[test]
    fn ytd_falls_back_to_latest_year() {
        let table = business()
            .with_column("ytd_revenue", |row| row.get_or_null("revenue").clone())
            .with_column("ytd_profit", |row| row.get_or_null("profit").clone());
        let ytd = ytd_performance(&table, 1999);
        assert_eq!(ytd.len(), 2);
        assert_eq!(ytd.value(0, "ytd_revenue"), Some(&Value::Integer(200)));
        let current = ytd_performance(&table, 2023);
        assert_eq!(current.len(), 1);
        assert!(ytd_performance(&business(), 2024).is_empty());
    }

    #[test]
    fn competitive_analysis_keeps_latest_quarter() {
        let table = business()
            .with_column("region_competitiveness_index", |_| Value::Float(1.0));
        let latest = competitive_analysis(&table);
        assert_eq!(latest.len(), 3);
        assert_eq!(latest.columns(), ["department", "region", "region_competitiveness_index"]);
    }

    #[test]
    fn rolling_metrics_takes_last_row_per_department() {
        let table = business().with_column("rolling_revenue_avg", |row| {
            row.get_or_null("revenue").clone()
        });
        let rolling = rolling_metrics(&table);
        assert_eq!(rolling.columns(), ["department", "rolling_revenue_avg"]);
        let values: Vec<&Value> = rolling.column_values("rolling_revenue_avg").unwrap().collect();
        assert_eq!(values, [&Value::Integer(150), &Value::Integer(200)]);
    }

    #[test]
    fn filters_report_lists_unfiltered_options() {
        let options = filter_options(&business(), &["region", "product"]);
        assert_eq!(options.options["region"], [Value::from("East"), Value::from("West")]);
        assert!(!options.options.contains_key("product"));
        let range = options.date_range.unwrap();
        assert_eq!(range.min, d(2023, 12, 1));
        assert_eq!(range.max, d(2024, 2, 1));
    }

    #[test]
    fn render_applies_filter_before_report() {
        let synthetic = SyntheticSource::new(Some(1));
        let jitter = KpiJitter::disabled();
        let ctx = ReportContext {
            synthetic: &synthetic,
            jitter: &jitter,
            now: Local::now(),
            filter_columns: &["region"],
        };
        let spec = FilterSpec::new().equal("region", "West");
        let ReportOutput::Json(body) =
            render(Report::RegionDistribution, &business(), &spec, &ctx).unwrap()
        else {
            panic!("expected JSON");
        };
        assert_eq!(body, json!([{ "region": "West", "revenue": 250 }]));

        let ReportOutput::Json(options) =
            render(Report::Filters, &business(), &spec, &ctx).unwrap()
        else {
            panic!("expected JSON");
        };
        assert_eq!(options["options"]["region"], json!(["East", "West"]));
    }
}
