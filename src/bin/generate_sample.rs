use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{Datelike, NaiveDate};
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use bizdash::config::DEFAULT_DATA_FILE;
use bizdash::data::Table;
use bizdash::data::export::{write_csv, write_parquet};
use bizdash::data::model::{Row, Value, round_to};

/// Write a synthetic enhanced business dataset.
#[derive(Parser, Debug)]
#[command(name = "generate-sample")]
struct Args {
    /// Output file; the extension picks the format (.csv or .parquet)
    #[arg(default_value = DEFAULT_DATA_FILE)]
    output: PathBuf,

    /// RNG seed, so the same arguments always produce the same file
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// First calendar year of data
    #[arg(long, default_value_t = 2023)]
    start_year: i32,

    /// Number of years, one row per month per region and department
    #[arg(long, default_value_t = 2)]
    years: u32,
}

/// Regions with a revenue scale factor.
const REGIONS: [(&str, f64); 4] = [
    ("North America", 1.3),
    ("Europe", 1.0),
    ("Asia Pacific", 1.1),
    ("Latin America", 0.6),
];

/// Departments with a baseline monthly revenue.
const DEPARTMENTS: [(&str, f64); 5] = [
    ("Sales", 2_400_000.0),
    ("Marketing", 1_100_000.0),
    ("Engineering", 3_000_000.0),
    ("Operations", 1_600_000.0),
    ("Support", 700_000.0),
];

const COLUMNS: [&str; 29] = [
    "date",
    "year",
    "month",
    "quarter",
    "quarter_num",
    "region",
    "department",
    "revenue",
    "expenses",
    "profit",
    "profit_margin",
    "employees",
    "performance_score",
    "customer_satisfaction",
    "roi",
    "market_share",
    "growth_rate",
    "nps",
    "esg_score",
    "expense_efficiency",
    "revenue_per_customer",
    "customer_growth_rate",
    "rolling_revenue_avg",
    "rolling_profit_avg",
    "profit_volatility",
    "region_competitiveness_index",
    "profit_rank",
    "ytd_revenue",
    "ytd_profit",
];

/// Rolling window, in months.
const WINDOW: usize = 3;

/// Per (region, department) history for rolling and year-to-date columns.
#[derive(Default)]
struct Series {
    revenue: Vec<f64>,
    profit: Vec<f64>,
    ytd_year: i32,
    ytd_revenue: f64,
    ytd_profit: f64,
}

fn window_mean(values: &[f64]) -> f64 {
    let tail = &values[values.len().saturating_sub(WINDOW)..];
    tail.iter().sum::<f64>() / tail.len().max(1) as f64
}

fn window_std(values: &[f64]) -> Value {
    let tail = &values[values.len().saturating_sub(WINDOW)..];
    if tail.len() < 2 {
        return Value::Null;
    }
    let mean = tail.iter().sum::<f64>() / tail.len() as f64;
    let var = tail.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (tail.len() - 1) as f64;
    Value::Float(round_to(var.sqrt(), 2))
}

fn money(v: f64) -> Value {
    Value::Float(round_to(v, 2))
}

/// Output format picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Csv,
    Parquet,
}

impl Format {
    fn for_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Ok(Format::Csv),
            "parquet" | "pq" => Ok(Format::Parquet),
            other => bail!("Unsupported output extension: .{other}"),
        }
    }
}

fn generate(args: &Args) -> Result<Table> {
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut history: HashMap<(usize, usize), Series> = HashMap::new();
    let mut table = Table::new(COLUMNS);
    let months = args.years * 12;
    let rank_idx = COLUMNS
        .iter()
        .position(|c| *c == "profit_rank")
        .context("no profit_rank column")?;

    for offset in 0..months {
        let year = args.start_year + (offset / 12) as i32;
        let month = offset % 12 + 1;
        let Some(date) = NaiveDate::from_ymd_opt(year, month, 1) else {
            bail!("invalid month {year}-{month}");
        };
        let quarter_num = (date.month0() / 3 + 1) as i64;
        let seasonal = 1.0 + 0.08 * (f64::from(month) / 12.0 * std::f64::consts::TAU).sin();
        let trend = 1.0 + 0.01 * f64::from(offset);

        for (r, (region, region_scale)) in REGIONS.iter().enumerate() {
            let competitiveness = round_to(region_scale * rng.gen_range(0.8..1.2), 2);
            let mut rows: Vec<(f64, Row)> = Vec::with_capacity(DEPARTMENTS.len());

            for (d, (department, base)) in DEPARTMENTS.iter().enumerate() {
                let revenue = base * region_scale * seasonal * trend * rng.gen_range(0.9..1.1);
                let expenses = revenue * rng.gen_range(0.55..0.85);
                let profit = revenue - expenses;
                let employees = (base * region_scale / 20_000.0) as i64 + rng.gen_range(-5..=5);

                let series = history.entry((r, d)).or_default();
                let growth = series
                    .revenue
                    .last()
                    .map(|prev| (revenue - prev) / prev * 100.0)
                    .unwrap_or(0.0);
                if series.ytd_year != year {
                    series.ytd_year = year;
                    series.ytd_revenue = 0.0;
                    series.ytd_profit = 0.0;
                }
                series.ytd_revenue += revenue;
                series.ytd_profit += profit;
                series.revenue.push(revenue);
                series.profit.push(profit);

                let row = vec![
                    Value::Date(date),
                    Value::Integer(i64::from(year)),
                    Value::Integer(i64::from(month)),
                    Value::String(format!("{year}-Q{quarter_num}")),
                    Value::Integer(quarter_num),
                    Value::from(*region),
                    Value::from(*department),
                    money(revenue),
                    money(expenses),
                    money(profit),
                    Value::Float(round_to(profit / revenue * 100.0, 2)),
                    Value::Integer(employees),
                    Value::Float(round_to(rng.gen_range(70.0..98.0), 1)),
                    Value::Float(round_to(rng.gen_range(3.5..5.0), 2)),
                    Value::Float(round_to(profit / expenses * 100.0, 2)),
                    Value::Float(round_to(rng.gen_range(5.0..35.0), 2)),
                    Value::Float(round_to(growth, 2)),
                    Value::Float(round_to(rng.gen_range(20.0..80.0), 1)),
                    Value::Float(round_to(rng.gen_range(50.0..95.0), 1)),
                    Value::Float(round_to(revenue / expenses, 2)),
                    money(rng.gen_range(800.0..1500.0)),
                    Value::Float(round_to(rng.gen_range(-2.0..12.0), 2)),
                    money(window_mean(&series.revenue)),
                    money(window_mean(&series.profit)),
                    window_std(&series.profit),
                    Value::Float(competitiveness),
                    // profit_rank, filled in below
                    Value::Null,
                    money(series.ytd_revenue),
                    money(series.ytd_profit),
                ];
                rows.push((profit, row));
            }

            // Rank departments within the region by profit, 1 = highest.
            let mut order: Vec<usize> = (0..rows.len()).collect();
            order.sort_by(|&a, &b| rows[b].0.total_cmp(&rows[a].0));
            for (rank, &i) in order.iter().enumerate() {
                rows[i].1[rank_idx] = Value::Integer(rank as i64 + 1);
            }
            for (_, row) in rows {
                table.push_row(row)?;
            }
        }
    }
    Ok(table)
}

/// Write `table` to `path`. The format is checked before anything is
/// created on disk.
fn write_output(table: &Table, path: &Path) -> Result<()> {
    let format = Format::for_path(path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let writer = BufWriter::new(file);
    match format {
        Format::Csv => write_csv(table, writer),
        Format::Parquet => write_parquet(table, writer),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    Format::for_path(&args.output)?;

    let table = generate(&args)?;
    write_output(&table, &args.output)?;

    log::info!(
        "wrote {} rows ({} regions x {} departments x {} months) to {}",
        table.len(),
        REGIONS.len(),
        DEPARTMENTS.len(),
        args.years * 12,
        args.output.display()
    );
    Ok(())
}
