/// Data layer: core types, loading, and the query engine.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  FilterSpec → filtered Table
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  group-by + reducers, cross-tabulation
///   └───────────┘
///        │
///        ▼
///   ┌───────────────────┐
///   │ derived / reshape  │  percent change, top-N, sort, select
///   └───────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  Table → CSV bytes
///   └──────────┘
/// ```

pub mod aggregate;
pub mod derived;
pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod reshape;

pub use aggregate::{AggregationSpec, Reducer, cross_tabulate, group_and_aggregate, reduce_column};
pub use derived::{PercentChange, normalized_score, percent_change, period_over_period, safe_ratio};
pub use error::QueryError;
pub use filter::{FilterSpec, filter};
pub use model::{Row, Table, Value};
pub use reshape::{select, sort_by, top_n_per_group};
