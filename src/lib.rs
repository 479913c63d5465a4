//! Business metrics query service.
//!
//! Loads tabular business data (CSV, JSON or Parquet), filters and
//! aggregates it, and serves the results as JSON or CSV over HTTP.

pub mod api;
pub mod config;
pub mod data;
pub mod state;
