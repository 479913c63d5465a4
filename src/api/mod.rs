//! HTTP surface: route tables, query parsing and report rendering.

pub mod params;
pub mod reports;
pub mod routes;
pub mod synthetic;
pub mod variants;

pub use routes::{router, run_server};
