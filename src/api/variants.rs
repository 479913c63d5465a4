//! Route tables for the three API surfaces.
//!
//! Each variant pairs a data source and its filterable columns with the
//! list of reports it exposes. The report functions themselves are shared.

use crate::api::reports::{MonthStyle, Report};
use crate::state::SourceId;

/// Schema descriptor plus route table for one API surface.
#[derive(Debug)]
pub struct Variant {
    pub name: &'static str,
    /// Path prefix every route of this variant hangs off.
    pub prefix: &'static str,
    pub source: SourceId,
    /// Categorical query parameters this variant honours.
    pub filter_columns: &'static [&'static str],
    /// File name offered for CSV downloads.
    pub export_name: &'static str,
    pub routes: &'static [(&'static str, Report)],
}

impl Variant {
    pub fn path(&self, route: &str) -> String {
        format!("{}{}", self.prefix, route)
    }
}

pub static SALES: Variant = Variant {
    name: "sales",
    prefix: "/api",
    source: SourceId::Sales,
    filter_columns: &["region", "department", "product"],
    export_name: "enhanced_business_data.csv",
    routes: &[
        ("/sales", Report::Rows),
        ("/sales/csv", Report::Export),
        ("/sales/filters", Report::Filters),
        ("/kpis", Report::Kpis),
        ("/charts/revenue-trend", Report::RevenueTrend),
        ("/charts/monthly-summary", Report::MonthlySummary(MonthStyle::Detailed)),
        ("/charts/region-performance", Report::RegionPerformance),
        ("/charts/product-mix", Report::ProductMix),
        ("/reports/quarterly-analysis", Report::QuarterlyAnalysis),
        ("/reports/annual-summary", Report::AnnualSummary),
    ],
};

pub static GOOGLE: Variant = Variant {
    name: "google",
    prefix: "/api/google",
    source: SourceId::Business,
    filter_columns: &["region", "department", "year"],
    export_name: "enhanced_google_business_data.csv",
    routes: &[
        ("/data", Report::Rows),
        ("/export", Report::Export),
        ("/filters", Report::Filters),
        ("/kpis", Report::Kpis),
        ("/charts/revenue-trend", Report::RevenueTrend),
        ("/charts/monthly-summary", Report::MonthlySummary(MonthStyle::Compact)),
        ("/charts/department-performance", Report::DepartmentPerformance),
        ("/charts/region-distribution", Report::RegionDistribution),
        ("/charts/revenue-expense", Report::RevenueExpense),
        ("/charts/employee-performance", Report::EmployeePerformance),
        ("/charts/quarterly-trends", Report::QuarterlyTrends),
        ("/charts/department-comparison", Report::DepartmentComparison),
        ("/charts/regional-heatmap", Report::RegionalHeatmap),
        ("/charts/profitability", Report::Profitability),
        ("/charts/advanced-kpis", Report::AdvancedKpis),
        ("/charts/rolling-metrics", Report::RollingMetrics),
        ("/charts/competitive-analysis", Report::CompetitiveAnalysis),
        ("/charts/ytd-performance", Report::YtdPerformance),
    ],
};

pub static SAP: Variant = Variant {
    name: "sap",
    prefix: "/api/sap",
    source: SourceId::Business,
    filter_columns: &["region", "department", "year"],
    export_name: "enhanced_google_business_data.csv",
    routes: &[
        ("/data", Report::Rows),
        ("/filters", Report::Filters),
        ("/kpis", Report::Kpis),
    ],
};

pub static VARIANTS: [&Variant; 3] = [&SALES, &GOOGLE, &SAP];

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn full_paths_are_unique() {
        let mut seen = HashSet::new();
        for variant in VARIANTS {
            for (route, _) in variant.routes {
                let path = variant.path(route);
                assert!(seen.insert(path.clone()), "duplicate route {path}");
                assert_ne!(path, "/api/health");
                assert_ne!(path, "/api/test");
            }
        }
    }

    #[test]
    fn every_variant_serves_rows_and_kpis() {
        for variant in VARIANTS {
            let reports: Vec<Report> = variant.routes.iter().map(|(_, r)| *r).collect();
            assert!(reports.contains(&Report::Rows), "{}", variant.name);
            assert!(reports.contains(&Report::Kpis), "{}", variant.name);
        }
    }
}
