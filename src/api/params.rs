use serde::Deserialize;

use crate::data::FilterSpec;

/// Query-string filters accepted by every data endpoint.
///
/// Unknown parameters are ignored; an empty value counts as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterQuery {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl FilterQuery {
    /// Build a [`FilterSpec`], keeping only the categorical parameters named
    /// in `allowed`.
    pub fn to_filter_spec(&self, allowed: &[&str]) -> FilterSpec {
        let mut spec = FilterSpec::new();
        if let Some(from) = present(&self.start_date) {
            spec = spec.date_from(from);
        }
        if let Some(to) = present(&self.end_date) {
            spec = spec.date_to(to);
        }
        let categorical = [
            ("region", &self.region),
            ("department", &self.department),
            ("product", &self.product),
            ("year", &self.year),
        ];
        for (column, value) in categorical {
            let Some(value) = present(value) else { continue };
            if allowed.contains(&column) {
                spec = spec.equal(column, value);
            } else {
                log::debug!("ignoring unsupported filter '{column}'");
            }
        }
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values_are_absent() {
        let query = FilterQuery {
            start_date: Some(String::new()),
            region: Some("  ".into()),
            ..Default::default()
        };
        assert!(query.to_filter_spec(&["region"]).is_empty());
    }

    #[test]
    fn unsupported_columns_are_dropped() {
        let query = FilterQuery {
            region: Some("East".into()),
            product: Some("Widget".into()),
            end_date: Some("2024-03-31".into()),
            ..Default::default()
        };
        let spec = query.to_filter_spec(&["region", "department"]);
        assert_eq!(spec.date_to.as_deref(), Some("2024-03-31"));
        assert!(spec.equals.contains_key("region"));
        assert!(!spec.equals.contains_key("product"));
    }
}
