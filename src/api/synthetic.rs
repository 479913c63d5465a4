//! Simulated values kept apart from real aggregates.
//!
//! The dashboard expects a few numbers that are not derived from data
//! (growth and innovation scores, market share) and, optionally, a
//! "real-time" wobble on KPI totals. Both come from seedable RNGs here and
//! are always emitted under an explicit `synthetic` / `jitter` key.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value as JsonValue, json};

use crate::data::model::round_to;

fn seeded(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Uniform placeholder values for fields the data cannot provide.
pub struct SyntheticSource {
    rng: Mutex<StdRng>,
}

impl SyntheticSource {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: Mutex::new(seeded(seed)),
        }
    }

    /// A value drawn uniformly from `[low, high)`, rounded to one decimal.
    pub fn uniform(&self, low: f64, high: f64) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        round_to(rng.gen_range(low..high), 1)
    }
}

/// Multiplicative jitter for KPI totals, disabled when `spread` is 0.
pub struct KpiJitter {
    spread: f64,
    rng: Mutex<StdRng>,
}

/// KPI fields the jitter multiplies, with their rounding.
const JITTERED_FIELDS: &[(&str, i32)] = &[
    ("total_revenue", 2),
    ("total_expenses", 2),
    ("total_profit", 2),
    ("total_employees", 0),
];

impl KpiJitter {
    pub fn new(spread: f64, seed: Option<u64>) -> Self {
        Self {
            spread: spread.max(0.0),
            rng: Mutex::new(seeded(seed)),
        }
    }

    pub fn disabled() -> Self {
        Self::new(0.0, Some(0))
    }

    /// Draw a factor in `[1 - spread, 1 + spread]`, or `None` when disabled.
    pub fn factor(&self) -> Option<f64> {
        if self.spread <= 0.0 {
            return None;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Some(rng.gen_range(1.0 - self.spread..=1.0 + self.spread))
    }

    /// Scale the KPI totals by a fresh factor and record it under `jitter`.
    /// True totals stay canonical when the decorator is disabled.
    pub fn apply(&self, kpis: &mut Map<String, JsonValue>) {
        let Some(factor) = self.factor() else {
            return;
        };
        for (field, places) in JITTERED_FIELDS {
            if let Some(value) = kpis.get(*field).and_then(JsonValue::as_f64) {
                let scaled = round_to(value * factor, *places);
                let scaled = if *places == 0 {
                    json!(scaled as i64)
                } else {
                    json!(scaled)
                };
                kpis.insert(field.to_string(), scaled);
            }
        }
        kpis.insert(
            "jitter".to_string(),
            json!({ "simulated": true, "factor": round_to(factor, 4) }),
        );
    }
}
