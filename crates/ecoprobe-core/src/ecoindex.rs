//! EcoIndex score and grade.
//!
//! The score blends the quantile ranks of DOM size, request count and
//! transferred kilobytes against a reference table:
//! `100 - 5 * (2*q_dom + 3*q_req + q_size) / 6`.

use crate::{Error, Result};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::fmt;

const DOM_WEIGHT: f64 = 2.0;
const REQUEST_WEIGHT: f64 = 3.0;
const SIZE_WEIGHT: f64 = 1.0;

const REFERENCE_DOM: [f64; 21] = [
    0.0, 47.0, 75.0, 159.0, 233.0, 298.0, 358.0, 417.0, 476.0, 537.0, 603.0, 674.0, 753.0, 843.0,
    949.0, 1076.0, 1237.0, 1459.0, 1801.0, 2479.0, 594601.0,
];

const REFERENCE_REQUESTS: [f64; 21] = [
    0.0, 2.0, 15.0, 25.0, 34.0, 42.0, 49.0, 56.0, 63.0, 70.0, 78.0, 86.0, 95.0, 105.0, 117.0,
    130.0, 147.0, 170.0, 205.0, 281.0, 3920.0,
];

const REFERENCE_SIZE_KB: [f64; 21] = [
    0.0, 1.37, 144.7, 319.53, 479.46, 631.97, 783.38, 937.91, 1098.62, 1265.47, 1448.32, 1648.27,
    1876.08, 2142.06, 2465.37, 2866.31, 3401.59, 4155.73, 5400.08, 8037.54, 223212.26,
];

lazy_static! {
    static ref REFERENCE_TABLE: QuantileTable = QuantileTable::default();
}

/// Bucket thresholds used to rank each metric, in increasing order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantileTable {
    pub dom: Vec<f64>,
    pub requests: Vec<f64>,
    pub size_kb: Vec<f64>,
}

impl Default for QuantileTable {
    fn default() -> Self {
        Self {
            dom: REFERENCE_DOM.to_vec(),
            requests: REFERENCE_REQUESTS.to_vec(),
            size_kb: REFERENCE_SIZE_KB.to_vec(),
        }
    }
}

impl QuantileTable {
    pub fn validate(&self) -> Result<()> {
        for (name, thresholds) in [
            ("dom", &self.dom),
            ("requests", &self.requests),
            ("size_kb", &self.size_kb),
        ] {
            if thresholds.len() < 2 {
                return Err(Error::InvalidConfig(format!(
                    "ecoindex.{} needs at least two thresholds",
                    name
                )));
            }
            if thresholds.windows(2).any(|pair| pair[0] >= pair[1]) {
                return Err(Error::InvalidConfig(format!(
                    "ecoindex.{} thresholds must be strictly increasing",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Score in `[0, 100]`, higher is better
    pub fn score(&self, dom_size: u64, request_count: u64, response_size_kb: f64) -> f64 {
        let q_dom = quantile(&self.dom, dom_size as f64);
        let q_req = quantile(&self.requests, request_count as f64);
        let q_size = quantile(&self.size_kb, response_size_kb);

        let weighted = (DOM_WEIGHT * q_dom + REQUEST_WEIGHT * q_req + SIZE_WEIGHT * q_size)
            / (DOM_WEIGHT + REQUEST_WEIGHT + SIZE_WEIGHT);

        (100.0 - 5.0 * weighted).clamp(0.0, 100.0)
    }
}

/// Rank of `value` among `thresholds`, interpolated inside its bucket
fn quantile(thresholds: &[f64], value: f64) -> f64 {
    for (idx, bucket) in thresholds.windows(2).enumerate() {
        let (low, high) = (bucket[0], bucket[1]);
        if value < high {
            return idx as f64 + ((value - low) / (high - low)).max(0.0);
        }
    }
    thresholds.len().saturating_sub(1) as f64
}

/// Score against the reference EcoIndex table
pub fn compute_score(dom_size: u64, request_count: u64, response_size_kb: f64) -> f64 {
    REFERENCE_TABLE.score(dom_size, request_count, response_size_kb)
}

/// Letter grade, `A` being the best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
}

/// Exclusive lower bound of each grade, best grade first
const GRADE_CUTS: [(f64, Grade); 6] = [
    (75.0, Grade::A),
    (65.0, Grade::B),
    (50.0, Grade::C),
    (35.0, Grade::D),
    (20.0, Grade::E),
    (5.0, Grade::F),
];

impl Grade {
    pub fn for_score(score: f64) -> Self {
        GRADE_CUTS
            .iter()
            .find(|(cut, _)| score > *cut)
            .map(|(_, grade)| *grade)
            .unwrap_or(Grade::G)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
            Grade::F => "F",
            Grade::G => "G",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
