mod catalog;

pub use catalog::RuleId;

use crate::Result;
use crate::measures::Measures;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Limits the rule predicates compare against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    pub max_style_sheets: u64,
    pub max_http_requests: u64,
    pub max_domains: u64,
    pub min_cached_percent: f64,
    pub min_etag_percent: f64,
    pub min_compressed_percent: f64,
    pub min_minified_js_percent: f64,
    pub min_minified_css_percent: f64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            max_style_sheets: 2,
            max_http_requests: 26,
            max_domains: 2,
            min_cached_percent: 95.0,
            min_etag_percent: 95.0,
            min_compressed_percent: 95.0,
            min_minified_js_percent: 95.0,
            min_minified_css_percent: 95.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Verdict {
    /// Not evaluated yet in this run
    Pending,
    Respected,
    NotRespected,
}

impl Verdict {
    pub fn is_respected(&self) -> Option<bool> {
        match self {
            Verdict::Pending => None,
            Verdict::Respected => Some(true),
            Verdict::NotRespected => Some(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: RuleId,
    pub verdict: Verdict,
    pub comment: String,
}

impl Rule {
    fn pending(id: RuleId) -> Self {
        Self {
            id,
            verdict: Verdict::Pending,
            comment: String::new(),
        }
    }
}

/// Rule catalog with the latest verdict of every rule
#[derive(Debug, Clone)]
pub struct Rules {
    thresholds: RuleThresholds,
    records: BTreeMap<RuleId, Rule>,
}

impl Rules {
    pub fn new(thresholds: RuleThresholds) -> Self {
        let records = RuleId::ALL
            .iter()
            .map(|id| (*id, Rule::pending(*id)))
            .collect();
        Self {
            thresholds,
            records,
        }
    }

    /// Back to all-pending
    pub fn reset(&mut self) {
        for (id, rule) in self.records.iter_mut() {
            *rule = Rule::pending(*id);
        }
    }

    /// Evaluate one rule against `measures` and store the verdict
    pub fn check_rule(&mut self, id: RuleId, measures: &Measures) -> &Rule {
        let (respected, comment) = id.evaluate(measures, &self.thresholds);
        let rule = self
            .records
            .entry(id)
            .or_insert_with(|| Rule::pending(id));
        rule.verdict = if respected {
            Verdict::Respected
        } else {
            Verdict::NotRespected
        };
        rule.comment = comment;

        tracing::debug!("Rule {}: {:?} ({})", id, rule.verdict, rule.comment);
        rule
    }

    pub fn check_rules(&mut self, ids: &[RuleId], measures: &Measures) {
        for id in ids {
            self.check_rule(*id, measures);
        }
    }

    /// Evaluate a rule given its identifier string
    pub fn check_rule_named(&mut self, name: &str, measures: &Measures) -> Result<&Rule> {
        let id: RuleId = name.parse()?;
        Ok(self.check_rule(id, measures))
    }

    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.records.get(&id)
    }

    /// Every rule in catalog order, pending ones included
    pub fn all_rules(&self) -> Vec<Rule> {
        self.records.values().cloned().collect()
    }
}

impl Default for Rules {
    fn default() -> Self {
        Self::new(RuleThresholds::default())
    }
}
