use crate::OutputFormat;
use anyhow::Result;
use ecoprobe_core::{EngineConfig, Grade};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreReport {
    pub dom_size: u64,
    pub requests: u64,
    pub size_kb: f64,
    pub eco_index: f64,
    pub grade: Grade,
}

/// Score a page from its three raw dimensions
pub fn score_page(config: &EngineConfig, dom_size: u64, requests: u64, size_kb: f64) -> ScoreReport {
    let eco_index = config.ecoindex.score(dom_size, requests, size_kb);
    ScoreReport {
        dom_size,
        requests,
        size_kb,
        eco_index,
        grade: Grade::for_score(eco_index),
    }
}

pub fn execute(
    config: &EngineConfig,
    dom_size: u64,
    requests: u64,
    size_kb: f64,
    format: OutputFormat,
) -> Result<()> {
    if !(size_kb.is_finite() && size_kb >= 0.0) {
        anyhow::bail!("--size-kb must be a non-negative number, got {}", size_kb);
    }

    let report = score_page(config, dom_size, requests, size_kb);
    tracing::debug!("Score for {:?}", report);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => {
            println!("Metric,Value");
            println!("DOM Elements,{}", report.dom_size);
            println!("Requests,{}", report.requests);
            println!("Size (KB),{}", report.size_kb);
            println!("EcoIndex,{:.2}", report.eco_index);
            println!("Grade,{}", report.grade);
        }
        OutputFormat::Pretty => {
            use console::style;

            println!(
                "EcoIndex {} - Grade {}",
                style(format!("{:.2}", report.eco_index)).bold(),
                super::analyze::styled_grade(report.grade)
            );
        }
    }

    Ok(())
}
