use crate::OutputFormat;
use crate::replay::{Recording, ReplaySource};
use anyhow::{Result, anyhow};
use console::{StyledObject, style};
use ecoprobe_core::code::TreeSitterValidator;
use ecoprobe_core::session::SystemClock;
use ecoprobe_core::{AnalysisSession, AnalysisUpdate, EngineConfig, Grade, Rule, RuleId, Verdict};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;

/// Inputs of the analyze command besides the HAR file
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions<'a> {
    pub frames: Option<&'a Path>,
    pub resources: Option<&'a Path>,
    pub har_resources: bool,
}

/// Replay a recording through a fresh analysis session and return the
/// final state
pub fn analyze_recording(
    recording: Recording,
    config: &EngineConfig,
    progress: &ProgressBar,
) -> Result<AnalysisUpdate> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let mut session = AnalysisSession::new(
            config,
            Arc::new(SystemClock),
            Box::new(TreeSitterValidator),
        )?;
        let source = ReplaySource::new(recording);
        progress.set_length(source.recording().event_count() as u64);

        session
            .launch(&source)
            .await?
            .ok_or_else(|| anyhow!("Analysis run was not started"))?;

        while let Some(outcome) = session.try_next_event() {
            tracing::trace!("Event outcome: {:?}", outcome);
            progress.inc(1);
        }

        Ok::<_, anyhow::Error>(session.snapshot())
    })
}

/// Load a recording from disk and analyze it
pub fn analyze_files(
    file: &Path,
    options: &AnalyzeOptions<'_>,
    config: &EngineConfig,
) -> Result<AnalysisUpdate> {
    let recording = Recording::load(file, options.frames, options.resources, options.har_resources)?;
    analyze_recording(recording, config, &ProgressBar::hidden())
}

pub fn execute(
    file: &Path,
    options: &AnalyzeOptions<'_>,
    only: &[String],
    config: &EngineConfig,
    format: OutputFormat,
) -> Result<()> {
    tracing::info!("Analyzing recording: {}", file.display());

    let selected = only
        .iter()
        .map(|name| name.parse::<RuleId>())
        .collect::<ecoprobe_core::Result<Vec<_>>>()?;

    let recording = Recording::load(file, options.frames, options.resources, options.har_resources)?;

    let progress = if format == OutputFormat::Pretty {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg} [{bar:30}] {pos}/{len}")?
                .progress_chars("=> "),
        );
        bar.set_message("Replaying");
        bar
    } else {
        ProgressBar::hidden()
    };
    let mut update = analyze_recording(recording, config, &progress)?;
    progress.finish_and_clear();

    if !selected.is_empty() {
        update.rules.retain(|rule| selected.contains(&rule.id));
    }

    match format {
        OutputFormat::Json => output_json(&update)?,
        OutputFormat::Table => output_table(&update),
        OutputFormat::Pretty => output_pretty(&update),
    }

    Ok(())
}

pub(crate) fn styled_grade(grade: Grade) -> StyledObject<Grade> {
    let styled = style(grade).bold();
    match grade {
        Grade::A | Grade::B => styled.green(),
        Grade::C | Grade::D => styled.yellow(),
        Grade::E | Grade::F | Grade::G => styled.red(),
    }
}

fn verdict_label(verdict: Verdict) -> &'static str {
    match verdict.is_respected() {
        Some(true) => "OK",
        Some(false) => "NOK",
        None => "...",
    }
}

fn styled_verdict(rule: &Rule) -> StyledObject<String> {
    let label = style(format!("[{:<3}]", verdict_label(rule.verdict)));
    match rule.verdict.is_respected() {
        Some(true) => label.green(),
        Some(false) => label.red(),
        None => label.dim(),
    }
}

fn output_pretty(update: &AnalysisUpdate) {
    let measures = &update.measures;

    println!("\n{}", style("EcoIndex Analysis Report").bold().cyan());
    println!("{}", style("========================").cyan());

    println!("\n{}", style("Page:").bold());
    println!("  Requests:           {}", measures.nb_request);
    println!(
        "  Size:               {} KB ({} KB uncompressed)",
        measures.responses_size_kb(),
        measures.responses_size_uncompress_kb()
    );
    println!("  DOM Elements:       {}", measures.dom_size);
    println!("  Domains:            {}", measures.domains_number);
    println!(
        "  EcoIndex:           {:.2} ({})",
        measures.eco_index,
        styled_grade(measures.grade)
    );

    println!("\n{}", style("Rules:").bold());
    for rule in &update.rules {
        println!(
            "  {} {:<34} {}",
            styled_verdict(rule),
            rule.id.as_str(),
            style(&rule.comment).dim()
        );
    }

    println!();
}

fn output_json(update: &AnalysisUpdate) -> Result<()> {
    let json = serde_json::to_string_pretty(update)?;
    println!("{}", json);
    Ok(())
}

fn output_table(update: &AnalysisUpdate) {
    let measures = &update.measures;

    println!("Metric,Value");
    println!("Requests,{}", measures.nb_request);
    println!("Size (KB),{}", measures.responses_size_kb());
    println!("Uncompressed Size (KB),{}", measures.responses_size_uncompress_kb());
    println!("DOM Elements,{}", measures.dom_size);
    println!("Domains,{}", measures.domains_number);
    println!("EcoIndex,{:.2}", measures.eco_index);
    println!("Grade,{}", measures.grade);

    println!();
    println!("Rule,Status,Comment");
    for rule in &update.rules {
        println!(
            "{},{},\"{}\"",
            rule.id,
            verdict_label(rule.verdict),
            rule.comment.replace('"', "\"\"")
        );
    }
}
