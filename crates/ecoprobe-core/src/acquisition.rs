//! Merges measurements of one run into a single snapshot.

use crate::code::{self, ResourcePattern, ScriptValidator};
use crate::config::EngineConfig;
use crate::ecoindex::{Grade, QuantileTable};
use crate::har::Entry;
use crate::measures::{FrameReport, Measures, Resource, ResourceKind};
use crate::network::NetworkSummary;
use crate::rules::{RuleId, Rules};
use crate::Result;

/// Owner of the run's snapshot and rule verdicts
///
/// Every handler can be called in any order; each one leaves a consistent
/// (possibly incomplete) snapshot and re-checks only the rules it affects.
pub struct MeasuresAcquisition {
    measures: Measures,
    rules: Rules,
    quantiles: QuantileTable,
    minified_line_length: f64,
    excluded_scripts: Vec<ResourcePattern>,
    validator: Box<dyn ScriptValidator>,
}

impl MeasuresAcquisition {
    pub fn new(config: &EngineConfig, validator: Box<dyn ScriptValidator>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            measures: Measures::default(),
            rules: Rules::new(config.rules.clone()),
            quantiles: config.ecoindex.clone(),
            minified_line_length: config.code.minified_line_length,
            excluded_scripts: config.excluded_script_patterns()?,
            validator,
        })
    }

    pub fn measures(&self) -> &Measures {
        &self.measures
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn reset(&mut self) {
        self.measures = Measures::default();
        self.rules.reset();
    }

    pub fn merge_frame_report(&mut self, report: &FrameReport) {
        tracing::debug!(
            "Frame {}: dom={} plugins={} styleSheets={} printStyleSheets={} inlineStyleSheets={} \
             emptySrc={} inlineScripts={} resizedImages={} fontFaces={}",
            report.frame_url,
            report.dom_size,
            report.plugins_number,
            report.style_sheets_number,
            report.print_style_sheets_number,
            report.inline_style_sheets_number,
            report.empty_src_tag_number,
            report.inline_js_scripts_number,
            report.image_resized_in_browser_number,
            report.css_font_face_rule_number
        );

        self.measures.merge_frame(report);
        if !report.inline_js_script.is_empty() {
            self.validate_script(&report.inline_js_script, "inline");
        }
        self.refresh_score();
        self.rules.check_rules(&RuleId::FRAME, &self.measures);
    }

    /// Set the network-derived fields from a full list of records.
    /// Returns `false` (and changes nothing) when `entries` is empty.
    pub fn apply_network_snapshot(&mut self, entries: &[Entry]) -> bool {
        if entries.is_empty() {
            tracing::debug!("Empty network snapshot, network rules not triggered");
            return false;
        }

        let summary = NetworkSummary::from_entries(entries);
        let m = &mut self.measures;
        m.nb_request = summary.request_count;
        m.responses_size = summary.responses_size;
        m.responses_size_uncompress = summary.responses_size_uncompressed;
        m.domains_number = summary.domains.len() as u64;
        m.static_resources_number = summary.static_resources;
        m.static_resources_number_with_cache_headers = summary.static_with_cache_headers;
        m.static_resources_number_with_etags = summary.static_with_etags;
        m.compressible_resources_number = summary.compressible_resources;
        m.compressible_resources_number_compressed = summary.compressible_compressed;

        tracing::info!(
            "Network: {} requests, {} KB transferred over {} domain(s)",
            m.nb_request,
            m.responses_size_kb(),
            m.domains_number
        );

        self.refresh_score();
        self.rules.check_rules(&RuleId::NETWORK, &self.measures);
        true
    }

    /// Analyze the fetched text of a script or style sheet.
    /// Returns `false` when the resource is not analyzed (excluded or other kind).
    pub fn apply_resource_code(&mut self, resource: &Resource, code: &str) -> bool {
        match resource.kind {
            ResourceKind::Script => {
                if self.is_excluded(&resource.url) {
                    tracing::debug!("Skipping excluded script {}", resource.url);
                    return false;
                }
                self.validate_script(code, &resource.url);

                let m = &mut self.measures;
                m.total_js = m.total_js.saturating_add(1);
                if code::is_minified(code, self.minified_line_length) {
                    m.minified_js_number = m.minified_js_number.saturating_add(1);
                    tracing::debug!("{} is minified", resource.url);
                } else {
                    tracing::debug!("{} is not minified", resource.url);
                }
                m.percent_minified_js = percent(m.minified_js_number, m.total_js);

                self.rules.check_rules(&RuleId::SCRIPT, &self.measures);
                true
            }
            ResourceKind::Stylesheet => {
                let m = &mut self.measures;
                m.total_css = m.total_css.saturating_add(1);
                if code::is_minified(code, self.minified_line_length) {
                    m.minified_css_number = m.minified_css_number.saturating_add(1);
                    tracing::debug!("{} is minified", resource.url);
                } else {
                    tracing::debug!("{} is not minified", resource.url);
                }
                m.percent_minified_css = percent(m.minified_css_number, m.total_css);

                self.rules.check_rules(&RuleId::STYLESHEET, &self.measures);
                true
            }
            ResourceKind::Other => false,
        }
    }

    fn is_excluded(&self, url: &str) -> bool {
        self.excluded_scripts.iter().any(|p| p.matches(url))
    }

    fn validate_script(&mut self, code: &str, origin: &str) {
        let outcome = self.validator.validate(code);
        let defects = code::defect_count(&outcome);
        match &outcome {
            Ok(issues) if !issues.is_empty() => {
                tracing::debug!("{}: {} syntax error(s)", origin, issues.len())
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("{}: {}", origin, e),
        }
        self.measures.js_errors_number = self
            .measures
            .js_errors_number
            .saturating_add(defects);
    }

    fn refresh_score(&mut self) {
        let m = &mut self.measures;
        let score = self
            .quantiles
            .score(m.dom_size, m.nb_request, m.responses_size_kb() as f64);
        m.eco_index = (score * 100.0).round() / 100.0;
        m.grade = Grade::for_score(m.eco_index);
    }
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::SyntaxIssue;
    use crate::code::TreeSitterValidator;
    use crate::har::{Content, Header, Request, Response};
    use crate::rules::Verdict;
    use crate::Error;

    /// Validator reporting one issue for code containing `@`, failing on `#`
    struct MarkerValidator;

    impl ScriptValidator for MarkerValidator {
        fn validate(&self, code: &str) -> Result<Vec<SyntaxIssue>> {
            if code.contains('#') {
                return Err(Error::ScriptParse("unparseable".to_string()));
            }
            Ok(code
                .match_indices('@')
                .map(|(offset, _)| SyntaxIssue {
                    kind: code::IssueKind::Error,
                    line: 1,
                    column: offset + 1,
                })
                .collect())
        }
    }

    fn acquisition() -> MeasuresAcquisition {
        MeasuresAcquisition::new(&EngineConfig::default(), Box::new(MarkerValidator)).unwrap()
    }

    fn cached_script(url: &str) -> Entry {
        Entry {
            started_date_time: String::new(),
            request: Request {
                method: "GET".to_string(),
                url: url.to_string(),
                headers: vec![],
            },
            response: Response {
                status: 200,
                headers: [
                    ("Content-Type", "application/javascript"),
                    ("Cache-Control", "max-age=86400"),
                    ("ETag", "\"v1\""),
                    ("Content-Encoding", "br"),
                ]
                .iter()
                .map(|(name, value)| Header {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
                content: Content {
                    size: 30_000,
                    mime_type: "application/javascript".to_string(),
                    text: None,
                    encoding: None,
                },
                headers_size: 250,
                body_size: 9_000,
                transfer_size: None,
            },
        }
    }

    #[test]
    fn test_frames_sum_dom_size() {
        let mut acq = acquisition();
        acq.merge_frame_report(&FrameReport {
            dom_size: 500,
            ..Default::default()
        });
        acq.merge_frame_report(&FrameReport {
            dom_size: 300,
            ..Default::default()
        });

        assert_eq!(acq.measures().dom_size, 800);
        assert!(acq.measures().eco_index < 100.0);
        assert_eq!(acq.measures().grade, Grade::for_score(acq.measures().eco_index));
    }

    #[test]
    fn test_huge_frame_counts_degrade_gracefully() {
        let mut acq = acquisition();
        acq.merge_frame_report(&FrameReport {
            dom_size: u64::MAX,
            plugins_number: u64::MAX,
            ..Default::default()
        });
        acq.merge_frame_report(&FrameReport {
            dom_size: 1,
            plugins_number: 1,
            ..Default::default()
        });

        let m = acq.measures();
        assert_eq!(m.dom_size, u64::MAX);
        assert_eq!(m.plugins_number, u64::MAX);
        assert!((0.0..=100.0).contains(&m.eco_index));
        assert_eq!(m.grade, Grade::for_score(m.eco_index));
    }

    #[test]
    fn test_frame_triggers_only_frame_rules() {
        let mut acq = acquisition();
        acq.merge_frame_report(&FrameReport {
            plugins_number: 1,
            ..Default::default()
        });

        let rules = acq.rules();
        assert_eq!(rules.get(RuleId::Plugins).unwrap().verdict, Verdict::NotRespected);
        assert_eq!(rules.get(RuleId::HttpRequests).unwrap().verdict, Verdict::Pending);
        assert_eq!(rules.get(RuleId::MinifiedCss).unwrap().verdict, Verdict::Pending);
    }

    #[test]
    fn test_inline_script_validated() {
        let mut acq = acquisition();
        acq.merge_frame_report(&FrameReport {
            inline_js_script: "a@b@".to_string(),
            ..Default::default()
        });
        assert_eq!(acq.measures().js_errors_number, 2);
        assert_eq!(
            acq.rules().get(RuleId::JsValidate).unwrap().verdict,
            Verdict::NotRespected
        );
    }

    #[test]
    fn test_network_snapshot_respects_network_rules() {
        let mut acq = acquisition();
        let entries = vec![
            cached_script("https://example.com/a.js"),
            cached_script("https://example.com/b.js"),
            cached_script("https://cdn.example.com/c.js"),
        ];

        assert!(acq.apply_network_snapshot(&entries));

        let m = acq.measures();
        assert_eq!(m.nb_request, 3);
        assert_eq!(m.domains_number, 2);
        assert_eq!(m.responses_size, 3 * 9_250);
        assert_eq!(m.responses_size_uncompress, 90_000);
        for id in [
            RuleId::AddExpiresOrCacheControlHeaders,
            RuleId::UseETags,
            RuleId::CompressHttp,
            RuleId::HttpRequests,
            RuleId::DomainsNumber,
        ] {
            assert_eq!(acq.rules().get(id).unwrap().verdict, Verdict::Respected, "{}", id);
        }
    }

    #[test]
    fn test_network_snapshot_is_assigned_not_accumulated() {
        let mut acq = acquisition();
        let entries = vec![cached_script("https://example.com/a.js")];
        acq.apply_network_snapshot(&entries);
        let first = acq.measures().clone();
        acq.apply_network_snapshot(&entries);
        assert_eq!(acq.measures(), &first);
    }

    #[test]
    fn test_empty_network_snapshot_changes_nothing() {
        let mut acq = acquisition();
        assert!(!acq.apply_network_snapshot(&[]));
        assert_eq!(acq.measures(), &Measures::default());
        assert!(RuleId::NETWORK
            .iter()
            .all(|id| acq.rules().get(*id).unwrap().verdict == Verdict::Pending));
    }

    #[test]
    fn test_script_resources_update_minified_share() {
        let mut acq = acquisition();
        let minified = "x".repeat(2000);
        let readable = "abcdefghijklmnopqrs\n".repeat(100);

        assert!(acq.apply_resource_code(&Resource::new("https://e.com/a.min.js", ResourceKind::Script), &minified));
        assert!(acq.apply_resource_code(&Resource::new("https://e.com/b.js", ResourceKind::Script), &readable));

        let m = acq.measures();
        assert_eq!(m.total_js, 2);
        assert_eq!(m.minified_js_number, 1);
        assert_eq!(m.percent_minified_js, 50.0);
        assert_eq!(
            acq.rules().get(RuleId::MinifiedJs).unwrap().verdict,
            Verdict::NotRespected
        );
    }

    #[test]
    fn test_page_script_excluded() {
        let mut acq = acquisition();
        let probe = Resource::new("chrome-extension://id/script/analyseFrame.js", ResourceKind::Script);
        assert!(!acq.apply_resource_code(&probe, "#"));
        assert_eq!(acq.measures().total_js, 0);
        assert_eq!(acq.measures().js_errors_number, 0);
    }

    #[test]
    fn test_unparseable_script_counts_one_error() {
        let mut acq = acquisition();
        acq.apply_resource_code(&Resource::new("https://e.com/bad.js", ResourceKind::Script), "#");
        assert_eq!(acq.measures().js_errors_number, 1);
    }

    #[test]
    fn test_stylesheets_and_other_resources() {
        let mut acq = acquisition();
        assert!(acq.apply_resource_code(
            &Resource::new("https://e.com/site.css", ResourceKind::Stylesheet),
            "body{margin:0}"
        ));
        assert!(!acq.apply_resource_code(
            &Resource::new("https://e.com/logo.png", ResourceKind::Other),
            ""
        ));

        let m = acq.measures();
        assert_eq!(m.total_css, 1);
        assert_eq!(m.percent_minified_css, 100.0);
        assert_eq!(
            acq.rules().get(RuleId::MinifiedCss).unwrap().verdict,
            Verdict::Respected
        );
        // Style sheets never go through the script validator
        assert_eq!(acq.measures().js_errors_number, 0);
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut acq = acquisition();
        acq.merge_frame_report(&FrameReport {
            dom_size: 5_000,
            ..Default::default()
        });
        acq.reset();

        assert_eq!(acq.measures(), &Measures::default());
        assert_eq!(acq.measures().eco_index, 100.0);
        assert_eq!(acq.measures().grade, Grade::A);
    }

    #[test]
    fn test_with_tree_sitter_validator() {
        let mut acq =
            MeasuresAcquisition::new(&EngineConfig::default(), Box::new(TreeSitterValidator))
                .unwrap();
        acq.apply_resource_code(
            &Resource::new("https://e.com/ok.js", ResourceKind::Script),
            "const a = 1;\n",
        );
        assert_eq!(acq.measures().js_errors_number, 0);
    }
}
