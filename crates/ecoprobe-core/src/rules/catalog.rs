use super::RuleThresholds;
use crate::Error;
use crate::measures::Measures;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a best-practice rule, in catalog order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleId {
    Plugins,
    StyleSheets,
    PrintStyleSheets,
    EmptySrcTag,
    JsValidate,
    ExternalizeCss,
    ExternalizeJs,
    MinifiedCss,
    MinifiedJs,
    HttpRequests,
    DomainsNumber,
    AddExpiresOrCacheControlHeaders,
    #[serde(rename = "useETags")]
    UseETags,
    CompressHttp,
    DontResizeImageInBrowser,
    UseStandardTypefaces,
}

impl RuleId {
    pub const ALL: [RuleId; 16] = [
        RuleId::Plugins,
        RuleId::StyleSheets,
        RuleId::PrintStyleSheets,
        RuleId::EmptySrcTag,
        RuleId::JsValidate,
        RuleId::ExternalizeCss,
        RuleId::ExternalizeJs,
        RuleId::MinifiedCss,
        RuleId::MinifiedJs,
        RuleId::HttpRequests,
        RuleId::DomainsNumber,
        RuleId::AddExpiresOrCacheControlHeaders,
        RuleId::UseETags,
        RuleId::CompressHttp,
        RuleId::DontResizeImageInBrowser,
        RuleId::UseStandardTypefaces,
    ];

    /// Rules reading per-frame DOM counts
    pub const FRAME: [RuleId; 9] = [
        RuleId::Plugins,
        RuleId::StyleSheets,
        RuleId::PrintStyleSheets,
        RuleId::EmptySrcTag,
        RuleId::JsValidate,
        RuleId::ExternalizeCss,
        RuleId::ExternalizeJs,
        RuleId::DontResizeImageInBrowser,
        RuleId::UseStandardTypefaces,
    ];

    /// Rules reading the network snapshot
    pub const NETWORK: [RuleId; 5] = [
        RuleId::HttpRequests,
        RuleId::DomainsNumber,
        RuleId::AddExpiresOrCacheControlHeaders,
        RuleId::UseETags,
        RuleId::CompressHttp,
    ];

    pub const SCRIPT: [RuleId; 2] = [RuleId::MinifiedJs, RuleId::JsValidate];

    pub const STYLESHEET: [RuleId; 1] = [RuleId::MinifiedCss];

    /// Identifier used in reports and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::Plugins => "plugins",
            RuleId::StyleSheets => "styleSheets",
            RuleId::PrintStyleSheets => "printStyleSheets",
            RuleId::EmptySrcTag => "emptySrcTag",
            RuleId::JsValidate => "jsValidate",
            RuleId::ExternalizeCss => "externalizeCss",
            RuleId::ExternalizeJs => "externalizeJs",
            RuleId::MinifiedCss => "minifiedCss",
            RuleId::MinifiedJs => "minifiedJs",
            RuleId::HttpRequests => "httpRequests",
            RuleId::DomainsNumber => "domainsNumber",
            RuleId::AddExpiresOrCacheControlHeaders => "addExpiresOrCacheControlHeaders",
            RuleId::UseETags => "useETags",
            RuleId::CompressHttp => "compressHttp",
            RuleId::DontResizeImageInBrowser => "dontResizeImageInBrowser",
            RuleId::UseStandardTypefaces => "useStandardTypefaces",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            RuleId::Plugins => "Do not use plugins",
            RuleId::StyleSheets => "Limit the number of CSS files",
            RuleId::PrintStyleSheets => "Provide a print CSS",
            RuleId::EmptySrcTag => "Avoid empty src attributes",
            RuleId::JsValidate => "Validate JavaScript",
            RuleId::ExternalizeCss => "Externalize CSS",
            RuleId::ExternalizeJs => "Externalize JavaScript",
            RuleId::MinifiedCss => "Minify CSS",
            RuleId::MinifiedJs => "Minify JavaScript",
            RuleId::HttpRequests => "Limit HTTP requests",
            RuleId::DomainsNumber => "Limit the number of domains",
            RuleId::AddExpiresOrCacheControlHeaders => "Add Expires or Cache-Control headers",
            RuleId::UseETags => "Use ETags",
            RuleId::CompressHttp => "Compress resources",
            RuleId::DontResizeImageInBrowser => "Do not resize images in the browser",
            RuleId::UseStandardTypefaces => "Use standard typefaces",
        }
    }

    /// Verdict and comment for `measures`
    pub(super) fn evaluate(&self, measures: &Measures, limits: &RuleThresholds) -> (bool, String) {
        match self {
            RuleId::Plugins => zero_count(measures.plugins_number, "plugin(s) found"),
            RuleId::StyleSheets => (
                measures.style_sheets_number <= limits.max_style_sheets,
                format!("{} style sheet(s)", measures.style_sheets_number),
            ),
            RuleId::PrintStyleSheets => (
                measures.print_style_sheets_number > 0,
                format!("{} print style sheet(s)", measures.print_style_sheets_number),
            ),
            RuleId::EmptySrcTag => zero_count(measures.empty_src_tag_number, "empty src tag(s)"),
            RuleId::JsValidate => zero_count(measures.js_errors_number, "JavaScript error(s)"),
            RuleId::ExternalizeCss => {
                zero_count(measures.inline_style_sheets_number, "inline style sheet(s)")
            }
            RuleId::ExternalizeJs => {
                zero_count(measures.inline_js_scripts_number, "inline script(s)")
            }
            RuleId::MinifiedCss => share(
                measures.minified_css_number,
                measures.total_css,
                limits.min_minified_css_percent,
                ("style sheets minified", "style sheets analyzed"),
            ),
            RuleId::MinifiedJs => share(
                measures.minified_js_number,
                measures.total_js,
                limits.min_minified_js_percent,
                ("scripts minified", "scripts analyzed"),
            ),
            RuleId::HttpRequests => (
                measures.nb_request <= limits.max_http_requests,
                format!("{} HTTP request(s)", measures.nb_request),
            ),
            RuleId::DomainsNumber => (
                measures.domains_number <= limits.max_domains,
                format!("{} domain(s)", measures.domains_number),
            ),
            RuleId::AddExpiresOrCacheControlHeaders => share(
                measures.static_resources_number_with_cache_headers,
                measures.static_resources_number,
                limits.min_cached_percent,
                ("static resources with cache headers", "static resources"),
            ),
            RuleId::UseETags => share(
                measures.static_resources_number_with_etags,
                measures.static_resources_number,
                limits.min_etag_percent,
                ("static resources with an ETag", "static resources"),
            ),
            RuleId::CompressHttp => share(
                measures.compressible_resources_number_compressed,
                measures.compressible_resources_number,
                limits.min_compressed_percent,
                ("compressible resources compressed", "compressible resources"),
            ),
            RuleId::DontResizeImageInBrowser => zero_count(
                measures.image_resized_in_browser_number,
                "image(s) resized in the browser",
            ),
            RuleId::UseStandardTypefaces => zero_count(
                measures.css_font_face_rule_number,
                "custom font face rule(s)",
            ),
        }
    }
}

fn zero_count(count: u64, what: &str) -> (bool, String) {
    (count == 0, format!("{} {}", count, what))
}

/// Ratio rule, respected when nothing is eligible.
/// `labels` is (matching description, eligible description).
///
/// The shown percentage is truncated to one decimal, never above the exact ratio.
fn share(matching: u64, total: u64, min_percent: f64, labels: (&str, &str)) -> (bool, String) {
    let (what, eligible) = labels;
    if total == 0 {
        return (true, format!("No {}", eligible));
    }
    let percent = matching as f64 / total as f64 * 100.0;
    let shown = (percent * 10.0).floor() / 10.0;
    (
        percent >= min_percent,
        format!("{:.1}% {} ({}/{})", shown, what, matching, total),
    )
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownRule(s.to_string()))
    }
}
