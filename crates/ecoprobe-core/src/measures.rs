//! Measurement snapshot and the raw facts merged into it.

use crate::ecoindex::Grade;
use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch at which a run was launched
pub type RunTimestamp = i64;

/// Best-known aggregate of every measurement for the current run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measures {
    pub dom_size: u64,
    pub nb_request: u64,
    /// Transferred bytes
    pub responses_size: u64,
    /// Decoded bytes
    pub responses_size_uncompress: u64,
    pub eco_index: f64,
    pub grade: Grade,
    pub plugins_number: u64,
    pub style_sheets_number: u64,
    pub print_style_sheets_number: u64,
    pub inline_style_sheets_number: u64,
    pub minified_css_number: u64,
    pub total_css: u64,
    pub percent_minified_css: f64,
    pub empty_src_tag_number: u64,
    pub js_errors_number: u64,
    pub inline_js_scripts_number: u64,
    pub minified_js_number: u64,
    pub total_js: u64,
    pub percent_minified_js: f64,
    pub domains_number: u64,
    pub static_resources_number: u64,
    pub static_resources_number_with_cache_headers: u64,
    pub static_resources_number_with_etags: u64,
    pub compressible_resources_number: u64,
    pub compressible_resources_number_compressed: u64,
    pub image_resized_in_browser_number: u64,
    pub css_font_face_rule_number: u64,
}

impl Default for Measures {
    fn default() -> Self {
        Self {
            dom_size: 0,
            nb_request: 0,
            responses_size: 0,
            responses_size_uncompress: 0,
            eco_index: 100.0,
            grade: Grade::A,
            plugins_number: 0,
            style_sheets_number: 0,
            print_style_sheets_number: 0,
            inline_style_sheets_number: 0,
            minified_css_number: 0,
            total_css: 0,
            percent_minified_css: 0.0,
            empty_src_tag_number: 0,
            js_errors_number: 0,
            inline_js_scripts_number: 0,
            minified_js_number: 0,
            total_js: 0,
            percent_minified_js: 0.0,
            domains_number: 0,
            static_resources_number: 0,
            static_resources_number_with_cache_headers: 0,
            static_resources_number_with_etags: 0,
            compressible_resources_number: 0,
            compressible_resources_number_compressed: 0,
            image_resized_in_browser_number: 0,
            css_font_face_rule_number: 0,
        }
    }
}

impl Measures {
    /// Transferred size in kilobytes (1 KB = 1000 bytes), rounded
    pub fn responses_size_kb(&self) -> u64 {
        (self.responses_size as f64 / 1000.0).round() as u64
    }

    /// Decoded size in kilobytes, rounded
    pub fn responses_size_uncompress_kb(&self) -> u64 {
        (self.responses_size_uncompress as f64 / 1000.0).round() as u64
    }

    /// Fold one frame's counts in: additive fields are summed, per-document
    /// fields keep the richest frame seen. Sums saturate.
    pub(crate) fn merge_frame(&mut self, frame: &FrameReport) {
        self.dom_size = self.dom_size.saturating_add(frame.dom_size);
        self.plugins_number = self.plugins_number.saturating_add(frame.plugins_number);
        self.print_style_sheets_number = self
            .print_style_sheets_number
            .saturating_add(frame.print_style_sheets_number);
        self.empty_src_tag_number = self
            .empty_src_tag_number
            .saturating_add(frame.empty_src_tag_number);
        self.image_resized_in_browser_number = self
            .image_resized_in_browser_number
            .saturating_add(frame.image_resized_in_browser_number);

        self.style_sheets_number = self.style_sheets_number.max(frame.style_sheets_number);
        self.inline_style_sheets_number = self
            .inline_style_sheets_number
            .max(frame.inline_style_sheets_number);
        self.inline_js_scripts_number = self
            .inline_js_scripts_number
            .max(frame.inline_js_scripts_number);
        self.css_font_face_rule_number = self
            .css_font_face_rule_number
            .max(frame.css_font_face_rule_number);
    }
}

/// Counts reported by the probe injected into one frame of the page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FrameReport {
    #[serde(alias = "analyseStartingTime")]
    pub run_timestamp: RunTimestamp,
    #[serde(alias = "url")]
    pub frame_url: String,
    pub dom_size: u64,
    pub plugins_number: u64,
    pub style_sheets_number: u64,
    pub print_style_sheets_number: u64,
    pub inline_style_sheets_number: u64,
    pub empty_src_tag_number: u64,
    /// Concatenated text of the frame's inline scripts
    pub inline_js_script: String,
    pub inline_js_scripts_number: u64,
    pub image_resized_in_browser_number: u64,
    pub css_font_face_rule_number: u64,
}

/// Kind of a page resource whose content can be fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Script,
    Stylesheet,
    #[serde(other)]
    Other,
}

/// Descriptor of a page resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
}

impl Resource {
    pub fn new(url: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_is_perfect_score() {
        let measures = Measures::default();
        assert_eq!(measures.eco_index, 100.0);
        assert_eq!(measures.grade, Grade::A);
        assert_eq!(measures.dom_size, 0);
    }

    #[test]
    fn test_merge_frame_sums_and_keeps_maximum() {
        let mut measures = Measures::default();
        measures.merge_frame(&FrameReport {
            dom_size: 500,
            plugins_number: 1,
            style_sheets_number: 4,
            print_style_sheets_number: 1,
            inline_js_scripts_number: 2,
            css_font_face_rule_number: 3,
            ..Default::default()
        });
        measures.merge_frame(&FrameReport {
            dom_size: 300,
            plugins_number: 1,
            style_sheets_number: 2,
            print_style_sheets_number: 1,
            inline_js_scripts_number: 5,
            css_font_face_rule_number: 1,
            ..Default::default()
        });

        assert_eq!(measures.dom_size, 800);
        assert_eq!(measures.plugins_number, 2);
        assert_eq!(measures.print_style_sheets_number, 2);
        assert_eq!(measures.style_sheets_number, 4);
        assert_eq!(measures.inline_js_scripts_number, 5);
        assert_eq!(measures.css_font_face_rule_number, 3);
    }

    #[test]
    fn test_merge_frame_saturates_on_huge_counts() {
        let mut measures = Measures::default();
        measures.merge_frame(&FrameReport {
            dom_size: u64::MAX,
            empty_src_tag_number: u64::MAX,
            ..Default::default()
        });
        measures.merge_frame(&FrameReport {
            dom_size: 1,
            empty_src_tag_number: 7,
            ..Default::default()
        });

        assert_eq!(measures.dom_size, u64::MAX);
        assert_eq!(measures.empty_src_tag_number, u64::MAX);
    }

    fn count() -> impl Strategy<Value = u64> {
        prop_oneof![0u64..10_000, any::<u64>(), Just(u64::MAX)]
    }

    fn frame_report() -> impl Strategy<Value = FrameReport> {
        prop::array::uniform9(count()).prop_map(|c| FrameReport {
            dom_size: c[0],
            plugins_number: c[1],
            style_sheets_number: c[2],
            print_style_sheets_number: c[3],
            inline_style_sheets_number: c[4],
            empty_src_tag_number: c[5],
            inline_js_scripts_number: c[6],
            image_resized_in_browser_number: c[7],
            css_font_face_rule_number: c[8],
            ..Default::default()
        })
    }

    fn merged(frames: &[FrameReport]) -> Measures {
        let mut measures = Measures::default();
        for frame in frames {
            measures.merge_frame(frame);
        }
        measures
    }

    fn saturating_sum(frames: &[FrameReport], field: fn(&FrameReport) -> u64) -> u64 {
        frames.iter().map(field).fold(0, u64::saturating_add)
    }

    fn maximum(frames: &[FrameReport], field: fn(&FrameReport) -> u64) -> u64 {
        frames.iter().map(field).max().unwrap_or(0)
    }

    proptest! {
        #[test]
        fn merged_frames_sum_and_keep_maximum(frames in prop::collection::vec(frame_report(), 0..12)) {
            let measures = merged(&frames);

            prop_assert_eq!(measures.dom_size, saturating_sum(&frames, |f| f.dom_size));
            prop_assert_eq!(measures.plugins_number, saturating_sum(&frames, |f| f.plugins_number));
            prop_assert_eq!(
                measures.print_style_sheets_number,
                saturating_sum(&frames, |f| f.print_style_sheets_number)
            );
            prop_assert_eq!(
                measures.empty_src_tag_number,
                saturating_sum(&frames, |f| f.empty_src_tag_number)
            );
            prop_assert_eq!(
                measures.image_resized_in_browser_number,
                saturating_sum(&frames, |f| f.image_resized_in_browser_number)
            );

            prop_assert_eq!(measures.style_sheets_number, maximum(&frames, |f| f.style_sheets_number));
            prop_assert_eq!(
                measures.inline_style_sheets_number,
                maximum(&frames, |f| f.inline_style_sheets_number)
            );
            prop_assert_eq!(
                measures.inline_js_scripts_number,
                maximum(&frames, |f| f.inline_js_scripts_number)
            );
            prop_assert_eq!(
                measures.css_font_face_rule_number,
                maximum(&frames, |f| f.css_font_face_rule_number)
            );
        }

        #[test]
        fn merge_order_does_not_matter(frames in prop::collection::vec(frame_report(), 0..12)) {
            let mut reversed = frames.clone();
            reversed.reverse();
            prop_assert_eq!(merged(&frames), merged(&reversed));
        }
    }

    #[test]
    fn test_frame_report_accepts_page_script_field_names() {
        let json = r#"{
            "analyseStartingTime": 1700000000000,
            "url": "https://example.com/",
            "domSize": 42,
            "inlineJsScript": "var a = 1;"
        }"#;

        let report: FrameReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.run_timestamp, 1_700_000_000_000);
        assert_eq!(report.frame_url, "https://example.com/");
        assert_eq!(report.dom_size, 42);
        assert_eq!(report.plugins_number, 0);
    }

    #[test]
    fn test_unknown_resource_type_is_other() {
        let resource: Resource =
            serde_json::from_str(r#"{"url": "https://example.com/a.png", "type": "image"}"#)
                .unwrap();
        assert_eq!(resource.kind, ResourceKind::Other);
    }

    #[test]
    fn test_responses_size_kb_rounds() {
        let measures = Measures {
            responses_size: 1499,
            responses_size_uncompress: 2500,
            ..Default::default()
        };
        assert_eq!(measures.responses_size_kb(), 1);
        assert_eq!(measures.responses_size_uncompress_kb(), 3);
    }
}
