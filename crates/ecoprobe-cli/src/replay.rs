//! Replays a recorded page visit into an analysis session.
//!
//! A recording is a HAR file, optionally accompanied by the per-frame DOM
//! reports collected in the page and a manifest of script / style sheet
//! sources. The replay source stamps every fact with the run it is asked
//! to measure, exactly like a live browser integration would.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ecoprobe_core::har::{Entry, HarReader};
use ecoprobe_core::measures::RunTimestamp;
use ecoprobe_core::session::EventSender;
use ecoprobe_core::{FrameReport, MeasurementSource, Resource, ResourceKind, SessionEvent};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything needed to replay one page visit
#[derive(Debug, Clone, Default)]
pub struct Recording {
    pub entries: Vec<Entry>,
    pub frames: Vec<FrameReport>,
    pub resources: Vec<(Resource, String)>,
}

/// One line of a resource manifest. The source is either inline
/// (`content`) or read from `path`, relative to the manifest.
#[derive(Debug, Deserialize)]
struct ManifestEntry {
    url: String,
    #[serde(rename = "type")]
    kind: ResourceKind,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    path: Option<PathBuf>,
}

impl Recording {
    pub fn load(
        har: &Path,
        frames: Option<&Path>,
        resources: Option<&Path>,
        har_resources: bool,
    ) -> Result<Self> {
        tracing::debug!("Reading HAR file: {}", har.display());
        let har = HarReader::from_file(har)?;
        let entries = har.log.entries;

        let mut recording = Recording {
            resources: if har_resources {
                resources_from_entries(&entries)
            } else {
                Vec::new()
            },
            entries,
            frames: Vec::new(),
        };

        if let Some(path) = frames {
            recording.frames = load_frames(path)?;
        }
        if let Some(path) = resources {
            recording.resources.extend(load_manifest(path)?);
        }

        tracing::debug!(
            "Recording: {} entries, {} frame(s), {} resource(s)",
            recording.entries.len(),
            recording.frames.len(),
            recording.resources.len()
        );
        Ok(recording)
    }

    /// Number of events a replay delivers
    pub fn event_count(&self) -> usize {
        self.frames.len() + 1 + self.resources.len()
    }
}

fn load_frames(path: &Path) -> Result<Vec<FrameReport>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read frame reports: {}", path.display()))?;
    let frames = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid frame reports: {}", path.display()))?;
    Ok(frames)
}

fn load_manifest(path: &Path) -> Result<Vec<(Resource, String)>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read resource manifest: {}", path.display()))?;
    let manifest: Vec<ManifestEntry> = serde_json::from_str(&contents)
        .with_context(|| format!("Invalid resource manifest: {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    manifest
        .into_iter()
        .map(|entry| {
            let code = match (entry.content, entry.path) {
                (Some(content), _) => content,
                (None, Some(source)) => {
                    let source = base.join(source);
                    fs::read_to_string(&source).with_context(|| {
                        format!("Failed to read resource source: {}", source.display())
                    })?
                }
                (None, None) => bail!("Resource {} has neither content nor path", entry.url),
            };
            Ok((Resource::new(entry.url, entry.kind), code))
        })
        .collect()
}

/// Scripts and style sheets whose bodies were saved in the HAR
pub fn resources_from_entries(entries: &[Entry]) -> Vec<(Resource, String)> {
    entries
        .iter()
        .filter_map(|entry| {
            let kind = kind_of(entry.response.content_type()?)?;
            let text = entry.response.content.text.as_deref()?;
            let code = match entry.response.content.encoding.as_deref() {
                Some(encoding) if encoding.eq_ignore_ascii_case("base64") => {
                    match STANDARD
                        .decode(text.trim())
                        .ok()
                        .and_then(|bytes| String::from_utf8(bytes).ok())
                    {
                        Some(decoded) => decoded,
                        None => {
                            tracing::warn!("Skipping undecodable body of {}", entry.request.url);
                            return None;
                        }
                    }
                }
                _ => text.to_string(),
            };
            Some((Resource::new(entry.request.url.clone(), kind), code))
        })
        .collect()
}

fn kind_of(content_type: &str) -> Option<ResourceKind> {
    let content_type = content_type.to_ascii_lowercase();
    if content_type.contains("javascript") || content_type.contains("ecmascript") {
        Some(ResourceKind::Script)
    } else if content_type.contains("text/css") {
        Some(ResourceKind::Stylesheet)
    } else {
        None
    }
}

/// Measurement source feeding a recording to the session
pub struct ReplaySource {
    recording: Recording,
}

impl ReplaySource {
    pub fn new(recording: Recording) -> Self {
        Self { recording }
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }
}

fn deliver(events: &EventSender, event: SessionEvent) -> ecoprobe_core::Result<()> {
    events
        .send(event)
        .map_err(|_| ecoprobe_core::Error::Source("analysis session closed".to_string()))
}

#[async_trait]
impl MeasurementSource for ReplaySource {
    async fn inject_frame_probe(&self, run: RunTimestamp, events: EventSender) -> ecoprobe_core::Result<()> {
        for frame in &self.recording.frames {
            let report = FrameReport {
                run_timestamp: run,
                ..frame.clone()
            };
            deliver(&events, SessionEvent::Frame(report))?;
        }
        Ok(())
    }

    async fn start_measuring(&self, run: RunTimestamp, events: EventSender) -> ecoprobe_core::Result<()> {
        deliver(
            &events,
            SessionEvent::Network {
                run,
                entries: self.recording.entries.clone(),
            },
        )?;

        for (resource, content) in &self.recording.resources {
            deliver(
                &events,
                SessionEvent::Resource {
                    run,
                    resource: resource.clone(),
                    content: content.clone(),
                },
            )?;
        }
        Ok(())
    }
}
