//! One analysis run at a time: launch, staleness filtering and update fan-out.
//!
//! Collaborators (frame probe, network inspector, resource fetcher) deliver
//! their results as [`SessionEvent`]s over the session's channel. Events are
//! handled one by one on the caller's task, so the snapshot is only ever
//! mutated from one place.

use crate::acquisition::MeasuresAcquisition;
use crate::code::ScriptValidator;
use crate::config::EngineConfig;
use crate::har::Entry;
use crate::measures::{FrameReport, Measures, Resource, RunTimestamp};
use crate::rules::Rule;
use crate::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Source of the current time in milliseconds since the Unix epoch
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A fact delivered by a collaborator, tagged with the run it belongs to
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Frame(FrameReport),
    Network {
        run: RunTimestamp,
        entries: Vec<Entry>,
    },
    Resource {
        run: RunTimestamp,
        resource: Resource,
        content: String,
    },
}

impl SessionEvent {
    pub fn run(&self) -> RunTimestamp {
        match self {
            SessionEvent::Frame(report) => report.run_timestamp,
            SessionEvent::Network { run, .. } | SessionEvent::Resource { run, .. } => *run,
        }
    }
}

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;

/// External collaborators asked to gather measurements for a run
#[async_trait]
pub trait MeasurementSource: Send + Sync {
    /// Run the frame probe in every frame of the page; each frame report is
    /// sent as [`SessionEvent::Frame`] stamped with `run`
    async fn inject_frame_probe(&self, run: RunTimestamp, events: EventSender) -> Result<()>;

    /// Start collecting network records and resource contents for `run`
    async fn start_measuring(&self, run: RunTimestamp, events: EventSender) -> Result<()>;
}

/// What happened to an incoming event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Merged into the snapshot
    Applied,
    /// Accepted but carried nothing to merge
    Skipped,
    /// From a superseded run, dropped
    Stale,
    /// No run launched yet, dropped
    NoRun,
}

/// State published to the presentation layer after every change
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisUpdate {
    pub run: Option<RunTimestamp>,
    pub measures: Measures,
    pub rules: Vec<Rule>,
}

pub struct AnalysisSession {
    clock: Arc<dyn Clock>,
    debounce_ms: i64,
    current_run: Option<RunTimestamp>,
    acquisition: MeasuresAcquisition,
    events_tx: EventSender,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    updates: watch::Sender<AnalysisUpdate>,
}

impl AnalysisSession {
    pub fn new(
        config: &EngineConfig,
        clock: Arc<dyn Clock>,
        validator: Box<dyn ScriptValidator>,
    ) -> Result<Self> {
        let acquisition = MeasuresAcquisition::new(config, validator)?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (updates, _) = watch::channel(AnalysisUpdate {
            run: None,
            measures: acquisition.measures().clone(),
            rules: acquisition.rules().all_rules(),
        });

        Ok(Self {
            clock,
            debounce_ms: i64::try_from(config.session.debounce_ms).unwrap_or(i64::MAX),
            current_run: None,
            acquisition,
            events_tx,
            events_rx,
            updates,
        })
    }

    /// Start a new run unless the previous one began less than the debounce
    /// window ago. Returns the new run's timestamp, or `None` when ignored.
    pub async fn launch(&mut self, source: &dyn MeasurementSource) -> Result<Option<RunTimestamp>> {
        let now = self.clock.now_millis();
        if let Some(previous) = self.current_run
            && now.saturating_sub(previous) < self.debounce_ms
        {
            tracing::debug!(
                "Ignoring launch {} ms after run {}",
                now.saturating_sub(previous),
                previous
            );
            return Ok(None);
        }

        self.current_run = Some(now);
        self.acquisition.reset();
        self.publish();
        tracing::info!("Starting analysis run {}", now);

        source
            .inject_frame_probe(now, self.events_tx.clone())
            .await?;
        source.start_measuring(now, self.events_tx.clone()).await?;

        Ok(Some(now))
    }

    pub fn current_run(&self) -> Option<RunTimestamp> {
        self.current_run
    }

    /// Whether an event stamped `run` predates the current run
    pub fn is_stale(&self, run: RunTimestamp) -> bool {
        self.current_run.is_some_and(|current| run < current)
    }

    /// Sender collaborators use to deliver events
    pub fn event_sender(&self) -> EventSender {
        self.events_tx.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AnalysisUpdate> {
        self.updates.subscribe()
    }

    pub fn measures(&self) -> &Measures {
        self.acquisition.measures()
    }

    pub fn rules(&self) -> Vec<Rule> {
        self.acquisition.rules().all_rules()
    }

    pub fn snapshot(&self) -> AnalysisUpdate {
        AnalysisUpdate {
            run: self.current_run,
            measures: self.acquisition.measures().clone(),
            rules: self.acquisition.rules().all_rules(),
        }
    }

    pub fn handle(&mut self, event: SessionEvent) -> EventOutcome {
        let run = event.run();
        let Some(current) = self.current_run else {
            tracing::debug!("Dropping event for run {}: no run launched", run);
            return EventOutcome::NoRun;
        };
        if run < current {
            tracing::debug!("Dropping stale event from run {} (current {})", run, current);
            return EventOutcome::Stale;
        }

        let applied = match event {
            SessionEvent::Frame(report) => {
                self.acquisition.merge_frame_report(&report);
                true
            }
            SessionEvent::Network { entries, .. } => {
                self.acquisition.apply_network_snapshot(&entries)
            }
            SessionEvent::Resource {
                resource, content, ..
            } => self.acquisition.apply_resource_code(&resource, &content),
        };

        if applied {
            self.publish();
            EventOutcome::Applied
        } else {
            EventOutcome::Skipped
        }
    }

    /// Wait for the next event and handle it
    pub async fn next_event(&mut self) -> Option<EventOutcome> {
        let event = self.events_rx.recv().await?;
        Some(self.handle(event))
    }

    /// Handle the next queued event without waiting
    pub fn try_next_event(&mut self) -> Option<EventOutcome> {
        let event = self.events_rx.try_recv().ok()?;
        Some(self.handle(event))
    }

    /// Handle every event already queued; returns how many were handled
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while self.try_next_event().is_some() {
            handled += 1;
        }
        handled
    }

    fn publish(&self) {
        self.updates.send_replace(self.snapshot());
    }
}
