pub mod acquisition;
pub mod code;
pub mod config;
pub mod ecoindex;
pub mod error;
pub mod har;
pub mod measures;
pub mod network;
pub mod rules;
pub mod session;

pub use acquisition::MeasuresAcquisition;
pub use config::EngineConfig;
pub use ecoindex::{Grade, compute_score};
pub use error::{Error, Result};
pub use measures::{FrameReport, Measures, Resource, ResourceKind};
pub use rules::{Rule, RuleId, Rules, Verdict};
pub use session::{AnalysisSession, AnalysisUpdate, EventOutcome, MeasurementSource, SessionEvent};
