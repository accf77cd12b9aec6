//! Synheart Swim - Deterministic engine for swimming session telemetry
//!
//! Swim turns per-session swim records into quality verdicts, metrics, trends and
//! training recommendations through a deterministic pipeline: record adaptation →
//! session construction → validation → metrics → session summary → trend analysis
//! → recommendations → encoding.
//!
//! ## Modules
//!
//! - **Session model**: [`types`] and [`schema`] define sessions and their raw records
//! - **Per-session stages**: [`validator`], [`metrics`], [`analyzer`]
//! - **Cross-session stages**: [`trend`], [`recommend`]
//! - **Output**: [`encoder`] and the [`pipeline`] entry points

pub mod analyzer;
pub mod config;
pub mod encoder;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod recommend;
pub mod schema;
pub mod stats;
pub mod trend;
pub mod types;
pub mod validator;

pub use analyzer::{SessionAnalyzer, SessionSummary};
pub use config::AnalysisConfig;
pub use error::{ComputeError, StructuralError};
pub use metrics::{format_pace, MetricsCalculator};
pub use pipeline::{sessions_to_analysis_json, AnalysisReport, SwimAnalyzer};
pub use recommend::{Recommendation, RecommendationEngine};
pub use trend::{TrendAnalyzer, TrendReport};
pub use types::{DataQualityReport, SwimmingInterval, SwimmingMetrics, SwimmingSession};
pub use validator::DataValidator;

// Schema exports
pub use schema::{SessionRecord, SessionRecordAdapter, SCHEMA_VERSION};

/// Swim version embedded in every report
pub const SWIM_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for report envelopes
pub const PRODUCER_NAME: &str = "synheart-swim";
