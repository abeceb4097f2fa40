//! Activity sample input types.
//!
//! Samples are produced by an external activity-recognition service and
//! pushed one at a time. The core never re-orders or buffers them; it
//! only validates the fields it is about to aggregate. The candidate
//! list is carried for logging collaborators and ignored by aggregation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::StoreError;

/// Classifier confidence ceiling. Samples above this are malformed.
pub const MAX_CONFIDENCE: u8 = 100;

/// Errors surfaced by sample validation and aggregation.
///
/// None of these are used for normal control flow: "not a walking
/// bucket" is a regular branch, not a failure.
#[derive(Error, Debug)]
pub enum AggregateError {
    /// The sample carried a field outside its contract. State is not
    /// mutated when this is returned; the caller decides whether to
    /// log and drop or abort.
    #[error("malformed sample: {0}")]
    MalformedSample(String),
    /// Persistence failure propagated from the state store.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The closed set of activity classifications the recognition service
/// can emit. Never extended at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    InVehicle,
    OnBicycle,
    OnFoot,
    Still,
    Unknown,
    Tilting,
}

impl ActivityKind {
    /// Stable lowercase name, used for persistence and log lines.
    pub fn name(&self) -> &'static str {
        match self {
            ActivityKind::InVehicle => "in_vehicle",
            ActivityKind::OnBicycle => "on_bicycle",
            ActivityKind::OnFoot => "on_foot",
            ActivityKind::Still => "still",
            ActivityKind::Unknown => "unknown",
            ActivityKind::Tilting => "tilting",
        }
    }

    /// Inverse of [`ActivityKind::name`]. Returns `None` for names the
    /// closed enumeration does not contain.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "in_vehicle" => Some(ActivityKind::InVehicle),
            "on_bicycle" => Some(ActivityKind::OnBicycle),
            "on_foot" => Some(ActivityKind::OnFoot),
            "still" => Some(ActivityKind::Still),
            "unknown" => Some(ActivityKind::Unknown),
            "tilting" => Some(ActivityKind::Tilting),
            _ => None,
        }
    }

    /// Whether this classification means the user is moving between
    /// locations. Still, Tilting and Unknown do not.
    pub fn is_moving(&self) -> bool {
        !matches!(
            self,
            ActivityKind::Still | ActivityKind::Tilting | ActivityKind::Unknown
        )
    }
}

/// One candidate classification with its confidence, as reported by the
/// recognition service alongside the winning classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityCandidate {
    pub kind: ActivityKind,
    /// Classifier confidence, 0-100.
    pub confidence: u8,
}

/// A single activity classification sample.
///
/// `confidence` is only meaningful relative to other samples inside the
/// same bucket window; it is never compared across windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySample {
    /// Wall-clock instant, milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    /// Most probable classification for this sample.
    pub kind: ActivityKind,
    /// Classifier confidence for `kind`, 0-100.
    pub confidence: u8,
    /// All candidate classifications, most probable first. Used only by
    /// logging collaborators, never by aggregation.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<ActivityCandidate>,
}

impl ActivitySample {
    /// Create a sample with no candidate list.
    pub fn new(timestamp_ms: i64, kind: ActivityKind, confidence: u8) -> Self {
        Self {
            timestamp_ms,
            kind,
            confidence,
            candidates: Vec::new(),
        }
    }

    /// Reject samples that violate the input contract before any state
    /// is touched.
    pub fn validate(&self) -> Result<(), AggregateError> {
        if self.timestamp_ms < 0 {
            return Err(AggregateError::MalformedSample(format!(
                "timestamp_ms must be non-negative, got {}",
                self.timestamp_ms
            )));
        }
        if self.confidence > MAX_CONFIDENCE {
            return Err(AggregateError::MalformedSample(format!(
                "confidence must be in [0, {}], got {}",
                MAX_CONFIDENCE, self.confidence
            )));
        }
        for c in &self.candidates {
            if c.confidence > MAX_CONFIDENCE {
                return Err(AggregateError::MalformedSample(format!(
                    "candidate {} confidence out of range: {}",
                    c.kind.name(),
                    c.confidence
                )));
            }
        }
        Ok(())
    }
}
