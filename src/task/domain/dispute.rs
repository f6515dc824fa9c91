//! Dispute records and resolution outcomes.

use super::ParseDisputeResolutionError;
use crate::ledger::domain::{Credits, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a dispute splits the escrowed credits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeResolution {
    /// The full escrow returns to the creator.
    CreatorFavor,
    /// The full escrow releases to the performer.
    PerformerFavor,
    /// Half to the performer (floored), the remainder to the creator.
    Split,
}

impl DisputeResolution {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatorFavor => "creator_favor",
            Self::PerformerFavor => "performer_favor",
            Self::Split => "split",
        }
    }
}

impl TryFrom<&str> for DisputeResolution {
    type Error = ParseDisputeResolutionError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "creator_favor" => Ok(Self::CreatorFavor),
            "performer_favor" => Ok(Self::PerformerFavor),
            "split" => Ok(Self::Split),
            _ => Err(ParseDisputeResolutionError(value.to_owned())),
        }
    }
}

/// A dispute raised against an assigned task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispute {
    reason: String,
    raised_by: UserId,
    raised_at: DateTime<Utc>,
    resolved: bool,
    resolution: Option<DisputeResolution>,
}

impl Dispute {
    /// Creates an unresolved dispute.
    #[must_use]
    pub(crate) const fn raise(reason: String, raised_by: UserId, raised_at: DateTime<Utc>) -> Self {
        Self {
            reason,
            raised_by,
            raised_at,
            resolved: false,
            resolution: None,
        }
    }

    /// Marks the dispute resolved with the given outcome.
    pub(crate) const fn resolve(&mut self, resolution: DisputeResolution) {
        self.resolved = true;
        self.resolution = Some(resolution);
    }

    /// Returns the reason the dispute was raised.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns who raised the dispute.
    #[must_use]
    pub const fn raised_by(&self) -> UserId {
        self.raised_by
    }

    /// Returns when the dispute was raised.
    #[must_use]
    pub const fn raised_at(&self) -> DateTime<Utc> {
        self.raised_at
    }

    /// Returns `true` once the dispute has been resolved.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Returns the resolution outcome, if any.
    #[must_use]
    pub const fn resolution(&self) -> Option<DisputeResolution> {
        self.resolution
    }
}

/// Escrow shares produced by a dispute resolution.
///
/// The two shares always sum to the escrow that was held, so resolution
/// conserves credits by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionShares {
    /// Credits released to the performer.
    pub performer: Credits,
    /// Credits returned to the creator.
    pub creator: Credits,
}
