//! Task lifecycle status and its transition table.

use super::ParseTaskStatusError;
use serde::{Deserialize, Serialize};

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task accepts requests; no funds are held.
    Open,
    /// A performer is assigned; the price is held in escrow.
    Assigned,
    /// Both parties confirmed; escrow has been released.
    Completed,
    /// The creator withdrew the task before assignment.
    Cancelled,
    /// A party raised a dispute; escrow is frozen pending resolution.
    Disputed,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Assigned => "assigned",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Disputed => "disputed",
        }
    }

    /// Returns `true` when no further transition is permitted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Returns `true` when a task in this status may move to `to`.
    ///
    /// The happy path is `Open -> Assigned -> Completed`; `Open` tasks may
    /// be cancelled, `Assigned` tasks disputed, and disputes resolve into
    /// `Completed`.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Open, Self::Assigned | Self::Cancelled)
                | (Self::Assigned, Self::Completed | Self::Disputed)
                | (Self::Disputed, Self::Completed)
        )
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "assigned" => Ok(Self::Assigned),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "disputed" => Ok(Self::Disputed),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}
