//! Design lifecycle status.

use serde::{Deserialize, Serialize};

/// Where a design is in the upload → configure → order pipeline.
///
/// The status is derived from the record, never stored:
///
/// ```text
/// pending ──► configured ──► ordered
///               ▲    │
///               └────┘  (attribute edits)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DesignStatus {
    /// Created at upload with only the source image.
    #[default]
    Pending,
    /// Case attributes and a cropped image have been saved.
    Configured,
    /// An order references the design. Terminal.
    Ordered,
}

impl DesignStatus {
    /// Whether the pipeline allows moving from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending | Self::Configured, Self::Configured)
                | (Self::Configured, Self::Ordered)
        )
    }

    /// Whether the design can still be edited.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        !matches!(self, Self::Ordered)
    }
}
