//! Stage identifiers for the outreach workflow graph.
//!
//! [`StageKind`] names the executable stages plus two virtual endpoints:
//! `Start` (the entry frontier, never executed) and `End` (the absorbing
//! terminal). The string encoding is the persisted form used by
//! checkpoints.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stage of the per-lead cycle, or one of the virtual endpoints.
///
/// The executable cycle is `Fetch → Generate → Review → (Refine|Send) →
/// Update → Fetch`, with `Review` as the sole pause point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    /// Virtual entry point; routing from here always begins a fetch.
    Start,
    Fetch,
    Generate,
    Review,
    Refine,
    Send,
    Update,
    /// Absorbing terminal; the session concludes here.
    End,
}

impl StageKind {
    /// Persisted string form of this stage.
    ///
    /// ```
    /// use leadflow::stage::StageKind;
    ///
    /// assert_eq!(StageKind::Review.encode(), "review");
    /// ```
    #[must_use]
    pub fn encode(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Fetch => "fetch",
            Self::Generate => "generate",
            Self::Review => "review",
            Self::Refine => "refine",
            Self::Send => "send",
            Self::Update => "update",
            Self::End => "end",
        }
    }

    /// Decode a persisted string form. Unknown encodings yield `None`
    /// rather than guessing a stage to resume at.
    ///
    /// ```
    /// use leadflow::stage::StageKind;
    ///
    /// assert_eq!(StageKind::decode("send"), Some(StageKind::Send));
    /// assert_eq!(StageKind::decode("mystery"), None);
    /// ```
    #[must_use]
    pub fn decode(s: &str) -> Option<Self> {
        match s {
            "start" => Some(Self::Start),
            "fetch" => Some(Self::Fetch),
            "generate" => Some(Self::Generate),
            "review" => Some(Self::Review),
            "refine" => Some(Self::Refine),
            "send" => Some(Self::Send),
            "update" => Some(Self::Update),
            "end" => Some(Self::End),
            _ => None,
        }
    }

    /// Returns `true` for the absorbing terminal.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    /// Returns `true` for the stages the executor can actually run.
    #[must_use]
    pub fn is_executable(&self) -> bool {
        !matches!(self, Self::Start | Self::End)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}
