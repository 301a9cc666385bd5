use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::artifact::{ArtifactId, ARTIFACT_PATTERN};

/// Transition keyword, one whitespace character, then an identifier. Keywords
/// are case-sensitive. The identifier is captured whole (greedy digits), so
/// `STARTS US12` never counts as a signal for `US1`.
static SIGNAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(STARTS|BEGINS|COMPLETES|FINISHES)\s({ARTIFACT_PATTERN})"
    ))
    .unwrap()
});

// ── States ──

/// Workflow state an artifact is moved to by a commit message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleState {
    #[serde(rename = "In-Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl ScheduleState {
    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleState::InProgress => "In-Progress",
            ScheduleState::Completed => "Completed",
        }
    }
}

impl fmt::Display for ScheduleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Signals ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// `STARTS` / `BEGINS`
    Start,
    /// `COMPLETES` / `FINISHES`
    Finish,
}

impl Signal {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "STARTS" | "BEGINS" => Some(Signal::Start),
            "COMPLETES" | "FINISHES" => Some(Signal::Finish),
            _ => None,
        }
    }

    pub fn target_state(self) -> ScheduleState {
        match self {
            Signal::Start => ScheduleState::InProgress,
            Signal::Finish => ScheduleState::Completed,
        }
    }
}

/// Every keyword/identifier pair in `message`, in order of appearance.
pub fn scan_signals(message: &str) -> Vec<(Signal, ArtifactId)> {
    SIGNAL_RE
        .captures_iter(message)
        .filter_map(|caps| {
            let signal = Signal::from_keyword(caps.get(1)?.as_str())?;
            let id = ArtifactId::parse(caps.get(2)?.as_str())?;
            Some((signal, id))
        })
        .collect()
}

/// Target state that `message` asks for on `id`, if any.
///
/// A finish signal wins over a start signal for the same identifier, wherever
/// they appear in the message.
pub fn target_state(message: &str, id: &ArtifactId) -> Option<ScheduleState> {
    let mut started = false;
    let mut finished = false;
    for (signal, found) in scan_signals(message) {
        if found != *id {
            continue;
        }
        match signal {
            Signal::Start => started = true,
            Signal::Finish => finished = true,
        }
    }
    if finished {
        Some(Signal::Finish.target_state())
    } else if started {
        Some(Signal::Start.target_state())
    } else {
        None
    }
}

// ── Tests ──
