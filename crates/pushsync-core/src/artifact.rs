use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Type prefix immediately followed by digits, e.g. `US123`, `DE7`, `TA42`.
/// Alternation order matters: `D` is tried before `DE`/`DS`, which is harmless
/// because a bare `D` needs a digit next.
pub(crate) const ARTIFACT_PATTERN: &str = r"(D|DE|DS|TA|TC|S|US)\d+";

static ARTIFACT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(ARTIFACT_PATTERN).unwrap());

// ── Kinds ──

/// Work-item kinds that can be referenced from a commit message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Defect,
    DefectSuite,
    Task,
    TestCase,
    /// Hierarchical requirement (user story).
    Requirement,
}

impl ArtifactKind {
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "D" | "DE" => Some(ArtifactKind::Defect),
            "DS" => Some(ArtifactKind::DefectSuite),
            "TA" => Some(ArtifactKind::Task),
            "TC" => Some(ArtifactKind::TestCase),
            "S" | "US" => Some(ArtifactKind::Requirement),
            _ => None,
        }
    }

    /// Collection name of this kind in the tracker REST API.
    pub fn collection(self) -> &'static str {
        match self {
            ArtifactKind::Defect => "defect",
            ArtifactKind::DefectSuite => "defectsuite",
            ArtifactKind::Task => "task",
            ArtifactKind::TestCase => "testcase",
            ArtifactKind::Requirement => "hierarchicalrequirement",
        }
    }

    /// Object type name, used as the wrapper key of update bodies.
    pub fn type_name(self) -> &'static str {
        match self {
            ArtifactKind::Defect => "Defect",
            ArtifactKind::DefectSuite => "DefectSuite",
            ArtifactKind::Task => "Task",
            ArtifactKind::TestCase => "TestCase",
            ArtifactKind::Requirement => "HierarchicalRequirement",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

// ── Identifiers ──

/// A formatted artifact identifier such as `US123`, with its inferred kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactId {
    formatted: String,
    kind: ArtifactKind,
}

impl ArtifactId {
    /// Parse a whole string as one identifier. Returns `None` unless the input
    /// is exactly a known prefix followed by one or more ASCII digits.
    pub fn parse(s: &str) -> Option<Self> {
        let split = s.find(|c: char| c.is_ascii_digit())?;
        let (prefix, digits) = s.split_at(split);
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let kind = ArtifactKind::from_prefix(prefix)?;
        Some(Self {
            formatted: s.to_string(),
            kind,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.formatted
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted)
    }
}

/// Every non-overlapping identifier in `message`, in order of appearance.
/// Repeated identifiers are returned once per occurrence.
pub fn scan_artifacts(message: &str) -> Vec<ArtifactId> {
    ARTIFACT_RE
        .captures_iter(message)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let kind = ArtifactKind::from_prefix(caps.get(1)?.as_str())?;
            Some(ArtifactId {
                formatted: whole.as_str().to_string(),
                kind,
            })
        })
        .collect()
}

// ── Tests ──
