use serde::{Deserialize, Serialize};

/// How much real (non-fallback) benchmark data backed an estimate.
///
/// Variants are declared weakest first so that `Ord` ranks them:
/// `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// One step down, saturating at `Low`.
    pub fn downgrade(self) -> Self {
        match self {
            Self::High => Self::Medium,
            Self::Medium | Self::Low => Self::Low,
        }
    }

    /// The weaker of two ratings.
    pub fn weakest(self, other: Self) -> Self {
        self.min(other)
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        };
        f.write_str(label)
    }
}

/// Broad inventory family of an advertising platform. Drives the assumed
/// average frequency used to turn impressions into reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformCategory {
    Social,
    Video,
    Search,
    Display,
    Messaging,
    Professional,
}

/// Whether a platform is bought mainly for awareness or for response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformOrientation {
    Reach,
    Performance,
    Balanced,
}

impl PlatformOrientation {
    pub fn drives_reach(self) -> bool {
        matches!(self, Self::Reach | Self::Balanced)
    }

    pub fn drives_performance(self) -> bool {
        matches!(self, Self::Performance | Self::Balanced)
    }
}
