use serde::{Deserialize, Serialize};

/// Severity class of a single finding, ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    Medium,
    Low,
    Ok,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::High => "high",
            Impact::Medium => "medium",
            Impact::Low => "low",
            Impact::Ok => "ok",
        }
    }
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score of one scan: exactly one of the four counters is 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityRating {
    pub high: u32,
    pub medium: u32,
    pub low: u32,
    pub ok: u32,
    pub explanation: String,
}

impl SeverityRating {
    pub fn new(impact: Impact, explanation: impl Into<String>) -> Self {
        let mut rating = Self {
            high: 0,
            medium: 0,
            low: 0,
            ok: 0,
            explanation: explanation.into(),
        };
        match impact {
            Impact::High => rating.high = 1,
            Impact::Medium => rating.medium = 1,
            Impact::Low => rating.low = 1,
            Impact::Ok => rating.ok = 1,
        }
        rating
    }

    pub fn impact(&self) -> Impact {
        if self.high > 0 {
            Impact::High
        } else if self.medium > 0 {
            Impact::Medium
        } else if self.low > 0 {
            Impact::Low
        } else {
            Impact::Ok
        }
    }
}
