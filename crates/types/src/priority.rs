//! Scheduling priority and victim selection policy

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Process priority. Ordering is `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Numeric weight used by cost models (Low = 1, Medium = 2, High = 3)
    #[must_use]
    pub const fn weight(self) -> u64 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

impl clap::ValueEnum for Priority {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Low, Self::Medium, Self::High]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Low => clap::builder::PossibleValue::new("low"),
            Self::Medium => clap::builder::PossibleValue::new("medium"),
            Self::High => clap::builder::PossibleValue::new("high"),
        })
    }
}

/// Policy used to pick which member of a deadlock cycle to terminate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VictimPolicy {
    /// Lowest priority first; ties go to the lowest process id
    LowestPriority,
    /// Fewest held resources first; ties go to the lowest process id
    LeastResources,
}

impl Default for VictimPolicy {
    fn default() -> Self {
        Self::LowestPriority
    }
}

impl fmt::Display for VictimPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowestPriority => write!(f, "lowest_priority"),
            Self::LeastResources => write!(f, "least_resources"),
        }
    }
}

impl FromStr for VictimPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "lowest_priority" => Ok(Self::LowestPriority),
            "least_resources" => Ok(Self::LeastResources),
            other => Err(format!("unknown victim policy: {other}")),
        }
    }
}

impl clap::ValueEnum for VictimPolicy {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::LowestPriority, Self::LeastResources]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::LowestPriority => clap::builder::PossibleValue::new("lowest-priority"),
            Self::LeastResources => clap::builder::PossibleValue::new("least-resources"),
        })
    }
}
