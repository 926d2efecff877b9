use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{model::SavedWorkflow, utils};

/// `round(0.3 * nodes + 0.4 * edges + 0.8 * enhanced)`
pub fn complexity_score(
    nodes: usize,
    edges: usize,
    enhanced: usize,
) -> u32 {
    (0.3 * nodes as f64 + 0.4 * edges as f64 + 0.8 * enhanced as f64).round() as u32
}

pub fn workflow_complexity(workflow: &SavedWorkflow) -> u32 {
    complexity_score(workflow.nodes.len(), workflow.edges.len(), workflow.enhanced_node_count())
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComplexityBucket {
    Simple,
    Moderate,
    Complex,
}

impl ComplexityBucket {
    pub fn from_score(score: u32) -> Self {
        match score {
            0..=2 => ComplexityBucket::Simple,
            3..=5 => ComplexityBucket::Moderate,
            _ => ComplexityBucket::Complex,
        }
    }

    pub fn of(workflow: &SavedWorkflow) -> Self {
        Self::from_score(workflow_complexity(workflow))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeCountBucket {
    /// at most 5 nodes
    Small,
    /// 6 to 15 nodes
    Medium,
    /// more than 15 nodes
    Large,
}

impl NodeCountBucket {
    pub fn from_count(count: usize) -> Self {
        match count {
            0..=5 => NodeCountBucket::Small,
            6..=15 => NodeCountBucket::Medium,
            _ => NodeCountBucket::Large,
        }
    }
}

/// Window of `updatedAt` values relative to a supplied `now`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, strum::AsRefStr, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DateRange {
    /// since UTC midnight
    Today,
    Week,
    Month,
    Year,
}

impl DateRange {
    pub fn start(
        &self,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        match self {
            DateRange::Today => utils::time::start_of_day(now),
            DateRange::Week => now - Duration::days(7),
            DateRange::Month => now - Duration::days(30),
            DateRange::Year => now - Duration::days(365),
        }
    }

    pub fn contains(
        &self,
        at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> bool {
        at >= self.start(now)
    }
}
