// XApp Endorsement Engine
// Score Table - node strength level to endorsement points, plus the threshold
//
// INVARIANTS:
// 1. A level absent from the table is worth 0 points
// 2. A level worth 0 points can never be used to endorse
// 3. The table is replaced wholesale on update, never merged

use crate::types::NodeLevel;
use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;

/// Default minimum aggregate score for an app to be endorsed
pub const DEFAULT_SCORE_THRESHOLD: u64 = 100;

/// Node strength tiers and their default endorsement points
pub const DEFAULT_LEVEL_POINTS: [(NodeLevel, u64); 8] = [
    (0, 0),   // no node
    (1, 2),   // Strength
    (2, 13),  // Thunder
    (3, 50),  // Mjolnir
    (4, 3),   // VeThor X
    (5, 9),   // Strength X
    (6, 35),  // Thunder X
    (7, 100), // Mjolnir X
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreTable {
    /// Endorsement points per node level
    pub points: BTreeMap<NodeLevel, u64>,

    /// Minimum aggregate score for an app to count as endorsed
    pub threshold: u64,
}

impl Default for ScoreTable {
    fn default() -> Self {
        ScoreTable {
            points: DEFAULT_LEVEL_POINTS.into_iter().collect(),
            threshold: DEFAULT_SCORE_THRESHOLD,
        }
    }
}

impl ScoreTable {
    pub fn new(points: BTreeMap<NodeLevel, u64>, threshold: u64) -> Self {
        ScoreTable { points, threshold }
    }

    /// Points a node of `level` contributes to the app it endorses
    pub fn points_for(&self, level: NodeLevel) -> u64 {
        self.points.get(&level).copied().unwrap_or(0)
    }

    /// Whether a node of `level` may endorse at all
    pub fn can_endorse(&self, level: NodeLevel) -> bool {
        self.points_for(level) > 0
    }

    /// Aggregate score of a set of node levels.
    /// Saturates rather than wrapping on absurd tables.
    pub fn aggregate<I>(&self, levels: I) -> u64
    where
        I: IntoIterator<Item = NodeLevel>,
    {
        levels
            .into_iter()
            .fold(0u64, |acc, level| acc.saturating_add(self.points_for(level)))
    }

    pub fn meets_threshold(&self, score: u64) -> bool {
        score >= self.threshold
    }

    pub fn replace_points(&mut self, points: BTreeMap<NodeLevel, u64>) {
        self.points = points;
    }

    pub fn set_threshold(&mut self, threshold: u64) {
        self.threshold = threshold;
    }
}
