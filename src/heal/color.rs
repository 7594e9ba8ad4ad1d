//! Health color classification for heal results.
//!
//! # Responsibilities
//! - Map a redundancy margin (surplus shards) to a visible health color
//! - Classify erasure-coded objects from data/parity block counts
//! - Classify replicated metadata (bucket and system metadata) from disk/set counts
//!
//! # Design Decisions
//! - The decision table is a fixed constant indexed by parity
//! - A threshold of -1 marks a tier that cannot be reached at that parity
//! - Negative surplus means "no deficit data" and maps to Grey, not to an error

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Health color of a heal item, ordered by visible severity.
///
/// `Grey` sorts first but is not a grade: it means no redundancy data was available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Grey,
    Red,
    Yellow,
    Green,
}

impl Color {
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Grey => "grey",
            Color::Red => "red",
            Color::Yellow => "yellow",
            Color::Green => "green",
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced while computing a health color.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("invalid parity shard count/surplus shard count given")]
    InvalidShardCount,

    #[error("cannot get a heal color code")]
    NoColor,

    #[error("invalid set count 0 for replicated item")]
    InvalidSetCount,
}

/// Colors in the order the table columns are scanned.
const COLUMN_ORDER: [Color; 3] = [Color::Red, Color::Yellow, Color::Green];

/// Surplus thresholds per parity (row index = parity - 1).
const DECISION_TABLE: [[i64; 3]; 8] = [
    [0, -1, 1],
    [0, 1, 2],
    [1, 2, 3],
    [1, 2, 4],
    [1, 3, 5],
    [2, 4, 6],
    [2, 4, 7],
    [2, 5, 8],
];

/// Classify a surplus shard count at the given parity.
pub fn classify(parity: i64, surplus: i64) -> Result<Color, ClassifyError> {
    if !(1..=8).contains(&parity) || surplus > parity {
        return Err(ClassifyError::InvalidShardCount);
    }
    if surplus < 0 {
        return Ok(Color::Grey);
    }

    let row = &DECISION_TABLE[(parity - 1) as usize];
    row.iter()
        .zip(COLUMN_ORDER)
        .find(|(bound, _)| **bound != -1 && **bound >= surplus)
        .map(|(_, color)| color)
        .ok_or(ClassifyError::NoColor)
}

/// Classify an erasure-coded object given its online shard count.
pub fn classify_object(parity_blocks: i64, data_blocks: i64, online: i64) -> Result<Color, ClassifyError> {
    classify(parity_blocks, online - data_blocks)
}

/// Classify a replicated metadata item given how many disks hold a copy.
pub fn classify_replicated(disk_count: i64, set_count: i64, online: i64) -> Result<Color, ClassifyError> {
    if set_count <= 0 {
        return Err(ClassifyError::InvalidSetCount);
    }
    let per_set = disk_count / set_count;
    let quorum = per_set / 2 + 1;
    let surplus = online / set_count - quorum;
    let parity = per_set - quorum;
    classify(parity, surplus)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_points() {
        assert_eq!(classify(2, 0), Ok(Color::Red));
        assert_eq!(classify(2, 1), Ok(Color::Yellow));
        assert_eq!(classify(2, 2), Ok(Color::Green));
        // Yellow is unreachable at parity 1
        assert_eq!(classify(1, 0), Ok(Color::Red));
        assert_eq!(classify(1, 1), Ok(Color::Green));
        assert_eq!(classify(8, 3), Ok(Color::Yellow));
        assert_eq!(classify(8, 6), Ok(Color::Green));
    }

    #[test]
    fn test_invalid_input() {
        assert_eq!(classify(9, 0), Err(ClassifyError::InvalidShardCount));
        assert_eq!(classify(0, 0), Err(ClassifyError::InvalidShardCount));
        assert_eq!(classify(-2, -1), Err(ClassifyError::InvalidShardCount));
        assert_eq!(classify(3, 4), Err(ClassifyError::InvalidShardCount));
        assert_eq!(
            ClassifyError::InvalidShardCount.to_string(),
            "invalid parity shard count/surplus shard count given"
        );
    }

    #[test]
    fn test_negative_surplus_is_grey() {
        for parity in 1..=8 {
            assert_eq!(classify(parity, -1), Ok(Color::Grey));
            assert_eq!(classify(parity, -5), Ok(Color::Grey));
        }
    }

    #[test]
    fn test_monotonic_in_surplus() {
        for parity in 1..=8 {
            let mut previous = Color::Grey;
            for surplus in 0..=parity {
                let color = classify(parity, surplus).unwrap();
                assert_ne!(color, Color::Grey, "parity {parity} surplus {surplus}");
                assert!(color >= previous, "parity {parity} surplus {surplus}");
                previous = color;
            }
            // Full surplus always reaches the top tier.
            assert_eq!(previous, Color::Green);
        }
    }

    #[test]
    fn test_object_classifier() {
        // 2 data + 2 parity, 3 of 4 shards online
        assert_eq!(classify_object(2, 2, 3), Ok(Color::Yellow));
        assert_eq!(classify_object(2, 2, 4), Ok(Color::Green));
        assert_eq!(classify_object(2, 2, 1), Ok(Color::Grey));
    }

    #[test]
    fn test_replicated_classifier() {
        // 16 disks in 1 set: quorum 9, parity 7
        assert_eq!(classify_replicated(16, 1, 16), Ok(Color::Green));
        assert_eq!(classify_replicated(16, 1, 9), Ok(Color::Red));
        assert_eq!(classify_replicated(16, 1, 8), Ok(Color::Grey));
        assert_eq!(classify_replicated(16, 0, 16), Err(ClassifyError::InvalidSetCount));
    }

    #[test]
    fn test_color_serde() {
        assert_eq!(serde_json::to_string(&Color::Yellow).unwrap(), "\"yellow\"");
        let c: Color = serde_json::from_str("\"grey\"").unwrap();
        assert_eq!(c, Color::Grey);
    }
}
