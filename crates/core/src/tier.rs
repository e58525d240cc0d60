//! Score tiers and histogram buckets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower bound of the excellent tier.
pub const EXCELLENT_THRESHOLD: f64 = 80.0;

/// Lower bound of the good tier.
pub const GOOD_THRESHOLD: f64 = 60.0;

/// Four-way classification of a score, shared by every renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreTier {
    Excellent,
    Good,
    NeedsImprovement,
    None,
}

impl ScoreTier {
    /// All tiers, best first.
    pub const ALL: [ScoreTier; 4] = [
        ScoreTier::Excellent,
        ScoreTier::Good,
        ScoreTier::NeedsImprovement,
        ScoreTier::None,
    ];

    /// Classify an optional score.
    pub fn classify(score: Option<f64>) -> Self {
        match score {
            Some(s) if s >= EXCELLENT_THRESHOLD => ScoreTier::Excellent,
            Some(s) if s >= GOOD_THRESHOLD => ScoreTier::Good,
            Some(_) => ScoreTier::NeedsImprovement,
            None => ScoreTier::None,
        }
    }

    /// Stable tier name, also used as the CSS class.
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreTier::Excellent => "excellent",
            ScoreTier::Good => "good",
            ScoreTier::NeedsImprovement => "needs-improvement",
            ScoreTier::None => "none",
        }
    }

    /// Human label for legends.
    pub fn label(self) -> &'static str {
        match self {
            ScoreTier::Excellent => "Excellent (80 and above)",
            ScoreTier::Good => "Good (60-79)",
            ScoreTier::NeedsImprovement => "Needs improvement (below 60)",
            ScoreTier::None => "No score",
        }
    }

    /// Console glyph.
    pub fn glyph(self) -> &'static str {
        match self {
            ScoreTier::Excellent => "🟢",
            ScoreTier::Good => "🟡",
            ScoreTier::NeedsImprovement => "🔴",
            ScoreTier::None => "⚪",
        }
    }

    /// Reverse of [`ScoreTier::glyph`].
    pub fn from_glyph(glyph: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.glyph() == glyph)
    }

    /// Reverse of [`ScoreTier::as_str`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for ScoreTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Histogram bucket over fixed boundaries `[0,40) [40,60) [60,80) [80,100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScoreBucket {
    Below40,
    From40To60,
    From60To80,
    From80To100,
}

impl ScoreBucket {
    /// All buckets in ascending order.
    pub const ALL: [ScoreBucket; 4] = [
        ScoreBucket::Below40,
        ScoreBucket::From40To60,
        ScoreBucket::From60To80,
        ScoreBucket::From80To100,
    ];

    /// Bucket for a score. Scores are validated to `[0, 100]` at load time;
    /// anything at or above 80 lands in the top bucket.
    pub fn of(score: f64) -> Self {
        if score < 40.0 {
            ScoreBucket::Below40
        } else if score < 60.0 {
            ScoreBucket::From40To60
        } else if score < 80.0 {
            ScoreBucket::From60To80
        } else {
            ScoreBucket::From80To100
        }
    }

    /// Position in [`ScoreBucket::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Range label.
    pub fn label(self) -> &'static str {
        match self {
            ScoreBucket::Below40 => "[0, 40)",
            ScoreBucket::From40To60 => "[40, 60)",
            ScoreBucket::From60To80 => "[60, 80)",
            ScoreBucket::From80To100 => "[80, 100]",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(ScoreTier::classify(Some(80.0)), ScoreTier::Excellent);
        assert_eq!(ScoreTier::classify(Some(79.99)), ScoreTier::Good);
        assert_eq!(ScoreTier::classify(Some(60.0)), ScoreTier::Good);
        assert_eq!(ScoreTier::classify(Some(59.9)), ScoreTier::NeedsImprovement);
        assert_eq!(ScoreTier::classify(Some(0.0)), ScoreTier::NeedsImprovement);
        assert_eq!(ScoreTier::classify(None), ScoreTier::None);
    }

    #[test]
    fn test_tier_names_round_trip() {
        for tier in ScoreTier::ALL {
            assert_eq!(ScoreTier::from_name(tier.as_str()), Some(tier));
            assert_eq!(ScoreTier::from_glyph(tier.glyph()), Some(tier));
        }
        assert_eq!(ScoreTier::NeedsImprovement.to_string(), "needs-improvement");
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(ScoreBucket::of(0.0), ScoreBucket::Below40);
        assert_eq!(ScoreBucket::of(39.9), ScoreBucket::Below40);
        assert_eq!(ScoreBucket::of(40.0), ScoreBucket::From40To60);
        assert_eq!(ScoreBucket::of(60.0), ScoreBucket::From60To80);
        assert_eq!(ScoreBucket::of(80.0), ScoreBucket::From80To100);
        assert_eq!(ScoreBucket::of(100.0), ScoreBucket::From80To100);
    }

    #[test]
    fn test_bucket_index_matches_order() {
        for (i, bucket) in ScoreBucket::ALL.into_iter().enumerate() {
            assert_eq!(bucket.index(), i);
        }
    }
}
