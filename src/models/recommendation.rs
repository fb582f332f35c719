use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::{Candidate, FormatBucket, MediaFormat, YearBucket};

/// Sparse tag-name → weight vector
pub type TagVector = HashMap<String, f64>;

/// Aggregate taste derived from an ordered list of liked seeds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedPreferenceVector {
    /// Max-normalized tag weights in [0, 1]
    pub tag_weights: TagVector,
    /// Number of seeds each tag appeared on
    pub tag_frequency: HashMap<String, u32>,
    /// Number of seeds per release-era bucket
    pub year_bucket_frequency: HashMap<YearBucket, u32>,
    pub seed_years: Vec<i32>,
}

impl SeedPreferenceVector {
    pub fn is_empty(&self) -> bool {
        self.tag_weights.is_empty()
    }
}

/// Per-candidate score components, each in [0, 1] except `profile_bonus`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub similarity: f64,
    pub quality: f64,
    pub novelty: f64,
    pub rare_tag_score: f64,
    pub year_novelty_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_bonus: Option<f64>,
    pub total: f64,
}

/// A candidate scored against the seeds, ready for final selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredFinalCandidate {
    pub candidate: Candidate,
    pub tag_vector: TagVector,
    /// Top tags by rank, original spelling
    pub dominant_tags: Vec<String>,
    pub breakdown: ScoreBreakdown,
    pub reason: String,
}

// ============================================================================
// Selection results
// ============================================================================

/// Diagnostic row for one browse-list pick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step2DebugRow {
    pub candidate_id: u64,
    pub title: String,
    pub year: Option<i32>,
    pub format: Option<MediaFormat>,
    pub year_bucket: YearBucket,
    pub phase: u8,
    pub quality: f64,
    pub redundancy_penalty: f64,
    pub diversity_gain: f64,
    pub exposure_penalty: f64,
    pub score: f64,
    pub top_tags: Vec<String>,
    pub studios: Vec<String>,
}

/// Output of the quota-constrained browse selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step2SelectionResult {
    pub selected: Vec<Candidate>,
    pub debug_rows: Vec<Step2DebugRow>,
    pub year_targets: BTreeMap<YearBucket, usize>,
    pub format_targets: BTreeMap<FormatBucket, usize>,
    pub pool_size: usize,
}

/// Diagnostic row for one MMR pick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MmrDebugRow {
    pub candidate_id: u64,
    pub title: String,
    pub year: Option<i32>,
    pub format: Option<MediaFormat>,
    pub base: f64,
    pub mmr: f64,
    pub redundancy: f64,
    pub similarity: f64,
    pub quality: f64,
    pub novelty: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_bonus: Option<f64>,
    pub key_tags: Vec<String>,
}

/// Output of the MMR re-ranking
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MmrSelectionResult {
    pub selected: Vec<ScoredFinalCandidate>,
    pub debug_rows: Vec<MmrDebugRow>,
}

/// One explained entry of the final list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalRecommendation {
    pub candidate: Candidate,
    pub score: f64,
    pub reason: String,
    pub dominant_tags: Vec<String>,
    pub breakdown: ScoreBreakdown,
}

impl From<ScoredFinalCandidate> for FinalRecommendation {
    fn from(scored: ScoredFinalCandidate) -> Self {
        Self {
            score: scored.breakdown.total,
            candidate: scored.candidate,
            reason: scored.reason,
            dominant_tags: scored.dominant_tags,
            breakdown: scored.breakdown,
        }
    }
}
