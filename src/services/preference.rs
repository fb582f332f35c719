use std::collections::HashMap;

use crate::models::{clamp, clamp01, normalize_tag_name, Candidate, SeedPreferenceVector, TagVector};

/// Tags per item that contribute to preference and candidate vectors
pub const VECTOR_TAG_LIMIT: usize = 16;
/// Extra weight given to the most recent seed relative to the first one
const RECENCY_BOOST: f64 = 0.4;
const DEFAULT_TAG_RANK: u8 = 35;
const MIN_TAG_WEIGHT: f64 = 0.15;

/// Rank-derived weight of a tag, `clamp(rank / 100, 0.15, 1)`
pub fn tag_weight(rank: Option<u8>) -> f64 {
    clamp(f64::from(rank.unwrap_or(DEFAULT_TAG_RANK)) / 100.0, MIN_TAG_WEIGHT, 1.0)
}

/// Aggregates an ordered list of liked seeds into a weighted tag vector
///
/// Later seeds get up to 1.4x the weight of the first one. Tag weights are
/// divided by the largest aggregate weight, so the top tag is exactly 1.0.
/// An empty seed list yields an empty vector.
pub fn build_seed_preference_vector(seeds: &[Candidate]) -> SeedPreferenceVector {
    let mut tag_weights: TagVector = HashMap::new();
    let mut tag_frequency: HashMap<String, u32> = HashMap::new();
    let mut year_bucket_frequency = HashMap::new();
    let seed_years: Vec<i32> = seeds.iter().filter_map(|seed| seed.season_year).collect();
    let divisor = seeds.len().saturating_sub(1).max(1) as f64;

    for (index, seed) in seeds.iter().enumerate() {
        let recency = 1.0 + (index as f64 / divisor) * RECENCY_BOOST;
        for tag in seed.sorted_tags().into_iter().take(VECTOR_TAG_LIMIT) {
            let key = normalize_tag_name(&tag.name);
            if key.is_empty() {
                continue;
            }
            *tag_weights.entry(key.clone()).or_insert(0.0) += tag_weight(tag.rank) * recency;
            *tag_frequency.entry(key).or_insert(0) += 1;
        }
        *year_bucket_frequency.entry(seed.year_bucket()).or_insert(0) += 1;
    }

    let max_weight = tag_weights.values().copied().fold(0.0_f64, f64::max);
    if max_weight > 0.0 {
        for weight in tag_weights.values_mut() {
            *weight /= max_weight;
        }
    }

    SeedPreferenceVector {
        tag_weights,
        tag_frequency,
        year_bucket_frequency,
        seed_years,
    }
}

/// The candidate's own tag vector, top tags by rank with the seed weight rule
pub fn candidate_tag_vector(candidate: &Candidate) -> TagVector {
    let mut vector = HashMap::new();
    for tag in candidate.sorted_tags().into_iter().take(VECTOR_TAG_LIMIT) {
        let key = normalize_tag_name(&tag.name);
        if key.is_empty() {
            continue;
        }
        vector.insert(key, tag_weight(tag.rank));
    }
    vector
}

/// Cosine similarity of two non-negative sparse vectors, in [0, 1]
///
/// Zero when either side is empty.
pub fn cosine_similarity(left: &TagVector, right: &TagVector) -> f64 {
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let (small, large) = if left.len() <= right.len() {
        (left, right)
    } else {
        (right, left)
    };
    let dot: f64 = small
        .iter()
        .map(|(name, value)| value * large.get(name).copied().unwrap_or(0.0))
        .sum();
    let norm_left = left.values().map(|v| v * v).sum::<f64>().sqrt();
    let norm_right = right.values().map(|v| v * v).sum::<f64>().sqrt();
    if norm_left == 0.0 || norm_right == 0.0 {
        return 0.0;
    }
    clamp01(dot / (norm_left * norm_right))
}

/// Strongest preference tags, heaviest first
pub fn top_preference_tags(preference: &SeedPreferenceVector, limit: usize) -> Vec<String> {
    let mut entries: Vec<(&String, &f64)> = preference.tag_weights.iter().collect();
    entries.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));
    entries
        .into_iter()
        .take(limit)
        .map(|(name, _)| name.clone())
        .collect()
}

/// Top tags by rank in their original spelling
pub fn dominant_tag_names(candidate: &Candidate, limit: usize) -> Vec<String> {
    candidate
        .sorted_tags()
        .into_iter()
        .map(|tag| tag.name.trim())
        .filter(|name| !name.is_empty())
        .take(limit)
        .map(str::to_string)
        .collect()
}
