//! Quota-constrained greedy selection of the browse list.
//!
//! Candidates are scanned in quality order and the single best-scoring
//! eligible one is picked per step. Three phases relax the quotas in turn:
//! 1. year and format quotas are both enforced
//! 2. year quotas are dropped and format quotas get +2 slack
//! 3. only franchise uniqueness remains
//!
//! Ties keep the earlier candidate, so results are reproducible for a given
//! pool order.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::models::{
    clamp, clamp01, normalize_tag_name, Candidate, FormatBucket, Step2DebugRow,
    Step2SelectionResult, TagVector, YearBucket, PROFILE_EXPOSURE_LIMIT,
};
use crate::services::preference::dominant_tag_names;
use crate::services::quality::quality_score;

/// Default browse list length
pub const BROWSE_TARGET_COUNT: usize = 50;

pub const YEAR_RATIOS: [(YearBucket, f64); 3] = [
    (YearBucket::Modern, 0.6),
    (YearBucket::Mid, 0.3),
    (YearBucket::Classic, 0.1),
];
pub const FORMAT_RATIOS: [(FormatBucket, f64); 2] = [(FormatBucket::Tv, 0.7), (FormatBucket::Other, 0.3)];

const TAG_MAP_LIMIT: usize = 16;
const TAG_MAP_MIN_WEIGHT: f64 = 0.1;
const DEFAULT_TAG_RANK: u8 = 35;
const TOP_TAG_LIMIT: usize = 4;
const STUDIO_LIMIT: usize = 3;

const TAG_OVERLAP_PENALTY: f64 = 0.1;
const EXPOSURE_PENALTY: f64 = 0.12;
const FIRST_PICK_DIVERSITY: f64 = 0.32;
const FRESH_STUDIO_BONUS: f64 = 0.12;
const PHASE_TWO_FORMAT_SLACK: usize = 2;

/// Caller inputs for the browse selector
pub struct Step2Options<'a> {
    pub total: usize,
    /// Groups sequels so only one entry per series is picked
    pub franchise_key: &'a dyn Fn(&Candidate) -> String,
    /// Previously shown ids; only the most recent 300 are considered
    pub exposure_history: &'a [u64],
}

/// Per-candidate features reused across every greedy step
struct BrowseFeatures<'a> {
    candidate: &'a Candidate,
    tag_map: TagVector,
    top_tag_keys: Vec<String>,
    studio_keys: HashSet<String>,
    year_bucket: YearBucket,
    format_bucket: FormatBucket,
    quality: f64,
}

impl<'a> BrowseFeatures<'a> {
    fn of(candidate: &'a Candidate) -> Self {
        Self {
            candidate,
            tag_map: redundancy_tag_map(candidate),
            top_tag_keys: dominant_tag_names(candidate, TOP_TAG_LIMIT)
                .iter()
                .map(|name| normalize_tag_name(name))
                .collect(),
            studio_keys: studio_names(candidate)
                .iter()
                .map(|name| normalize_tag_name(name))
                .filter(|name| !name.is_empty())
                .collect(),
            year_bucket: candidate.year_bucket(),
            format_bucket: candidate.format_bucket(),
            quality: quality_score(candidate),
        }
    }
}

/// Tag map used for redundancy, top 16 tags with a 0.1 weight floor
fn redundancy_tag_map(candidate: &Candidate) -> TagVector {
    let mut map = TagVector::new();
    for tag in candidate.sorted_tags().into_iter().take(TAG_MAP_LIMIT) {
        let key = normalize_tag_name(&tag.name);
        if key.is_empty() {
            continue;
        }
        let weight = clamp(
            f64::from(tag.rank.unwrap_or(DEFAULT_TAG_RANK)) / 100.0,
            TAG_MAP_MIN_WEIGHT,
            1.0,
        );
        map.insert(key, weight);
    }
    map
}

fn studio_names(candidate: &Candidate) -> Vec<String> {
    candidate
        .studios
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .take(STUDIO_LIMIT)
        .map(str::to_string)
        .collect()
}

/// `sum(min) / sum(max)` over the union of keys, 0 when either side is empty
pub(crate) fn weighted_jaccard(left: &TagVector, right: &TagVector) -> f64 {
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (key, l) in left {
        let r = right.get(key).copied().unwrap_or(0.0);
        numerator += l.min(r);
        denominator += l.max(r);
    }
    for (key, r) in right {
        if !left.contains_key(key) {
            denominator += r;
        }
    }
    if denominator == 0.0 {
        return 0.0;
    }
    clamp01(numerator / denominator)
}

/// Weighted Jaccard similarity of two candidates' tag maps
pub fn weighted_jaccard_tags(a: &Candidate, b: &Candidate) -> f64 {
    weighted_jaccard(&redundancy_tag_map(a), &redundancy_tag_map(b))
}

fn studio_overlap_ratio(a: &BrowseFeatures, b: &BrowseFeatures) -> f64 {
    if a.studio_keys.is_empty() || b.studio_keys.is_empty() {
        return 0.0;
    }
    let overlap = a.studio_keys.intersection(&b.studio_keys).count() as f64;
    overlap / a.studio_keys.len().max(b.studio_keys.len()) as f64
}

fn year_overlap_penalty(a: &Candidate, b: &Candidate) -> f64 {
    match (a.season_year, b.season_year) {
        (Some(left), Some(right)) if left != 0 && right != 0 => match (left - right).abs() {
            0..=1 => 0.08,
            2..=3 => 0.04,
            _ => 0.0,
        },
        _ => 0.0,
    }
}

fn format_overlap_penalty(a: &Candidate, b: &Candidate) -> f64 {
    match (a.format, b.format) {
        (Some(left), Some(right)) if left == right => 0.08,
        _ => 0.0,
    }
}

fn pair_redundancy(candidate: &BrowseFeatures, selected: &BrowseFeatures) -> f64 {
    weighted_jaccard(&candidate.tag_map, &selected.tag_map) * 0.62
        + studio_overlap_ratio(candidate, selected) * 0.16
        + year_overlap_penalty(candidate.candidate, selected.candidate)
        + format_overlap_penalty(candidate.candidate, selected.candidate)
}

fn redundancy(candidate: &BrowseFeatures, selected: &[&BrowseFeatures]) -> f64 {
    let max = selected
        .iter()
        .map(|picked| pair_redundancy(candidate, picked))
        .fold(0.0_f64, f64::max);
    clamp01(max)
}

fn diversity_gain(candidate: &BrowseFeatures, selected: &[&BrowseFeatures], redundancy: f64) -> f64 {
    if selected.is_empty() {
        return FIRST_PICK_DIVERSITY;
    }
    let fresh_studio = candidate.studio_keys.iter().any(|studio| {
        !selected
            .iter()
            .any(|picked| picked.studio_keys.contains(studio))
    });
    let fresh_studio_bonus = if fresh_studio { FRESH_STUDIO_BONUS } else { 0.0 };
    let same_bucket = selected
        .iter()
        .filter(|picked| picked.year_bucket == candidate.year_bucket)
        .count();
    let year_novelty_bonus = 0.1 / (1.0 + same_bucket as f64);
    clamp01((1.0 - redundancy) * 0.68 + fresh_studio_bonus + year_novelty_bonus)
}

/// Maximum pairwise redundancy of `candidate` against the already selected items
///
/// `0.62 * weightedTagJaccard + 0.16 * studioOverlap + yearPenalty + formatPenalty`,
/// clamped to [0, 1]; 0 when nothing is selected.
#[cfg(test)]
pub(crate) fn compute_redundancy_penalty(candidate: &Candidate, selected: &[Candidate]) -> f64 {
    let features = BrowseFeatures::of(candidate);
    let selected_features: Vec<BrowseFeatures> = selected.iter().map(BrowseFeatures::of).collect();
    let refs: Vec<&BrowseFeatures> = selected_features.iter().collect();
    redundancy(&features, &refs)
}

/// How much `candidate` would broaden the current selection, in [0, 1]
#[cfg(test)]
pub(crate) fn compute_diversity_gain(candidate: &Candidate, selected: &[Candidate]) -> f64 {
    let features = BrowseFeatures::of(candidate);
    let selected_features: Vec<BrowseFeatures> = selected.iter().map(BrowseFeatures::of).collect();
    let refs: Vec<&BrowseFeatures> = selected_features.iter().collect();
    let redundancy = redundancy(&features, &refs);
    diversity_gain(&features, &refs, redundancy)
}

/// Integer shares of `total` by largest-remainder rounding
///
/// Shares always sum to `total`; leftover units go to the largest fractional
/// parts first, in ratio order for ties.
pub fn compute_quota_targets<K>(total: usize, ratios: &[(K, f64)]) -> BTreeMap<K, usize>
where
    K: Ord + Copy,
{
    let mut targets = BTreeMap::new();
    let mut remainders: Vec<(K, f64)> = Vec::with_capacity(ratios.len());
    let mut assigned = 0;
    for (key, ratio) in ratios {
        let raw = total as f64 * ratio;
        let floored = raw.floor();
        targets.insert(*key, floored as usize);
        assigned += floored as usize;
        remainders.push((*key, raw - floored));
    }
    remainders.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut cursor = 0;
    while assigned < total && !remainders.is_empty() {
        let key = remainders[cursor % remainders.len()].0;
        *targets.entry(key).or_insert(0) += 1;
        assigned += 1;
        cursor += 1;
    }
    targets
}

struct Evaluation {
    score: f64,
    quality: f64,
    redundancy: f64,
    diversity_gain: f64,
    exposure_penalty: f64,
}

fn quota_need<K: Ord>(targets: &BTreeMap<K, usize>, counts: &HashMap<K, usize>, key: &K) -> f64
where
    K: std::hash::Hash + Eq,
{
    let quota = targets.get(key).copied().unwrap_or(0);
    let count = counts.get(key).copied().unwrap_or(0);
    quota.saturating_sub(count) as f64 / quota.max(1) as f64
}

/// Greedy browse list selection
///
/// Returns at most `min(total, pool.len())` items, one per franchise. A pool
/// that runs out before `total` yields a shorter list.
pub fn select_step2_diverse_candidates(
    pool: &[Candidate],
    options: &Step2Options,
) -> Step2SelectionResult {
    let year_targets = compute_quota_targets(options.total, &YEAR_RATIOS);
    let format_targets = compute_quota_targets(options.total, &FORMAT_RATIOS);

    let mut ordered: Vec<(BrowseFeatures, String)> = pool
        .iter()
        .map(|candidate| (BrowseFeatures::of(candidate), (options.franchise_key)(candidate)))
        .collect();
    ordered.sort_by(|a, b| b.0.quality.total_cmp(&a.0.quality));

    let total = options.total.min(ordered.len());
    let history = options.exposure_history;
    let exposure: HashSet<u64> = history[history.len().saturating_sub(PROFILE_EXPOSURE_LIMIT)..]
        .iter()
        .copied()
        .collect();

    let mut selected: Vec<usize> = Vec::with_capacity(total);
    let mut used_ids: HashSet<u64> = HashSet::new();
    let mut used_franchises: HashSet<&str> = HashSet::new();
    let mut year_count: HashMap<YearBucket, usize> = HashMap::new();
    let mut format_count: HashMap<FormatBucket, usize> = HashMap::new();
    let mut tag_frequency: HashMap<String, u32> = HashMap::new();
    let mut debug_rows: Vec<Step2DebugRow> = Vec::with_capacity(total);

    for phase in 1..=3_u8 {
        while selected.len() < total {
            let picked: Vec<&BrowseFeatures> = selected.iter().map(|&i| &ordered[i].0).collect();
            let mut best: Option<(usize, Evaluation)> = None;

            for (index, (item, franchise)) in ordered.iter().enumerate() {
                if used_ids.contains(&item.candidate.id) || used_franchises.contains(franchise.as_str()) {
                    continue;
                }
                let year_used = year_count.get(&item.year_bucket).copied().unwrap_or(0);
                let year_quota = year_targets.get(&item.year_bucket).copied().unwrap_or(0);
                if phase == 1 && year_used >= year_quota {
                    continue;
                }
                let format_used = format_count.get(&item.format_bucket).copied().unwrap_or(0);
                let format_quota = format_targets.get(&item.format_bucket).copied().unwrap_or(0);
                let slack = if phase == 1 { 0 } else { PHASE_TWO_FORMAT_SLACK };
                if phase <= 2 && format_used >= format_quota + slack {
                    continue;
                }

                let redundancy = redundancy(item, &picked);
                let diversity_gain = diversity_gain(item, &picked, redundancy);
                let exposure_penalty = if exposure.contains(&item.candidate.id) {
                    EXPOSURE_PENALTY
                } else {
                    0.0
                };
                let tag_penalty = tag_overlap_penalty(item, !picked.is_empty(), &tag_frequency);
                let year_need = quota_need(&year_targets, &year_count, &item.year_bucket);
                let format_need = quota_need(&format_targets, &format_count, &item.format_bucket);

                let score = item.quality * 0.62 + diversity_gain * 0.28 + year_need * 0.12
                    + format_need * 0.06
                    - redundancy * 0.25
                    - tag_penalty
                    - exposure_penalty;

                if best.as_ref().map_or(true, |(_, current)| score > current.score) {
                    best = Some((
                        index,
                        Evaluation {
                            score,
                            quality: item.quality,
                            redundancy,
                            diversity_gain,
                            exposure_penalty,
                        },
                    ));
                }
            }

            let Some((index, evaluation)) = best else {
                break;
            };
            let (item, franchise) = &ordered[index];
            selected.push(index);
            used_ids.insert(item.candidate.id);
            used_franchises.insert(franchise.as_str());
            *year_count.entry(item.year_bucket).or_insert(0) += 1;
            *format_count.entry(item.format_bucket).or_insert(0) += 1;
            for tag in &item.top_tag_keys {
                *tag_frequency.entry(tag.clone()).or_insert(0) += 1;
            }
            debug_rows.push(Step2DebugRow {
                candidate_id: item.candidate.id,
                title: item.candidate.display_title(),
                year: item.candidate.season_year,
                format: item.candidate.format,
                year_bucket: item.year_bucket,
                phase,
                quality: evaluation.quality,
                redundancy_penalty: evaluation.redundancy,
                diversity_gain: evaluation.diversity_gain,
                exposure_penalty: evaluation.exposure_penalty,
                score: evaluation.score,
                top_tags: dominant_tag_names(item.candidate, TOP_TAG_LIMIT),
                studios: studio_names(item.candidate),
            });
        }

        if selected.len() >= total {
            break;
        }
    }

    tracing::debug!(
        pool = pool.len(),
        requested = options.total,
        selected = selected.len(),
        "Browse list selected"
    );

    Step2SelectionResult {
        selected: selected.iter().map(|&i| ordered[i].0.candidate.clone()).collect(),
        debug_rows,
        year_targets,
        format_targets,
        pool_size: pool.len(),
    }
}

fn tag_overlap_penalty(
    candidate: &BrowseFeatures,
    has_selection: bool,
    tag_frequency: &HashMap<String, u32>,
) -> f64 {
    if !has_selection || candidate.top_tag_keys.is_empty() {
        return 0.0;
    }
    let overlap: u32 = candidate
        .top_tag_keys
        .iter()
        .map(|tag| tag_frequency.get(tag).copied().unwrap_or(0))
        .sum();
    f64::from(overlap) / candidate.top_tag_keys.len() as f64 * TAG_OVERLAP_PENALTY
}
