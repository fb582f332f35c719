use std::collections::HashSet;

use crate::models::{clamp01, Candidate, MmrDebugRow, MmrSelectionResult, ScoredFinalCandidate};
use crate::services::diversity::weighted_jaccard_tags;
use crate::services::preference::cosine_similarity;

pub const FINAL_MMR_LAMBDA: f64 = 0.72;
pub const FINAL_MMR_TOP_N: usize = 10;
pub const FINAL_RECOMMENDATION_COUNT: usize = 4;
const KEY_TAG_LIMIT: usize = 4;

/// Caller inputs for the final MMR re-ranking
pub struct MmrOptions<'a> {
    pub franchise_key: &'a dyn Fn(&Candidate) -> String,
    /// Relevance weight, `1 - lambda` goes to the redundancy term
    pub lambda: f64,
    pub top_n: usize,
}

impl<'a> MmrOptions<'a> {
    pub fn new(franchise_key: &'a dyn Fn(&Candidate) -> String) -> Self {
        Self {
            franchise_key,
            lambda: FINAL_MMR_LAMBDA,
            top_n: FINAL_MMR_TOP_N,
        }
    }
}

fn genre_jaccard(left: &Candidate, right: &Candidate) -> f64 {
    let left: HashSet<String> = left.genre_keys().into_iter().collect();
    let right: HashSet<String> = right.genre_keys().into_iter().collect();
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let overlap = left.intersection(&right).count();
    overlap as f64 / (left.len() + right.len() - overlap) as f64
}

/// `0.5 * tagCosine + 0.28 * weightedTagJaccard + 0.22 * genreJaccard`, clamped
pub fn pairwise_similarity(left: &ScoredFinalCandidate, right: &ScoredFinalCandidate) -> f64 {
    let tag_cosine = cosine_similarity(&left.tag_vector, &right.tag_vector);
    let tag_jaccard = weighted_jaccard_tags(&left.candidate, &right.candidate);
    let genre = genre_jaccard(&left.candidate, &right.candidate);
    clamp01(tag_cosine * 0.5 + tag_jaccard * 0.28 + genre * 0.22)
}

/// Greedy Maximal Marginal Relevance re-ranking
///
/// At most `top_n` picks, one per franchise. Each step takes the candidate
/// maximizing `lambda * total - (1 - lambda) * maxSimilarityToPicked`; the
/// earliest of equal scores in total order wins.
pub fn select_final_with_mmr(
    candidates: &[ScoredFinalCandidate],
    options: &MmrOptions,
) -> MmrSelectionResult {
    let mut pool: Vec<(&ScoredFinalCandidate, String)> = candidates
        .iter()
        .map(|scored| (scored, (options.franchise_key)(&scored.candidate)))
        .collect();
    pool.sort_by(|a, b| b.0.breakdown.total.total_cmp(&a.0.breakdown.total));

    let mut selected: Vec<&ScoredFinalCandidate> = Vec::new();
    let mut used_franchises: HashSet<String> = HashSet::new();
    let mut debug_rows: Vec<MmrDebugRow> = Vec::new();

    while selected.len() < options.top_n && !pool.is_empty() {
        let mut best: Option<(usize, f64, f64)> = None;

        for (index, (candidate, franchise)) in pool.iter().enumerate() {
            if used_franchises.contains(franchise) {
                continue;
            }
            let redundancy = selected
                .iter()
                .map(|picked| pairwise_similarity(candidate, picked))
                .fold(0.0_f64, f64::max);
            let mmr = options.lambda * candidate.breakdown.total - (1.0 - options.lambda) * redundancy;
            if best.map_or(true, |(_, best_mmr, _)| mmr > best_mmr) {
                best = Some((index, mmr, redundancy));
            }
        }

        let Some((index, mmr, redundancy)) = best else {
            break;
        };
        let (picked, franchise) = pool.remove(index);
        used_franchises.insert(franchise);
        selected.push(picked);
        debug_rows.push(MmrDebugRow {
            candidate_id: picked.candidate.id,
            title: picked.candidate.display_title(),
            year: picked.candidate.season_year,
            format: picked.candidate.format,
            base: picked.breakdown.total,
            mmr,
            redundancy,
            similarity: picked.breakdown.similarity,
            quality: picked.breakdown.quality,
            novelty: picked.breakdown.novelty,
            profile_bonus: picked.breakdown.profile_bonus,
            key_tags: picked.dominant_tags.iter().take(KEY_TAG_LIMIT).cloned().collect(),
        });
    }

    MmrSelectionResult {
        selected: selected.into_iter().cloned().collect(),
        debug_rows,
    }
}

/// Final list: the first `count` MMR picks, backfilled from the score order
///
/// Backfill skips ids and franchises already present, so the output holds at
/// most one entry per franchise.
pub fn pick_final_recommendations(
    scored: &[ScoredFinalCandidate],
    mmr: &MmrSelectionResult,
    franchise_key: &dyn Fn(&Candidate) -> String,
    count: usize,
) -> Vec<ScoredFinalCandidate> {
    let mut picked: Vec<ScoredFinalCandidate> = mmr.selected.iter().take(count).cloned().collect();
    let mut used_ids: HashSet<u64> = picked.iter().map(|item| item.candidate.id).collect();
    let mut used_franchises: HashSet<String> =
        picked.iter().map(|item| franchise_key(&item.candidate)).collect();

    let mut by_score: Vec<&ScoredFinalCandidate> = scored.iter().collect();
    by_score.sort_by(|a, b| b.breakdown.total.total_cmp(&a.breakdown.total));

    for item in by_score {
        if picked.len() >= count {
            break;
        }
        if used_ids.contains(&item.candidate.id) {
            continue;
        }
        let franchise = franchise_key(&item.candidate);
        if used_franchises.contains(&franchise) {
            continue;
        }
        used_ids.insert(item.candidate.id);
        used_franchises.insert(franchise);
        picked.push(item.clone());
    }

    picked
}
