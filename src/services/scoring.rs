use std::collections::HashMap;

use crate::models::{
    clamp01, Candidate, ScoreBreakdown, ScoredFinalCandidate, SeedPreferenceVector, TagVector,
    UserProfile,
};
use crate::services::preference::{candidate_tag_vector, cosine_similarity, dominant_tag_names};
use crate::services::profile::score_with_profile;
use crate::services::quality::quality_score;

const WEIGHT_SIMILARITY: f64 = 0.65;
const WEIGHT_QUALITY: f64 = 0.2;
const WEIGHT_NOVELTY: f64 = 0.15;
const TAG_SIMILARITY_SHARE: f64 = 0.7;
const SEMANTIC_SIMILARITY_SHARE: f64 = 0.3;
const NOVELTY_TAG_LIMIT: usize = 12;
const UNTAGGED_RARE_SCORE: f64 = 0.2;
const DOMINANT_TAG_LIMIT: usize = 4;

const REASON_PROFILE_THRESHOLD: f64 = 0.08;
const REASON_SIMILARITY_THRESHOLD: f64 = 0.62;
const REASON_NOVELTY_THRESHOLD: f64 = 0.58;
const REASON_QUALITY_THRESHOLD: f64 = 0.68;

/// Optional signals blended into the seed-based score
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub preference: &'a SeedPreferenceVector,
    pub semantic: Option<&'a HashMap<u64, f64>>,
    pub profile: Option<&'a UserProfile>,
}

impl<'a> ScoringContext<'a> {
    pub fn new(preference: &'a SeedPreferenceVector) -> Self {
        Self {
            preference,
            semantic: None,
            profile: None,
        }
    }

    pub fn with_semantic(mut self, semantic: &'a HashMap<u64, f64>) -> Self {
        self.semantic = Some(semantic);
        self
    }

    pub fn with_profile(mut self, profile: &'a UserProfile) -> Self {
        self.profile = Some(profile);
        self
    }
}

struct Novelty {
    score: f64,
    rare_tag_score: f64,
    year_novelty_score: f64,
}

fn compute_novelty(candidate: &Candidate, preference: &SeedPreferenceVector) -> Novelty {
    let tags = candidate.top_tag_keys(NOVELTY_TAG_LIMIT);
    let rare_tag_score = if tags.is_empty() {
        UNTAGGED_RARE_SCORE
    } else {
        let sum: f64 = tags
            .iter()
            .map(|tag| {
                let frequency = preference.tag_frequency.get(tag).copied().unwrap_or(0);
                1.0 / (1.0 + f64::from(frequency))
            })
            .sum();
        sum / tags.len() as f64
    };

    let seen_in_bucket = preference
        .year_bucket_frequency
        .get(&candidate.year_bucket())
        .copied()
        .unwrap_or(0);
    let year_novelty_score = 1.0 / (1.0 + f64::from(seen_in_bucket));

    Novelty {
        score: clamp01(rare_tag_score * 0.72 + year_novelty_score * 0.28),
        rare_tag_score: clamp01(rare_tag_score),
        year_novelty_score: clamp01(year_novelty_score),
    }
}

/// Seed-based score of one candidate and its own tag vector
///
/// `total = 0.65 * similarity + 0.2 * quality + 0.15 * novelty`, clamped.
pub fn score_final_candidate(
    candidate: &Candidate,
    preference: &SeedPreferenceVector,
) -> (ScoreBreakdown, TagVector) {
    let tag_vector = candidate_tag_vector(candidate);
    let similarity = clamp01(cosine_similarity(&preference.tag_weights, &tag_vector));
    let quality = clamp01(quality_score(candidate));
    let novelty = compute_novelty(candidate, preference);

    let breakdown = ScoreBreakdown {
        similarity,
        quality,
        novelty: novelty.score,
        rare_tag_score: novelty.rare_tag_score,
        year_novelty_score: novelty.year_novelty_score,
        semantic_similarity: None,
        profile_bonus: None,
        total: weighted_total(similarity, quality, novelty.score),
    };
    (breakdown, tag_vector)
}

fn weighted_total(similarity: f64, quality: f64, novelty: f64) -> f64 {
    clamp01(WEIGHT_SIMILARITY * similarity + WEIGHT_QUALITY * quality + WEIGHT_NOVELTY * novelty)
}

/// Scores one candidate with every signal available in `context`
pub fn score_with_context(candidate: &Candidate, context: &ScoringContext) -> ScoredFinalCandidate {
    let (mut breakdown, tag_vector) = score_final_candidate(candidate, context.preference);

    if let Some(semantic) = context.semantic.and_then(|map| map.get(&candidate.id)) {
        breakdown.semantic_similarity = Some(*semantic);
        breakdown.similarity = clamp01(
            breakdown.similarity * TAG_SIMILARITY_SHARE + semantic * SEMANTIC_SIMILARITY_SHARE,
        );
        breakdown.total = weighted_total(breakdown.similarity, breakdown.quality, breakdown.novelty);
    }

    if let Some(profile) = context.profile {
        let profile_score = score_with_profile(candidate, profile);
        breakdown.profile_bonus = Some(profile_score.total);
        breakdown.total = clamp01(breakdown.total + profile_score.total);
    }

    let mut scored = ScoredFinalCandidate {
        candidate: candidate.clone(),
        tag_vector,
        dominant_tags: dominant_tag_names(candidate, DOMINANT_TAG_LIMIT),
        breakdown,
        reason: String::new(),
    };
    scored.reason = build_final_reason(&scored);
    scored
}

/// Scores a pool, strongest total first (stable for ties)
pub fn score_candidates(candidates: &[Candidate], context: &ScoringContext) -> Vec<ScoredFinalCandidate> {
    let mut scored: Vec<ScoredFinalCandidate> = candidates
        .iter()
        .map(|candidate| score_with_context(candidate, context))
        .collect();
    scored.sort_by(|a, b| b.breakdown.total.total_cmp(&a.breakdown.total));
    scored
}

/// One-sentence explanation naming the strongest signal
pub fn build_final_reason(scored: &ScoredFinalCandidate) -> String {
    let tag_text = scored
        .dominant_tags
        .iter()
        .take(2)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    let has_tags = !tag_text.is_empty();
    let breakdown = &scored.breakdown;
    let profile_bonus = breakdown.profile_bonus.unwrap_or(0.0);

    if profile_bonus >= REASON_PROFILE_THRESHOLD && has_tags {
        format!("Matches both your saved favourite tags and your picks (e.g. {tag_text}).")
    } else if profile_bonus <= -REASON_PROFILE_THRESHOLD && has_tags {
        format!("Steers clear of tags you disliked while keeping the {tag_text} feel of your picks.")
    } else if breakdown.similarity >= REASON_SIMILARITY_THRESHOLD && has_tags {
        format!("Shares strong tags with your picks (e.g. {tag_text}).")
    } else if breakdown.novelty >= REASON_NOVELTY_THRESHOLD && has_tags {
        format!("Adds something new with less-explored tags ({tag_text}).")
    } else if breakdown.quality >= REASON_QUALITY_THRESHOLD {
        "Highly rated and widely watched, a safe pick.".to_string()
    } else if has_tags {
        format!("Fits the {tag_text} side of your picks.")
    } else {
        "Balanced match on tag similarity and overall quality.".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::preference::build_seed_preference_vector;
    use crate::services::test_fixtures::CandidateBuilder;

    fn seeds() -> Vec<Candidate> {
        vec![
            CandidateBuilder::new(1).tags(&[("Mecha", 80), ("Military", 60)]).year(2015).build(),
            CandidateBuilder::new(2).tags(&[("Mecha", 70), ("Space", 40)]).year(2018).build(),
        ]
    }

    #[test]
    fn test_similar_candidate_scores_higher() {
        let preference = build_seed_preference_vector(&seeds());
        let c = CandidateBuilder::new(3).tags(&[("Mecha", 90)]).build();
        let d = CandidateBuilder::new(4).tags(&[("Romance", 90)]).build();

        let (c_score, _) = score_final_candidate(&c, &preference);
        let (d_score, _) = score_final_candidate(&d, &preference);
        assert!(c_score.similarity > d_score.similarity);
        assert_eq!(d_score.similarity, 0.0);
    }

    #[test]
    fn test_total_is_weighted_sum() {
        let preference = build_seed_preference_vector(&seeds());
        let candidate = CandidateBuilder::new(3)
            .tags(&[("Mecha", 90), ("Drama", 50)])
            .score(80.0)
            .popularity(50_000)
            .build();
        let (breakdown, vector) = score_final_candidate(&candidate, &preference);

        let expected =
            0.65 * breakdown.similarity + 0.2 * breakdown.quality + 0.15 * breakdown.novelty;
        assert!((breakdown.total - expected).abs() < 1e-12);
        assert_eq!(vector.len(), 2);
        assert!(breakdown.semantic_similarity.is_none());
        assert!(breakdown.profile_bonus.is_none());
    }

    #[test]
    fn test_novelty_rewards_unseen_tags_and_eras() {
        let preference = build_seed_preference_vector(&seeds());
        let familiar = CandidateBuilder::new(3).tags(&[("Mecha", 90)]).year(2016).build();
        let fresh = CandidateBuilder::new(4).tags(&[("Cooking", 90)]).year(1990).build();

        let (familiar_score, _) = score_final_candidate(&familiar, &preference);
        let (fresh_score, _) = score_final_candidate(&fresh, &preference);

        // mecha seen twice: 1/3; modern seen twice: 1/3
        assert!((familiar_score.rare_tag_score - 1.0 / 3.0).abs() < 1e-12);
        assert!((familiar_score.year_novelty_score - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(fresh_score.rare_tag_score, 1.0);
        assert_eq!(fresh_score.year_novelty_score, 1.0);
        assert!(fresh_score.novelty > familiar_score.novelty);
    }

    #[test]
    fn test_untagged_candidate_uses_default_rarity() {
        let preference = build_seed_preference_vector(&[]);
        let (breakdown, vector) = score_final_candidate(&CandidateBuilder::new(1).build(), &preference);
        assert_eq!(breakdown.rare_tag_score, UNTAGGED_RARE_SCORE);
        assert_eq!(breakdown.similarity, 0.0);
        assert!(vector.is_empty());
    }

    #[test]
    fn test_semantic_score_blends_into_similarity() {
        let preference = build_seed_preference_vector(&seeds());
        let candidate = CandidateBuilder::new(3).tags(&[("Romance", 90)]).build();
        let semantic: HashMap<u64, f64> = [(3, 1.0)].into_iter().collect();

        let context = ScoringContext::new(&preference).with_semantic(&semantic);
        let scored = score_with_context(&candidate, &context);
        assert_eq!(scored.breakdown.semantic_similarity, Some(1.0));
        assert!((scored.breakdown.similarity - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_profile_adjusts_total() {
        let preference = build_seed_preference_vector(&seeds());
        let candidate = CandidateBuilder::new(3).tags(&[("Mecha", 90)]).build();
        let mut profile = UserProfile::new();
        profile.disliked_tags.insert("mecha".to_string(), 24.0);

        let plain = score_with_context(&candidate, &ScoringContext::new(&preference));
        let with_profile =
            score_with_context(&candidate, &ScoringContext::new(&preference).with_profile(&profile));

        let bonus = with_profile.breakdown.profile_bonus.unwrap_or_default();
        assert!(bonus < 0.0);
        assert!((with_profile.breakdown.total - (plain.breakdown.total + bonus)).abs() < 1e-12);
    }

    #[test]
    fn test_score_candidates_sorts_by_total() {
        let preference = build_seed_preference_vector(&seeds());
        let pool = vec![
            CandidateBuilder::new(3).tags(&[("Romance", 90)]).build(),
            CandidateBuilder::new(4).tags(&[("Mecha", 90)]).build(),
        ];
        let scored = score_candidates(&pool, &ScoringContext::new(&preference));
        assert_eq!(scored[0].candidate.id, 4);
        assert!(!scored[0].reason.is_empty());
    }

    fn scored_with(breakdown: ScoreBreakdown, tags: &[&str]) -> ScoredFinalCandidate {
        ScoredFinalCandidate {
            candidate: CandidateBuilder::new(1).build(),
            tag_vector: TagVector::new(),
            dominant_tags: tags.iter().map(|t| t.to_string()).collect(),
            breakdown,
            reason: String::new(),
        }
    }

    #[test]
    fn test_reason_prefers_profile_match() {
        let scored = scored_with(
            ScoreBreakdown {
                similarity: 0.9,
                profile_bonus: Some(0.1),
                ..Default::default()
            },
            &["Mecha", "Space", "Military"],
        );
        let reason = build_final_reason(&scored);
        assert!(reason.contains("favourite"));
        assert!(reason.contains("Mecha, Space"));
        assert!(!reason.contains("Military"));
    }

    #[test]
    fn test_reason_falls_through_in_order() {
        let similar = scored_with(ScoreBreakdown { similarity: 0.7, ..Default::default() }, &["Mecha"]);
        assert!(build_final_reason(&similar).starts_with("Shares strong tags"));

        let novel = scored_with(ScoreBreakdown { novelty: 0.6, ..Default::default() }, &["Cooking"]);
        assert!(build_final_reason(&novel).starts_with("Adds something new"));

        let quality = scored_with(ScoreBreakdown { quality: 0.7, ..Default::default() }, &[]);
        assert!(build_final_reason(&quality).starts_with("Highly rated"));

        let tagged = scored_with(ScoreBreakdown::default(), &["Drama"]);
        assert_eq!(build_final_reason(&tagged), "Fits the Drama side of your picks.");

        let bare = scored_with(ScoreBreakdown::default(), &[]);
        assert!(build_final_reason(&bare).starts_with("Balanced match"));
    }
}
