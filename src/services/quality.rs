use crate::models::{clamp01, Candidate};

const SCORE_FLOOR: f64 = 50.0;
const SCORE_SPAN: f64 = 45.0;
const POPULARITY_LOG_CEILING: f64 = 5.4;
const FAVOURITES_LOG_CEILING: f64 = 4.8;
const TRENDING_LOG_CEILING: f64 = 5.0;

/// Taste-independent "how good and how popular" score in [0, 1]
///
/// Missing counters count as zero.
pub fn quality_score(candidate: &Candidate) -> f64 {
    let score_norm = clamp01((candidate.score_value() - SCORE_FLOOR) / SCORE_SPAN);
    let popularity_norm = log_norm(candidate.popularity, POPULARITY_LOG_CEILING);
    let favourites_norm = log_norm(candidate.favourites, FAVOURITES_LOG_CEILING);
    let trending_norm = log_norm(candidate.trending, TRENDING_LOG_CEILING);

    score_norm * 0.52 + popularity_norm * 0.24 + favourites_norm * 0.16 + trending_norm * 0.08
}

fn log_norm(counter: Option<u64>, ceiling: f64) -> f64 {
    let value = counter.unwrap_or(0) as f64;
    clamp01((value + 1.0).log10() / ceiling)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_fixtures::CandidateBuilder;

    #[test]
    fn test_empty_candidate_scores_zero() {
        let candidate = CandidateBuilder::new(1).build();
        assert_eq!(quality_score(&candidate), 0.0);
    }

    #[test]
    fn test_saturated_candidate_scores_one() {
        let candidate = CandidateBuilder::new(1)
            .score(98.0)
            .popularity(1_000_000)
            .favourites(100_000)
            .trending(200_000)
            .build();
        assert!((quality_score(&candidate) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_only_contribution() {
        // (72.5 - 50) / 45 = 0.5
        let candidate = CandidateBuilder::new(1).score(72.5).build();
        assert!((quality_score(&candidate) - 0.26).abs() < 1e-9);
    }

    #[test]
    fn test_more_popular_scores_higher() {
        let niche = CandidateBuilder::new(1).score(80.0).popularity(1_000).build();
        let popular = CandidateBuilder::new(2).score(80.0).popularity(100_000).build();
        assert!(quality_score(&popular) > quality_score(&niche));
    }

    #[test]
    fn test_low_score_clamps_at_zero() {
        let candidate = CandidateBuilder::new(1).score(20.0).build();
        assert_eq!(quality_score(&candidate), 0.0);
    }
}
