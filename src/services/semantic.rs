//! TF-IDF similarity between liked seeds and candidates.
//!
//! Every call builds a throwaway corpus from the supplied seeds and candidates;
//! nothing is cached between calls, so cost is bounded by the request size.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::models::{clamp, clamp01, Candidate, RankedTag};

type TermBag = HashMap<String, f64>;

const DESCRIPTION_MAX_CHARS: usize = 900;
const SYNONYM_LIMIT: usize = 4;
const TAG_LIMIT: usize = 20;
const PHRASE_BOOST: f64 = 1.15;
const DEFAULT_SEMANTIC_RANK: u8 = 70;

const ENGLISH_TITLE_WEIGHT: f64 = 3.2;
const ROMAJI_TITLE_WEIGHT: f64 = 2.8;
const NATIVE_TITLE_WEIGHT: f64 = 2.8;
const SYNONYM_WEIGHT: f64 = 1.2;
const GENRE_WEIGHT: f64 = 2.2;
const TAG_WEIGHT: f64 = 1.5;
const DESCRIPTION_TOKEN_WEIGHT: f64 = 1.0;

const CENTROID_WEIGHT: f64 = 0.62;
const BEST_SEED_WEIGHT: f64 = 0.38;

static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}\p{N}]{2,}").expect("Failed to compile token regex"));
static NON_WORD_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("Failed to compile separator regex"));
static LINE_BREAK_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("Failed to compile line break regex"));
static HTML_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]+>").expect("Failed to compile html tag regex"));

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "for", "with", "from", "that", "this", "into", "your", "you", "are", "was",
        "were", "have", "has", "had", "its", "their", "about", "after", "before", "while",
        "where", "when", "what", "which", "will", "would", "could", "should", "there", "here",
        "then", "than", "series", "anime",
    ]
    .into_iter()
    .collect()
});

/// Similarity in [0, 1] of every candidate to the seeds, keyed by candidate id
///
/// `0.62 * cosine(candidate, seed centroid) + 0.38 * max cosine(candidate, seed)`.
/// Candidates without extractable terms, or an empty seed list, score 0.
pub fn build_semantic_similarity_map(seeds: &[Candidate], candidates: &[Candidate]) -> HashMap<u64, f64> {
    let mut similarity_by_id: HashMap<u64, f64> =
        candidates.iter().map(|candidate| (candidate.id, 0.0)).collect();
    if seeds.is_empty() || candidates.is_empty() {
        return similarity_by_id;
    }

    let mut corpus: HashMap<u64, &Candidate> = HashMap::new();
    for item in seeds.iter().chain(candidates.iter()) {
        corpus.insert(item.id, item);
    }

    let mut bag_by_id: HashMap<u64, TermBag> = HashMap::with_capacity(corpus.len());
    let mut doc_freq: HashMap<String, u32> = HashMap::new();
    for (id, item) in &corpus {
        let bag = build_weighted_bag(item);
        for term in bag.keys() {
            *doc_freq.entry(term.clone()).or_insert(0) += 1;
        }
        bag_by_id.insert(*id, bag);
    }

    let doc_count = corpus.len().max(1) as f64;
    let idf: HashMap<String, f64> = doc_freq
        .into_iter()
        .map(|(term, df)| {
            let value = ((1.0 + doc_count) / (1.0 + f64::from(df))).ln() + 1.0;
            (term, value)
        })
        .collect();

    let vector_by_id: HashMap<u64, TermBag> = bag_by_id
        .into_iter()
        .map(|(id, bag)| (id, tf_idf_vector(&bag, &idf)))
        .collect();

    let seed_vectors: Vec<&TermBag> = seeds
        .iter()
        .filter_map(|seed| vector_by_id.get(&seed.id))
        .filter(|vector| !vector.is_empty())
        .collect();
    if seed_vectors.is_empty() {
        return similarity_by_id;
    }
    let centroid = mean_vector(&seed_vectors);

    for candidate in candidates {
        let Some(vector) = vector_by_id.get(&candidate.id).filter(|v| !v.is_empty()) else {
            continue;
        };
        let centroid_similarity = unit_cosine(vector, &centroid);
        let best_seed_similarity = seed_vectors
            .iter()
            .map(|seed_vector| unit_cosine(vector, seed_vector))
            .fold(0.0_f64, f64::max);
        similarity_by_id.insert(
            candidate.id,
            clamp01(centroid_similarity * CENTROID_WEIGHT + best_seed_similarity * BEST_SEED_WEIGHT),
        );
    }

    tracing::debug!(
        seeds = seeds.len(),
        candidates = candidates.len(),
        vocabulary = idf.len(),
        "Semantic similarity map built"
    );

    similarity_by_id
}

fn build_weighted_bag(item: &Candidate) -> TermBag {
    let mut bag = TermBag::new();

    add_phrase_and_tokens(&mut bag, item.title.english.as_deref(), ENGLISH_TITLE_WEIGHT);
    add_phrase_and_tokens(&mut bag, item.title.romaji.as_deref(), ROMAJI_TITLE_WEIGHT);
    add_phrase_and_tokens(&mut bag, item.title.native.as_deref(), NATIVE_TITLE_WEIGHT);

    for synonym in item.synonyms.iter().take(SYNONYM_LIMIT) {
        add_phrase_and_tokens(&mut bag, Some(synonym), SYNONYM_WEIGHT);
    }
    for genre in &item.genres {
        add_phrase_and_tokens(&mut bag, Some(genre), GENRE_WEIGHT);
    }
    for tag in item.tags.iter().take(TAG_LIMIT) {
        if tag.name.trim().is_empty() {
            continue;
        }
        add_phrase_and_tokens(&mut bag, Some(&tag.name), TAG_WEIGHT * tag_importance(tag));
    }

    if let Some(description) = item.description.as_deref() {
        let trimmed: String = description.chars().take(DESCRIPTION_MAX_CHARS).collect();
        for token in tokenize(&trimmed) {
            add_weight(&mut bag, token, DESCRIPTION_TOKEN_WEIGHT);
        }
    }

    bag
}

fn tag_importance(tag: &RankedTag) -> f64 {
    let rank = f64::from(tag.rank.unwrap_or(DEFAULT_SEMANTIC_RANK));
    clamp((130.0 - rank) / 100.0, 0.4, 1.8)
}

fn add_weight(bag: &mut TermBag, term: String, weight: f64) {
    if term.is_empty() || weight <= 0.0 {
        return;
    }
    *bag.entry(term).or_insert(0.0) += weight;
}

/// Adds the whole text as one underscored phrase plus its individual tokens
fn add_phrase_and_tokens(bag: &mut TermBag, text: Option<&str>, weight: f64) {
    let Some(text) = text else {
        return;
    };
    if let Some(phrase) = phrase_token(text) {
        add_weight(bag, phrase, weight * PHRASE_BOOST);
    }
    for token in tokenize(text) {
        add_weight(bag, token, weight);
    }
}

const HTML_ENTITIES: [(&str, &str); 6] = [
    ("&nbsp;", " "),
    ("&amp;", "&"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&lt;", "<"),
    ("&gt;", ">"),
];

/// Lowercases, decodes common entities and replaces markup with spaces
fn clean_text(value: &str) -> String {
    let mut decoded = value.to_lowercase();
    for (entity, replacement) in HTML_ENTITIES {
        if decoded.contains(entity) {
            decoded = decoded.replace(entity, replacement);
        }
    }
    let without_breaks = LINE_BREAK_TAG.replace_all(&decoded, " ");
    HTML_TAG.replace_all(&without_breaks, " ").into_owned()
}

fn tokenize(value: &str) -> Vec<String> {
    let cleaned = clean_text(value);
    TOKEN_PATTERN
        .find_iter(&cleaned)
        .map(|m| m.as_str())
        .filter(|token| !STOPWORDS.contains(token))
        .map(str::to_string)
        .collect()
}

fn phrase_token(value: &str) -> Option<String> {
    let cleaned = clean_text(value);
    let joined = NON_WORD_RUN.replace_all(&cleaned, "_");
    let phrase = joined.trim_matches('_');
    if phrase.chars().count() < 2 {
        return None;
    }
    Some(phrase.to_string())
}

fn tf_idf_vector(bag: &TermBag, idf: &HashMap<String, f64>) -> TermBag {
    let total_weight: f64 = bag.values().sum();
    if total_weight <= 0.0 {
        return TermBag::new();
    }
    let vector: TermBag = bag
        .iter()
        .map(|(term, weight)| {
            let tf = weight / total_weight;
            (term.clone(), tf * idf.get(term).copied().unwrap_or(1.0))
        })
        .collect();
    l2_normalized(vector)
}

fn l2_normalized(vector: TermBag) -> TermBag {
    let norm = vector.values().map(|v| v * v).sum::<f64>().sqrt();
    if norm == 0.0 {
        return TermBag::new();
    }
    vector.into_iter().map(|(term, value)| (term, value / norm)).collect()
}

fn mean_vector(vectors: &[&TermBag]) -> TermBag {
    if vectors.is_empty() {
        return TermBag::new();
    }
    let mut sum = TermBag::new();
    for vector in vectors {
        for (term, value) in vector.iter() {
            *sum.entry(term.clone()).or_insert(0.0) += value;
        }
    }
    let count = vectors.len() as f64;
    l2_normalized(sum.into_iter().map(|(term, value)| (term, value / count)).collect())
}

/// Dot product of two unit vectors, clamped to [0, 1]
fn unit_cosine(left: &TermBag, right: &TermBag) -> f64 {
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
        .map(|(term, value)| value * large.get(term).copied().unwrap_or(0.0))
        .sum();
    clamp01(dot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_fixtures::CandidateBuilder;

    #[test]
    fn test_tokenize_strips_html_and_stopwords() {
        let tokens = tokenize("The <i>Pilot</i> and his Mecha<br/>fight &amp; survive");
        assert_eq!(tokens, vec!["pilot", "his", "mecha", "fight", "survive"]);
    }

    #[test]
    fn test_tokenize_keeps_unicode_letters() {
        let tokens = tokenize("進撃の巨人 Attack");
        assert!(tokens.contains(&"attack".to_string()));
        assert!(tokens.iter().any(|t| t.contains('進')));
    }

    #[test]
    fn test_phrase_token() {
        assert_eq!(phrase_token("Slice of Life"), Some("slice_of_life".to_string()));
        assert_eq!(phrase_token("  Sci-Fi! "), Some("sci_fi".to_string()));
        assert_eq!(phrase_token("!"), None);
    }

    #[test]
    fn test_bag_contains_phrase_and_tokens() {
        let item = CandidateBuilder::new(1).genres(&["Slice of Life"]).build();
        let bag = build_weighted_bag(&item);
        assert!((bag["slice_of_life"] - GENRE_WEIGHT * PHRASE_BOOST).abs() < 1e-12);
        assert!((bag["slice"] - GENRE_WEIGHT).abs() < 1e-12);
        assert!(!bag.contains_key("of"));
    }

    #[test]
    fn test_empty_seeds_score_zero() {
        let candidates = vec![CandidateBuilder::new(1).genres(&["Action"]).build()];
        let map = build_semantic_similarity_map(&[], &candidates);
        assert_eq!(map.get(&1), Some(&0.0));
    }

    #[test]
    fn test_candidate_without_terms_scores_zero() {
        let seeds = vec![CandidateBuilder::new(1).title("Space Pilot").genres(&["Mecha"]).build()];
        let candidates = vec![CandidateBuilder::new(2).build()];
        let map = build_semantic_similarity_map(&seeds, &candidates);
        assert_eq!(map.get(&2), Some(&0.0));
    }

    #[test]
    fn test_related_candidate_scores_higher() {
        let seeds = vec![
            CandidateBuilder::new(1)
                .title("Steel Frontier")
                .genres(&["Action", "Mecha"])
                .tags(&[("Military", 80), ("Space", 60)])
                .description("Young pilots defend the colony fleet in giant robots.")
                .build(),
            CandidateBuilder::new(2)
                .title("Orbit Guard")
                .genres(&["Sci-Fi", "Mecha"])
                .tags(&[("Space", 85), ("Robots", 70)])
                .build(),
        ];
        let candidates = vec![
            CandidateBuilder::new(10)
                .title("Colony Pilots")
                .genres(&["Mecha", "Action"])
                .tags(&[("Space", 75), ("Military", 60)])
                .description("Pilots of giant robots protect a colony.")
                .build(),
            CandidateBuilder::new(11)
                .title("Cafe Days")
                .genres(&["Slice of Life", "Comedy"])
                .tags(&[("Food", 80), ("Cafe", 70)])
                .description("A gentle story about a small seaside cafe.")
                .build(),
        ];

        let map = build_semantic_similarity_map(&seeds, &candidates);
        let related = map[&10];
        let unrelated = map[&11];
        assert!(related > unrelated);
        assert!((0.0..=1.0).contains(&related));
        assert_eq!(unrelated, 0.0);
    }

    #[test]
    fn test_identical_candidate_scores_near_one() {
        let seed = CandidateBuilder::new(1)
            .title("Harbor Lights")
            .genres(&["Drama"])
            .tags(&[("Coming of Age", 70)])
            .build();
        let mut twin = seed.clone();
        twin.id = 2;

        let map = build_semantic_similarity_map(&[seed], &[twin]);
        assert!((map[&2] - 1.0).abs() < 1e-9);
    }
}
