use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::models::Candidate;

const MIN_KEY_CHARS: usize = 3;
const SYNONYM_LIMIT: usize = 3;

static NUMBERED_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b((season|part|pt\.?|cour|chapter|episode|ep)\s*[-.:]?\s*(\d+|[ivx]+)|s\d+)\b")
        .expect("Failed to compile numbered marker regex")
});
static ORDINAL_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d+|[ivx]+)\s*(st|nd|rd|th)?\s*(season|part|cour|chapter)\b")
        .expect("Failed to compile ordinal marker regex")
});
static NAMED_SEASON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(2nd|3rd|4th|5th|6th|final)\s*season\b")
        .expect("Failed to compile named season regex")
});
static RELEASE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(final season|the movie|movie|ova|ona|special)\b")
        .expect("Failed to compile release marker regex")
});
// Only a trailing numeral counts, "Spy x Family" keeps its x
static TRAILING_ROMAN_NUMERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(ii|iii|iv|v|vi|vii|viii|ix|x)\s*$").expect("Failed to compile numeral regex")
});
static SUBTITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*?)\s*[:：\-|]\s*(.+)$").expect("Failed to compile subtitle regex")
});
static SEQUEL_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(season|part|pt|cour|chapter|arc|hen|movie|special|final|ova|ona|episode|ep|tv)\b")
        .expect("Failed to compile sequel keyword regex")
});
static TRAILING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+\d{1,2}\s*$").expect("Failed to compile trailing number regex"));
static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("Failed to compile separator regex"));

/// Series whose titles share no common prefix across languages and spin-offs,
/// matched against normalized keys
static FRANCHISE_ALIASES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (
            r"re zero|rezero|kara hajimeru isekai seikatsu|リゼロ|리제로|제로부터 시작하는 이세계 생활",
            "re zero",
        ),
        (
            r"boku no kokoro no yabai yatsu|bokuyaba|the dangers in my heart|내 마음의 위험한 녀석",
            "the dangers in my heart",
        ),
        (r"shingeki no kyojin|attack on titan|진격의 거인", "attack on titan"),
        (r"kimetsu no yaiba|鬼滅の刃|demon slayer|귀멸의 칼날", "demon slayer"),
        (
            r"my hero academia|boku no hero academia|bokunoheroacademia|僕のヒーローアカデミア|나의 히어로 아카데미아",
            "my hero academia",
        ),
    ]
    .into_iter()
    .map(|(pattern, canonical)| {
        let regex = Regex::new(&format!("(?i){}", pattern)).expect("Failed to compile franchise alias regex");
        (regex, canonical)
    })
    .collect()
});

/// Removes season, part, movie and numeral markers from a title
fn strip_sequel_markers(title: &str) -> String {
    let mut next = NUMBERED_MARKER.replace_all(title, " ").into_owned();
    for pattern in [&*ORDINAL_MARKER, &*NAMED_SEASON, &*RELEASE_MARKER] {
        next = pattern.replace_all(&next, " ").into_owned();
    }

    // "Title: Entertainment District Arc" loses the subtitle, "Re:Zero" keeps it
    if let Some(captures) = SUBTITLE.captures(&next) {
        if SEQUEL_KEYWORD.is_match(&captures[2]) {
            next = captures[1].to_string();
        }
    }

    let next = TRAILING_ROMAN_NUMERAL.replace(&next, " ");
    TRAILING_NUMBER.replace(&next, " ").into_owned()
}

/// Lower-cases and collapses every non-alphanumeric run into one space
fn normalize_title(title: &str) -> String {
    NON_ALPHANUMERIC
        .replace_all(&title.to_lowercase(), " ")
        .trim()
        .to_string()
}

fn series_key(title: &str) -> String {
    normalize_title(&strip_sequel_markers(title))
}

/// Maps a normalized key onto its franchise alias, if any
fn canonicalize_key(key: String) -> String {
    FRANCHISE_ALIASES
        .iter()
        .find(|(pattern, _)| pattern.is_match(&key))
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(key)
}

/// Grouping key collapsing sequels and related entries of one series
///
/// Picks the shortest normalized series title among the title variants and
/// the first three synonyms, after alias canonicalization; falls back to the id.
pub fn franchise_key(candidate: &Candidate) -> String {
    let titles = [
        candidate.title.english.as_deref(),
        candidate.title.romaji.as_deref(),
        candidate.title.native.as_deref(),
    ];
    let mut keys: Vec<String> = Vec::new();
    for title in titles
        .into_iter()
        .flatten()
        .chain(candidate.synonyms.iter().take(SYNONYM_LIMIT).map(String::as_str))
    {
        let key = canonicalize_key(series_key(title));
        if key.chars().count() >= MIN_KEY_CHARS && !keys.contains(&key) {
            keys.push(key);
        }
    }

    keys.sort_by_key(|key| (key.split_whitespace().count(), key.chars().count()));
    keys.into_iter()
        .next()
        .unwrap_or_else(|| candidate.id.to_string())
}

/// One entry per franchise, keeping the most popular and best rated
///
/// Output order follows the first appearance of each key.
pub fn dedupe_by_franchise<F>(pool: Vec<Candidate>, key_of: F) -> Vec<Candidate>
where
    F: Fn(&Candidate) -> String,
{
    let mut slot_by_key: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<Candidate> = Vec::new();

    for candidate in pool {
        let key = key_of(&candidate);
        match slot_by_key.get(&key) {
            Some(&slot) => {
                if dedupe_strength(&candidate) > dedupe_strength(&kept[slot]) {
                    kept[slot] = candidate;
                }
            }
            None => {
                slot_by_key.insert(key, kept.len());
                kept.push(candidate);
            }
        }
    }

    kept
}

fn dedupe_strength(candidate: &Candidate) -> f64 {
    candidate.popularity.unwrap_or(0) as f64 + candidate.mean_score.unwrap_or(0.0) * 100.0
}
