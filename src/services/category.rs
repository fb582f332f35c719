use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{self, Display};

use crate::models::{normalize_tag_name, Candidate};

static ACTION_TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(battle|fight|war|military|martial|super power|mecha|assassin|weapon|revenge|survival|monster)")
        .expect("Failed to compile action vocabulary")
});
static ROMANCE_TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(romance|love|relationship|dating|kiss|marriage|newlyweds|romantic|romcom|shoujo|josei|love triangle)")
        .expect("Failed to compile romance vocabulary")
});
static HEALING_TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(iyashikei|healing|wholesome|daily life|slow life|friendship|family life|cute girls doing cute things|food|cooking|gourmet|slice of life)")
        .expect("Failed to compile healing vocabulary")
});
static STRONG_HEALING_TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(iyashikei|healing|wholesome|slow life)").expect("Failed to compile healing vocabulary")
});
static PSYCHOLOGICAL_TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(mind game|psychological|manipulation|suspense|mystery|detective|crime|strategy|trauma|existential|philosophy|thriller|gambling)")
        .expect("Failed to compile psychological vocabulary")
});
static INTENSE_TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(gore|slasher|death game|revenge|assassin|war|military|battle royale|survival)")
        .expect("Failed to compile intense vocabulary")
});
static SPECIAL_THEME_TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(idol|music|band|singer|concert|showbiz|cooking|food|gourmet|restaurant|cafe|chef|workplace|office|job|profession|career|teacher|doctor|nurse|bartender|maid|sports|basketball|baseball|soccer|volleyball|swimming|athlete)")
        .expect("Failed to compile theme vocabulary")
});

const ROMANCE_MIN_STRENGTH_UNDER_ACTION: u32 = 4;
const SPECIAL_ACTION_STRENGTH_LIMIT: f64 = 3.4;

/// Standard discovery thresholds handed to the catalog client
pub const DISCOVERY_POOL_MIN: usize = 250;
pub const DISCOVERY_POOL_MAX: usize = 400;
pub const DISCOVERY_MIN_AVERAGE_SCORE: u32 = 65;
pub const DISCOVERY_MIN_POPULARITY: u64 = 5000;
/// Used when the standard thresholds cannot fill the pool
pub const DISCOVERY_RELAXED_MIN_AVERAGE_SCORE: u32 = 58;
pub const DISCOVERY_RELAXED_MIN_POPULARITY: u64 = 1200;

/// Taste categories with dedicated alignment rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Action,
    Romance,
    Healing,
    Psychological,
    Special,
}

impl Category {
    /// `None` for identifiers without dedicated rules
    pub fn parse(category_id: &str) -> Option<Self> {
        match category_id {
            "action" => Some(Category::Action),
            "romance" => Some(Category::Romance),
            "healing" => Some(Category::Healing),
            "psychological" => Some(Category::Psychological),
            "special" => Some(Category::Special),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Action => "action",
            Category::Romance => "romance",
            Category::Healing => "healing",
            Category::Psychological => "psychological",
            Category::Special => "special",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower-cased genres and normalized tag names of one candidate
struct Signals {
    genres: HashSet<String>,
    tags: Vec<String>,
}

impl Signals {
    fn of(candidate: &Candidate) -> Self {
        Self {
            genres: candidate.genre_keys().into_iter().collect(),
            tags: candidate
                .tags
                .iter()
                .map(|tag| normalize_tag_name(&tag.name))
                .filter(|name| !name.is_empty())
                .collect(),
        }
    }

    fn genre(&self, name: &str) -> bool {
        self.genres.contains(name)
    }

    fn any_genre(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.genre(name))
    }

    fn tag(&self, vocabulary: &Regex) -> bool {
        self.tags.iter().any(|tag| vocabulary.is_match(tag))
    }

    fn tag_hits(&self, vocabulary: &Regex) -> usize {
        self.tags.iter().filter(|tag| vocabulary.is_match(tag)).count()
    }
}

/// Whether a candidate belongs to the requested taste category
///
/// Unknown identifiers pass every candidate.
pub fn is_category_aligned(category_id: &str, candidate: &Candidate) -> bool {
    let Some(category) = Category::parse(category_id) else {
        return true;
    };
    let signals = Signals::of(candidate);

    match category {
        Category::Action => signals.any_genre(&["action", "adventure"]) || signals.tag(&ACTION_TAGS),
        Category::Romance => is_romance_aligned(&signals),
        Category::Healing => is_healing_aligned(&signals),
        Category::Psychological => is_psychological_aligned(&signals),
        Category::Special => is_special_aligned(&signals),
    }
}

fn is_romance_aligned(signals: &Signals) -> bool {
    let romance_genre = signals.genre("romance");
    let romance_tag = signals.tag(&ROMANCE_TAGS);
    if !romance_genre && !romance_tag {
        return false;
    }
    let action_heavy =
        signals.any_genre(&["action", "adventure", "mecha"]) || signals.tag(&ACTION_TAGS);
    let strength = u32::from(romance_genre) * 2
        + u32::from(romance_tag) * 2
        + u32::from(signals.genre("comedy"))
        + u32::from(signals.genre("drama"));
    !(action_heavy && strength < ROMANCE_MIN_STRENGTH_UNDER_ACTION)
}

fn is_healing_aligned(signals: &Signals) -> bool {
    let slice_of_life = signals.genre("slice of life");
    if !slice_of_life && !signals.tag(&HEALING_TAGS) {
        return false;
    }
    let intense = signals.any_genre(&["action", "adventure", "horror", "thriller"])
        || signals.tag(&ACTION_TAGS)
        || signals.tag(&INTENSE_TAGS);
    let strong_healing = slice_of_life || signals.tag(&STRONG_HEALING_TAGS);
    !(intense && !strong_healing)
}

fn is_psychological_aligned(signals: &Signals) -> bool {
    let psychological_tag = signals.tag(&PSYCHOLOGICAL_TAGS);
    let core = signals.any_genre(&["psychological", "mystery", "thriller"]) || psychological_tag;
    if !core {
        return false;
    }
    let pure_action_fantasy = signals.any_genre(&["action", "adventure", "fantasy"])
        && !signals.any_genre(&["psychological", "mystery"])
        && !psychological_tag;
    !pure_action_fantasy
}

fn is_special_aligned(signals: &Signals) -> bool {
    let theme_genre = signals.any_genre(&["music", "sports"]);
    let theme_strength = signals.tag_hits(&SPECIAL_THEME_TAGS) as f64 * 2.0
        + if theme_genre { 2.0 } else { 0.0 };
    let action_genre_hits = ["action", "adventure", "fantasy"]
        .iter()
        .filter(|genre| signals.genre(genre))
        .count() as f64;
    let action_strength = action_genre_hits + signals.tag_hits(&ACTION_TAGS) as f64 * 1.6;

    if theme_strength <= 0.0 {
        return false;
    }
    !(action_strength >= SPECIAL_ACTION_STRENGTH_LIMIT && theme_strength < action_strength)
}

/// Keeps the candidates aligned with the category, preserving order
pub fn filter_by_category(category_id: &str, pool: Vec<Candidate>) -> Vec<Candidate> {
    pool.into_iter()
        .filter(|candidate| is_category_aligned(category_id, candidate))
        .collect()
}

/// A genre/tag query the discovery client runs to fill a category pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverPreset {
    pub id: String,
    pub genre_in: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag_in: Vec<String>,
}

impl DiscoverPreset {
    fn new(id: &str, genres: [&str; 2], tags: [&str; 2]) -> Self {
        Self {
            id: id.to_string(),
            genre_in: genres.iter().map(|g| g.to_string()).collect(),
            tag_in: tags.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Catalog filter thresholds for one discovery pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryThresholds {
    pub min_average_score: u32,
    pub min_popularity: u64,
}

/// Everything the discovery client needs to build a pool for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryPlan {
    pub category_id: String,
    pub presets: Vec<DiscoverPreset>,
    pub standard: DiscoveryThresholds,
    pub relaxed: DiscoveryThresholds,
    pub pool_min: usize,
    pub pool_max: usize,
}

impl DiscoveryPlan {
    pub fn for_category(category_id: &str, fallback_genres: &[String]) -> Self {
        Self {
            category_id: category_id.to_string(),
            presets: discovery_presets(category_id, fallback_genres),
            standard: DiscoveryThresholds {
                min_average_score: DISCOVERY_MIN_AVERAGE_SCORE,
                min_popularity: DISCOVERY_MIN_POPULARITY,
            },
            relaxed: DiscoveryThresholds {
                min_average_score: DISCOVERY_RELAXED_MIN_AVERAGE_SCORE,
                min_popularity: DISCOVERY_RELAXED_MIN_POPULARITY,
            },
            pool_min: DISCOVERY_POOL_MIN,
            pool_max: DISCOVERY_POOL_MAX,
        }
    }
}

/// Six genre/tag presets per known category, or one `<id>_base` preset
/// built from the fallback genres
pub fn discovery_presets(category_id: &str, fallback_genres: &[String]) -> Vec<DiscoverPreset> {
    let Some(category) = Category::parse(category_id) else {
        return vec![DiscoverPreset {
            id: format!("{category_id}_base"),
            genre_in: fallback_genres.to_vec(),
            tag_in: Vec::new(),
        }];
    };

    let p = DiscoverPreset::new;
    match category {
        Category::Action => vec![
            p("action_core", ["Action", "Adventure"], ["Martial Arts", "Swordplay"]),
            p("action_military", ["Action", "Adventure"], ["Military", "War"]),
            p("action_superpower", ["Action", "Adventure"], ["Super Power", "Shounen"]),
            p("action_mecha", ["Action", "Sci-Fi"], ["Mecha", "Space"]),
            p("action_survival", ["Action", "Thriller"], ["Survival", "Revenge"]),
            p("action_sports", ["Action", "Sports"], ["Competition", "Athletics"]),
        ],
        Category::Romance => vec![
            p("romance_school", ["Romance", "Drama"], ["School", "Coming of Age"]),
            p("romance_romcom", ["Romance", "Comedy"], ["Romantic Comedy", "Love Triangle"]),
            p("romance_adult", ["Romance", "Drama"], ["Adult Cast", "Work"]),
            p("romance_shoujo", ["Romance", "Drama"], ["Shoujo", "Josei"]),
            p("romance_fantasy", ["Romance", "Fantasy"], ["Fantasy", "Isekai"]),
            p("romance_music", ["Romance", "Music"], ["Band", "Music"]),
        ],
        Category::Healing => vec![
            p("healing_daily", ["Slice of Life", "Comedy"], ["Iyashikei", "Wholesome"]),
            p("healing_school", ["Slice of Life", "Comedy"], ["School Club", "Friendship"]),
            p("healing_food", ["Slice of Life", "Comedy"], ["Food", "Cooking"]),
            p("healing_family", ["Slice of Life", "Drama"], ["Family Life", "Childcare"]),
            p("healing_work", ["Slice of Life", "Comedy"], ["Work", "Cafe"]),
            p("healing_music", ["Slice of Life", "Music"], ["Band", "Music"]),
        ],
        Category::Psychological => vec![
            p("psy_mindgame", ["Psychological", "Thriller"], ["Mind Game", "Strategy"]),
            p("psy_mystery", ["Psychological", "Mystery"], ["Detective", "Crime"]),
            p("psy_dark", ["Psychological", "Drama"], ["Trauma", "Depression"]),
            p("psy_philosophy", ["Psychological", "Drama"], ["Philosophy", "Existential"]),
            p("psy_gambling", ["Psychological", "Thriller"], ["Gambling", "Game"]),
            p("psy_scifi", ["Psychological", "Sci-Fi"], ["Time Manipulation", "Conspiracy"]),
        ],
        Category::Special => vec![
            p("special_music", ["Music", "Slice of Life"], ["Band", "Concert"]),
            p("special_idol", ["Music", "Drama"], ["Idol", "Showbiz"]),
            p("special_sports", ["Sports", "Drama"], ["Competition", "Team Sports"]),
            p("special_cooking", ["Slice of Life", "Comedy"], ["Food", "Cooking"]),
            p("special_work", ["Slice of Life", "Drama"], ["Work", "Profession"]),
            p("special_hobby", ["Slice of Life", "Comedy"], ["Hobbies", "Club"]),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_fixtures::CandidateBuilder;

    #[test]
    fn test_unknown_category_passes_everything() {
        let candidate = CandidateBuilder::new(1).build();
        assert!(is_category_aligned("horror", &candidate));
        assert!(is_category_aligned("", &candidate));
    }

    #[test]
    fn test_action_by_genre_or_tag() {
        let by_genre = CandidateBuilder::new(1).genres(&["Adventure"]).build();
        let by_tag = CandidateBuilder::new(2).tags(&[("Super Power", 70)]).build();
        let neither = CandidateBuilder::new(3).genres(&["Romance"]).tags(&[("School", 70)]).build();

        assert!(is_category_aligned("action", &by_genre));
        assert!(is_category_aligned("action", &by_tag));
        assert!(!is_category_aligned("action", &neither));
    }

    #[test]
    fn test_romance_rejects_weak_romance_in_action() {
        let weak = CandidateBuilder::new(1)
            .genres(&["Action", "Romance"])
            .tags(&[("Military", 80)])
            .build();
        assert!(!is_category_aligned("romance", &weak));
    }

    #[test]
    fn test_romance_strength_tie_is_included() {
        // genre 2 + tag 2 = 4, not below the threshold
        let strong = CandidateBuilder::new(1)
            .genres(&["Action", "Romance"])
            .tags(&[("Love Triangle", 80)])
            .build();
        assert!(is_category_aligned("romance", &strong));
    }

    #[test]
    fn test_romance_without_action_needs_core_signal() {
        let pure = CandidateBuilder::new(1).genres(&["Comedy"]).tags(&[("Dating", 60)]).build();
        let none = CandidateBuilder::new(2).genres(&["Comedy", "Drama"]).build();
        assert!(is_category_aligned("romance", &pure));
        assert!(!is_category_aligned("romance", &none));
    }

    #[test]
    fn test_healing_rejects_intense_without_strong_signal() {
        let intense = CandidateBuilder::new(1)
            .genres(&["Drama"])
            .tags(&[("Friendship", 80), ("Survival", 70)])
            .build();
        let softened = CandidateBuilder::new(2)
            .genres(&["Drama"])
            .tags(&[("Iyashikei", 80), ("Survival", 70)])
            .build();
        let slice_of_life = CandidateBuilder::new(3)
            .genres(&["Slice of Life", "Action"])
            .build();

        assert!(!is_category_aligned("healing", &intense));
        assert!(is_category_aligned("healing", &softened));
        assert!(is_category_aligned("healing", &slice_of_life));
    }

    #[test]
    fn test_psychological_rejects_pure_action_fantasy() {
        let thriller_action = CandidateBuilder::new(1).genres(&["Thriller", "Action"]).build();
        let mind_game = CandidateBuilder::new(2)
            .genres(&["Thriller", "Action"])
            .tags(&[("Mind Game", 70)])
            .build();
        let mystery = CandidateBuilder::new(3).genres(&["Mystery", "Fantasy"]).build();

        assert!(!is_category_aligned("psychological", &thriller_action));
        assert!(is_category_aligned("psychological", &mind_game));
        assert!(is_category_aligned("psychological", &mystery));
    }

    #[test]
    fn test_special_needs_theme_signal() {
        let idol = CandidateBuilder::new(1).genres(&["Drama"]).tags(&[("Idol", 80)]).build();
        let plain = CandidateBuilder::new(2).genres(&["Drama"]).build();
        assert!(is_category_aligned("special", &idol));
        assert!(!is_category_aligned("special", &plain));
    }

    #[test]
    fn test_special_rejects_action_dominated_theme() {
        // theme 2, action 2 + 1.6 = 3.6
        let action_sports = CandidateBuilder::new(1)
            .genres(&["Action", "Fantasy", "Sports"])
            .tags(&[("Battle", 70)])
            .build();
        // theme 4, action 3.6
        let sports_first = CandidateBuilder::new(2)
            .genres(&["Action", "Fantasy", "Sports"])
            .tags(&[("Battle", 70), ("Baseball", 80)])
            .build();

        assert!(!is_category_aligned("special", &action_sports));
        assert!(is_category_aligned("special", &sports_first));
    }

    #[test]
    fn test_filter_by_category_preserves_order() {
        let pool = vec![
            CandidateBuilder::new(1).genres(&["Action"]).build(),
            CandidateBuilder::new(2).genres(&["Romance"]).build(),
            CandidateBuilder::new(3).tags(&[("Mecha", 90)]).build(),
        ];
        let ids: Vec<u64> = filter_by_category("action", pool).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_presets_for_known_and_unknown_categories() {
        let action = discovery_presets("action", &[]);
        assert_eq!(action.len(), 6);
        assert_eq!(action[3].id, "action_mecha");
        assert_eq!(action[3].tag_in, vec!["Mecha", "Space"]);

        let fallback = discovery_presets("horror", &["Horror".to_string()]);
        assert_eq!(fallback.len(), 1);
        assert_eq!(fallback[0].id, "horror_base");
        assert_eq!(fallback[0].genre_in, vec!["Horror"]);
        assert!(fallback[0].tag_in.is_empty());
    }

    #[test]
    fn test_discovery_plan_thresholds() {
        let plan = DiscoveryPlan::for_category("psychological", &[]);
        assert_eq!(plan.presets.len(), 6);
        assert!(plan.presets.iter().all(|p| p.id.starts_with("psy_")));
        assert_eq!(plan.standard.min_average_score, 65);
        assert_eq!(plan.relaxed.min_popularity, 1200);
        assert!(plan.pool_min < plan.pool_max);
    }
}
