use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;

/// Display names of a catalog item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateTitle {
    #[serde(default)]
    pub romaji: Option<String>,
    #[serde(default)]
    pub english: Option<String>,
    #[serde(default)]
    pub native: Option<String>,
}

/// A tag attached to a catalog item
///
/// `rank` is relevance strength (0-100), not rarity. A missing or null name
/// reads as empty and is skipped wherever tags are used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTag {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(default)]
    pub rank: Option<u8>,
}

impl RankedTag {
    pub fn new(name: impl Into<String>, rank: u8) -> Self {
        Self {
            name: name.into(),
            rank: Some(rank),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Release format as reported by the media catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaFormat {
    Tv,
    TvShort,
    Movie,
    Special,
    Ova,
    Ona,
    Music,
    #[serde(other)]
    Other,
}

impl Display for MediaFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            MediaFormat::Tv => "TV",
            MediaFormat::TvShort => "TV_SHORT",
            MediaFormat::Movie => "MOVIE",
            MediaFormat::Special => "SPECIAL",
            MediaFormat::Ova => "OVA",
            MediaFormat::Ona => "ONA",
            MediaFormat::Music => "MUSIC",
            MediaFormat::Other => "OTHER",
        };
        write!(f, "{}", label)
    }
}

/// Release-era bucket used by quotas and novelty scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YearBucket {
    Modern,
    Mid,
    Classic,
}

impl YearBucket {
    pub const ALL: [YearBucket; 3] = [YearBucket::Modern, YearBucket::Mid, YearBucket::Classic];

    /// Unknown years land in the middle bucket
    pub fn from_year(season_year: Option<i32>) -> Self {
        match season_year {
            None | Some(0) => YearBucket::Mid,
            Some(year) if year < 2000 => YearBucket::Classic,
            Some(year) if year < 2010 => YearBucket::Mid,
            Some(_) => YearBucket::Modern,
        }
    }
}

/// Format bucket used by browse-list quotas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatBucket {
    Tv,
    Other,
}

impl FormatBucket {
    pub const ALL: [FormatBucket; 2] = [FormatBucket::Tv, FormatBucket::Other];

    pub fn from_format(format: Option<MediaFormat>) -> Self {
        match format {
            Some(MediaFormat::Tv) => FormatBucket::Tv,
            _ => FormatBucket::Other,
        }
    }
}

/// A catalog media item considered for recommendation
///
/// Absent fields mean "unknown", never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: u64,
    #[serde(default)]
    pub id_mal: Option<u64>,
    #[serde(default)]
    pub title: CandidateTitle,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub tags: Vec<RankedTag>,
    #[serde(default)]
    pub format: Option<MediaFormat>,
    #[serde(default)]
    pub season_year: Option<i32>,
    #[serde(default)]
    pub average_score: Option<f64>,
    #[serde(default)]
    pub mean_score: Option<f64>,
    #[serde(default)]
    pub popularity: Option<u64>,
    #[serde(default)]
    pub favourites: Option<u64>,
    #[serde(default)]
    pub trending: Option<u64>,
    #[serde(default)]
    pub studios: Vec<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Candidate {
    /// English, then romaji, then native title, falling back to `#id`
    pub fn display_title(&self) -> String {
        self.title
            .english
            .as_deref()
            .or(self.title.romaji.as_deref())
            .or(self.title.native.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", self.id))
    }

    /// Average score, then mean score, then zero
    pub fn score_value(&self) -> f64 {
        self.average_score.or(self.mean_score).unwrap_or(0.0)
    }

    /// Tags ordered by rank, strongest first
    ///
    /// The sort is stable so equally ranked tags keep catalog order.
    pub fn sorted_tags(&self) -> Vec<&RankedTag> {
        let mut tags: Vec<&RankedTag> = self.tags.iter().collect();
        tags.sort_by(|a, b| b.rank.unwrap_or(0).cmp(&a.rank.unwrap_or(0)));
        tags
    }

    /// Normalized names of the strongest tags, skipping blank names
    pub fn top_tag_keys(&self, limit: usize) -> Vec<String> {
        self.sorted_tags()
            .into_iter()
            .map(|tag| normalize_tag_name(&tag.name))
            .filter(|name| !name.is_empty())
            .take(limit)
            .collect()
    }

    /// Lower-cased genre labels
    pub fn genre_keys(&self) -> Vec<String> {
        self.genres.iter().map(|genre| genre.to_lowercase()).collect()
    }

    pub fn year_bucket(&self) -> YearBucket {
        YearBucket::from_year(self.season_year)
    }

    pub fn format_bucket(&self) -> FormatBucket {
        FormatBucket::from_format(self.format)
    }
}

/// Trims and lower-cases a tag or studio name
pub fn normalize_tag_name(name: &str) -> String {
    name.trim().to_lowercase()
}

pub(crate) fn clamp01(value: f64) -> f64 {
    clamp(value, 0.0, 1.0)
}

pub(crate) fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_bucket_boundaries() {
        assert_eq!(YearBucket::from_year(Some(1999)), YearBucket::Classic);
        assert_eq!(YearBucket::from_year(Some(2000)), YearBucket::Mid);
        assert_eq!(YearBucket::from_year(Some(2009)), YearBucket::Mid);
        assert_eq!(YearBucket::from_year(Some(2010)), YearBucket::Modern);
        assert_eq!(YearBucket::from_year(None), YearBucket::Mid);
    }

    #[test]
    fn test_format_bucket() {
        assert_eq!(FormatBucket::from_format(Some(MediaFormat::Tv)), FormatBucket::Tv);
        assert_eq!(FormatBucket::from_format(Some(MediaFormat::TvShort)), FormatBucket::Other);
        assert_eq!(FormatBucket::from_format(None), FormatBucket::Other);
    }

    #[test]
    fn test_display_title_fallbacks() {
        let mut candidate = Candidate {
            id: 42,
            ..Default::default()
        };
        assert_eq!(candidate.display_title(), "#42");

        candidate.title.native = Some("ネイティブ".to_string());
        assert_eq!(candidate.display_title(), "ネイティブ");

        candidate.title.english = Some("English".to_string());
        assert_eq!(candidate.display_title(), "English");
    }

    #[test]
    fn test_score_value_prefers_average() {
        let candidate = Candidate {
            id: 1,
            average_score: Some(81.0),
            mean_score: Some(70.0),
            ..Default::default()
        };
        assert_eq!(candidate.score_value(), 81.0);

        let mean_only = Candidate {
            id: 2,
            mean_score: Some(70.0),
            ..Default::default()
        };
        assert_eq!(mean_only.score_value(), 70.0);
    }

    #[test]
    fn test_sorted_tags_is_stable() {
        let candidate = Candidate {
            id: 1,
            tags: vec![
                RankedTag::new("b", 50),
                RankedTag::new("a", 90),
                RankedTag::new("c", 50),
            ],
            ..Default::default()
        };
        let names: Vec<&str> = candidate.sorted_tags().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_deserialize_catalog_payload() {
        let json = r#"{
            "id": 21,
            "title": { "romaji": "One Piece", "english": "ONE PIECE" },
            "genres": ["Action", "Adventure"],
            "tags": [{ "name": "Pirates", "rank": 94 }, { "name": "Ensemble Cast" }],
            "format": "TV",
            "seasonYear": 1999,
            "averageScore": 88,
            "popularity": 500000,
            "studios": ["Toei Animation"]
        }"#;

        let candidate: Candidate = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.id, 21);
        assert_eq!(candidate.format, Some(MediaFormat::Tv));
        assert_eq!(candidate.season_year, Some(1999));
        assert_eq!(candidate.tags[1].rank, None);
        assert_eq!(candidate.favourites, None);
        assert_eq!(candidate.year_bucket(), YearBucket::Classic);
    }

    #[test]
    fn test_nameless_tags_deserialize_as_blank() {
        let json = r#"{"id": 1, "tags": [{ "rank": 80 }, { "name": null }, { "name": "Mecha", "rank": 60 }]}"#;
        let candidate: Candidate = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.tags.len(), 3);
        assert_eq!(candidate.tags[0].name, "");
        assert_eq!(candidate.tags[1].name, "");
        assert_eq!(candidate.top_tag_keys(5), vec!["mecha"]);
    }

    #[test]
    fn test_unknown_format_deserializes_as_other() {
        let candidate: Candidate = serde_json::from_str(r#"{"id": 1, "format": "MANGA"}"#).unwrap();
        assert_eq!(candidate.format, Some(MediaFormat::Other));
    }
}
