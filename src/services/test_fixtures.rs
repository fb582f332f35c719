use crate::models::{Candidate, CandidateTitle, MediaFormat, RankedTag};

/// Builder for catalog items used across service tests
pub(crate) struct CandidateBuilder {
    candidate: Candidate,
}

impl CandidateBuilder {
    pub(crate) fn new(id: u64) -> Self {
        Self {
            candidate: Candidate {
                id,
                ..Default::default()
            },
        }
    }

    pub(crate) fn title(mut self, english: &str) -> Self {
        self.candidate.title = CandidateTitle {
            english: Some(english.to_string()),
            ..Default::default()
        };
        self
    }

    pub(crate) fn romaji(mut self, romaji: &str) -> Self {
        self.candidate.title.romaji = Some(romaji.to_string());
        self
    }

    pub(crate) fn genres(mut self, genres: &[&str]) -> Self {
        self.candidate.genres = genres.iter().map(|g| g.to_string()).collect();
        self
    }

    pub(crate) fn tags(mut self, tags: &[(&str, u8)]) -> Self {
        self.candidate.tags = tags
            .iter()
            .map(|(name, rank)| RankedTag::new(*name, *rank))
            .collect();
        self
    }

    pub(crate) fn studios(mut self, studios: &[&str]) -> Self {
        self.candidate.studios = studios.iter().map(|s| s.to_string()).collect();
        self
    }

    pub(crate) fn synonyms(mut self, synonyms: &[&str]) -> Self {
        self.candidate.synonyms = synonyms.iter().map(|s| s.to_string()).collect();
        self
    }

    pub(crate) fn description(mut self, description: &str) -> Self {
        self.candidate.description = Some(description.to_string());
        self
    }

    pub(crate) fn year(mut self, year: i32) -> Self {
        self.candidate.season_year = Some(year);
        self
    }

    pub(crate) fn format(mut self, format: MediaFormat) -> Self {
        self.candidate.format = Some(format);
        self
    }

    pub(crate) fn score(mut self, score: f64) -> Self {
        self.candidate.average_score = Some(score);
        self
    }

    pub(crate) fn popularity(mut self, popularity: u64) -> Self {
        self.candidate.popularity = Some(popularity);
        self
    }

    pub(crate) fn favourites(mut self, favourites: u64) -> Self {
        self.candidate.favourites = Some(favourites);
        self
    }

    pub(crate) fn trending(mut self, trending: u64) -> Self {
        self.candidate.trending = Some(trending);
        self
    }

    pub(crate) fn build(self) -> Candidate {
        self.candidate
    }
}
