use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Maximum number of remembered shown ids
pub const PROFILE_EXPOSURE_LIMIT: usize = 300;

/// Like/dislike feedback on a single candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackSignal {
    Like,
    Dislike,
}

/// Long-lived, decaying taste state of one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub liked_tags: HashMap<String, f64>,
    #[serde(default)]
    pub disliked_tags: HashMap<String, f64>,
    /// Previously shown candidate ids, most recent last, no duplicates
    #[serde(default)]
    pub exposure_history: Vec<u64>,
    pub updated_at: DateTime<Utc>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl UserProfile {
    /// Creates an empty profile
    pub fn new() -> Self {
        Self {
            liked_tags: HashMap::new(),
            disliked_tags: HashMap::new(),
            exposure_history: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.liked_tags.is_empty() && self.disliked_tags.is_empty() && self.exposure_history.is_empty()
    }

    /// Repairs a snapshot read from storage
    ///
    /// Drops non-finite weights, de-duplicates the exposure history keeping the
    /// latest occurrence, and keeps only the most recent entries.
    pub fn normalized(mut self) -> Self {
        self.liked_tags.retain(|tag, weight| !tag.is_empty() && weight.is_finite());
        self.disliked_tags.retain(|tag, weight| !tag.is_empty() && weight.is_finite());

        let mut seen = HashSet::new();
        let mut history: Vec<u64> = self
            .exposure_history
            .iter()
            .rev()
            .filter(|id| seen.insert(**id))
            .copied()
            .collect();
        history.reverse();
        if history.len() > PROFILE_EXPOSURE_LIMIT {
            let excess = history.len() - PROFILE_EXPOSURE_LIMIT;
            history.drain(..excess);
        }
        self.exposure_history = history;
        self
    }

    /// Applies a field-level patch; fields present in the patch win
    pub fn merge(&mut self, update: ProfileUpdate) {
        if let Some(liked) = update.liked_tags {
            self.liked_tags = liked;
        }
        if let Some(disliked) = update.disliked_tags {
            self.disliked_tags = disliked;
        }
        if let Some(history) = update.exposure_history {
            self.exposure_history = history;
        }
        self.updated_at = update.updated_at;
    }
}

/// Field-level write to a stored profile
///
/// Writers only send the fields they changed, so a feedback write and an
/// exposure write for the same user do not overwrite each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liked_tags: Option<HashMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disliked_tags: Option<HashMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exposure_history: Option<Vec<u64>>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileUpdate {
    /// Patch carrying both tag maps of `profile`
    pub fn tags_of(profile: &UserProfile) -> Self {
        Self {
            liked_tags: Some(profile.liked_tags.clone()),
            disliked_tags: Some(profile.disliked_tags.clone()),
            exposure_history: None,
            updated_at: profile.updated_at,
        }
    }

    /// Patch carrying only the exposure history of `profile`
    pub fn exposure_of(profile: &UserProfile) -> Self {
        Self {
            liked_tags: None,
            disliked_tags: None,
            exposure_history: Some(profile.exposure_history.clone()),
            updated_at: profile.updated_at,
        }
    }

    /// Patch replacing every field
    pub fn full(profile: &UserProfile) -> Self {
        Self {
            liked_tags: Some(profile.liked_tags.clone()),
            disliked_tags: Some(profile.disliked_tags.clone()),
            exposure_history: Some(profile.exposure_history.clone()),
            updated_at: profile.updated_at,
        }
    }
}

/// Profile contribution to a candidate's final score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileScore {
    pub bonus: f64,
    pub penalty: f64,
    pub exposure_penalty: f64,
    /// `bonus - penalty - exposure_penalty`
    pub total: f64,
    pub matched_liked_tags: Vec<String>,
    pub matched_disliked_tags: Vec<String>,
}

/// One step of a browsing session, as recorded by the session store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStep {
    pub step_index: u32,
    #[serde(default)]
    pub shown_ids: Vec<u64>,
    #[serde(default)]
    pub liked_ids: Vec<u64>,
    #[serde(default)]
    pub disliked_ids: Vec<u64>,
    pub timestamp: DateTime<Utc>,
}

impl SessionStep {
    /// De-duplicates each id list, keeping first occurrences
    pub fn normalized(self) -> Self {
        Self {
            step_index: self.step_index,
            shown_ids: dedupe_ids(self.shown_ids),
            liked_ids: dedupe_ids(self.liked_ids),
            disliked_ids: dedupe_ids(self.disliked_ids),
            timestamp: self.timestamp,
        }
    }
}

/// Stored session document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub category: String,
    pub steps: Vec<SessionStep>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(category: String) -> Self {
        let now = Utc::now();
        Self {
            category,
            steps: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Appends a step unless an identical one is already recorded
    pub fn append_step(&mut self, category: String, step: SessionStep) {
        let step = step.normalized();
        self.category = category;
        self.updated_at = Utc::now();
        if !self.steps.contains(&step) {
            self.steps.push(step);
        }
    }
}

fn dedupe_ids(ids: Vec<u64>) -> Vec<u64> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_profile_is_empty() {
        let profile = UserProfile::new();
        assert!(profile.is_empty());
    }

    #[test]
    fn test_normalized_dedupes_history_keeping_latest() {
        let profile = UserProfile {
            exposure_history: vec![1, 2, 1, 3],
            ..UserProfile::new()
        };
        assert_eq!(profile.normalized().exposure_history, vec![2, 1, 3]);
    }

    #[test]
    fn test_normalized_caps_history() {
        let profile = UserProfile {
            exposure_history: (0..400).collect(),
            ..UserProfile::new()
        };
        let history = profile.normalized().exposure_history;
        assert_eq!(history.len(), PROFILE_EXPOSURE_LIMIT);
        assert_eq!(history.first(), Some(&100));
        assert_eq!(history.last(), Some(&399));
    }

    #[test]
    fn test_normalized_drops_non_finite_weights() {
        let mut profile = UserProfile::new();
        profile.liked_tags.insert("mecha".to_string(), f64::NAN);
        profile.liked_tags.insert("space".to_string(), 1.0);
        let profile = profile.normalized();
        assert_eq!(profile.liked_tags.len(), 1);
        assert!(profile.liked_tags.contains_key("space"));
    }

    #[test]
    fn test_merge_keeps_fields_absent_from_update() {
        let mut stored = UserProfile::new();
        stored.liked_tags.insert("mecha".to_string(), 2.0);
        stored.exposure_history = vec![1, 2];

        let mut exposure_writer = stored.clone();
        exposure_writer.exposure_history = vec![1, 2, 3];
        stored.merge(ProfileUpdate::exposure_of(&exposure_writer));

        assert_eq!(stored.exposure_history, vec![1, 2, 3]);
        assert_eq!(stored.liked_tags.get("mecha"), Some(&2.0));
    }

    #[test]
    fn test_session_step_normalization() {
        let step = SessionStep {
            step_index: 1,
            shown_ids: vec![3, 1, 3, 2],
            liked_ids: vec![1, 1],
            disliked_ids: vec![],
            timestamp: Utc::now(),
        }
        .normalized();
        assert_eq!(step.shown_ids, vec![3, 1, 2]);
        assert_eq!(step.liked_ids, vec![1]);
    }

    #[test]
    fn test_session_record_ignores_duplicate_steps() {
        let step = SessionStep {
            step_index: 1,
            shown_ids: vec![1, 2],
            liked_ids: vec![],
            disliked_ids: vec![],
            timestamp: Utc::now(),
        };
        let mut record = SessionRecord::new("action".to_string());
        record.append_step("action".to_string(), step.clone());
        record.append_step("action".to_string(), step);
        assert_eq!(record.steps.len(), 1);
    }

    #[test]
    fn test_feedback_signal_serialization() {
        assert_eq!(serde_json::to_string(&FeedbackSignal::Like).unwrap(), "\"like\"");
        let parsed: FeedbackSignal = serde_json::from_str("\"dislike\"").unwrap();
        assert_eq!(parsed, FeedbackSignal::Dislike);
    }
}
