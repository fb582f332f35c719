use chrono::Utc;
use std::collections::HashMap;

use crate::models::{
    clamp, clamp01, normalize_tag_name, Candidate, FeedbackSignal, ProfileScore, UserProfile,
    PROFILE_EXPOSURE_LIMIT,
};

pub const PROFILE_DECAY: f64 = 0.98;
pub const PROFILE_TAG_CAP: f64 = 24.0;
pub const PROFILE_VALUE_FLOOR: f64 = 0.02;
const LIKED_BONUS_WEIGHT: f64 = 0.18;
const DISLIKED_PENALTY_WEIGHT: f64 = 0.22;
const EXPOSURE_PENALTY: f64 = 0.08;
/// Share of a like's weight removed from the same tag's dislike weight
const LIKE_RELIEF: f64 = 0.5;
/// Share of a dislike's weight removed from the same tag's like weight
const DISLIKE_RELIEF: f64 = 0.35;
const PROFILE_TAG_LIMIT: usize = 18;
const DEFAULT_TAG_RANK: u8 = 35;
const MIN_TAG_WEIGHT: f64 = 0.12;

fn profile_tag_weights(candidate: &Candidate) -> Vec<(String, f64)> {
    let mut weights: Vec<(String, f64)> = Vec::new();
    for tag in candidate.sorted_tags().into_iter().take(PROFILE_TAG_LIMIT) {
        let key = normalize_tag_name(&tag.name);
        if key.is_empty() {
            continue;
        }
        let weight = clamp(
            f64::from(tag.rank.unwrap_or(DEFAULT_TAG_RANK)) / 100.0,
            MIN_TAG_WEIGHT,
            1.0,
        );
        match weights.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = weight,
            None => weights.push((key, weight)),
        }
    }
    weights
}

fn decay(map: &mut HashMap<String, f64>) {
    for weight in map.values_mut() {
        *weight *= PROFILE_DECAY;
    }
    prune(map);
}

fn prune(map: &mut HashMap<String, f64>) {
    map.retain(|_, weight| *weight >= PROFILE_VALUE_FLOOR);
}

/// Applies one like/dislike event
///
/// Both maps decay by 0.98 first, then the candidate's rank-weighted tags are
/// added to the matching map (capped at 24) and partly removed from the
/// opposite one. Entries below 0.02 are dropped.
pub fn update_profile_from_feedback(
    profile: &UserProfile,
    candidate: &Candidate,
    signal: FeedbackSignal,
) -> UserProfile {
    let mut next = profile.clone().normalized();
    decay(&mut next.liked_tags);
    decay(&mut next.disliked_tags);

    let (target, opposite, relief) = match signal {
        FeedbackSignal::Like => (&mut next.liked_tags, &mut next.disliked_tags, LIKE_RELIEF),
        FeedbackSignal::Dislike => (&mut next.disliked_tags, &mut next.liked_tags, DISLIKE_RELIEF),
    };
    for (tag, weight) in profile_tag_weights(candidate) {
        if let Some(existing) = opposite.get_mut(&tag) {
            *existing = (*existing - weight * relief).max(0.0);
        }
        let entry = target.entry(tag).or_insert(0.0);
        *entry = (*entry + weight).min(PROFILE_TAG_CAP);
    }

    prune(&mut next.liked_tags);
    prune(&mut next.disliked_tags);
    next.updated_at = Utc::now();
    next
}

/// Records a shown batch: each id moves to the end of the history, which
/// keeps only the most recent 300 entries
pub fn update_exposure_history(profile: &UserProfile, shown_ids: &[u64]) -> UserProfile {
    let mut next = profile.clone().normalized();
    for id in shown_ids {
        next.exposure_history.retain(|existing| existing != id);
        next.exposure_history.push(*id);
    }
    if next.exposure_history.len() > PROFILE_EXPOSURE_LIMIT {
        let excess = next.exposure_history.len() - PROFILE_EXPOSURE_LIMIT;
        next.exposure_history.drain(..excess);
    }
    next.updated_at = Utc::now();
    next
}

/// Liked/disliked overlap of a candidate's tags with the profile
pub fn score_with_profile(candidate: &Candidate, profile: &UserProfile) -> ProfileScore {
    let tags = profile_tag_weights(candidate);
    let total_tag_weight = tags.iter().map(|(_, weight)| weight).sum::<f64>().max(1.0);

    let mut liked_overlap = 0.0;
    let mut disliked_overlap = 0.0;
    let mut matched_liked_tags = Vec::new();
    let mut matched_disliked_tags = Vec::new();

    for (tag, weight) in tags {
        let liked = clamp01(profile.liked_tags.get(&tag).copied().unwrap_or(0.0) / PROFILE_TAG_CAP);
        let disliked =
            clamp01(profile.disliked_tags.get(&tag).copied().unwrap_or(0.0) / PROFILE_TAG_CAP);
        liked_overlap += weight * liked;
        disliked_overlap += weight * disliked;
        if liked > 0.0 {
            matched_liked_tags.push(tag.clone());
        }
        if disliked > 0.0 {
            matched_disliked_tags.push(tag);
        }
    }

    let bonus = clamp01(liked_overlap / total_tag_weight) * LIKED_BONUS_WEIGHT;
    let penalty = clamp01(disliked_overlap / total_tag_weight) * DISLIKED_PENALTY_WEIGHT;
    let exposure_penalty = if profile.exposure_history.contains(&candidate.id) {
        EXPOSURE_PENALTY
    } else {
        0.0
    };

    ProfileScore {
        bonus,
        penalty,
        exposure_penalty,
        total: bonus - penalty - exposure_penalty,
        matched_liked_tags,
        matched_disliked_tags,
    }
}

fn top_tags(map: &HashMap<String, f64>, limit: usize) -> Vec<String> {
    let mut entries: Vec<(&String, &f64)> = map.iter().collect();
    entries.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));
    entries.into_iter().take(limit).map(|(tag, _)| tag.clone()).collect()
}

pub(crate) fn top_liked_tags(profile: &UserProfile, limit: usize) -> Vec<String> {
    top_tags(&profile.liked_tags, limit)
}

pub(crate) fn top_disliked_tags(profile: &UserProfile, limit: usize) -> Vec<String> {
    top_tags(&profile.disliked_tags, limit)
}
