use serde::Serialize;
use std::collections::HashSet;

use crate::config::EngineSettings;
use crate::db::ProfileStore;
use crate::error::{AppError, AppResult};
use crate::models::{
    Candidate, FeedbackSignal, FinalRecommendation, MmrDebugRow, ProfileUpdate, SessionRecord,
    SessionStep, Step2SelectionResult, UserProfile,
};
use crate::services::category::filter_by_category;
use crate::services::diversity::{select_step2_diverse_candidates, Step2Options};
use crate::services::franchise::{dedupe_by_franchise, franchise_key};
use crate::services::mmr::{pick_final_recommendations, select_final_with_mmr, MmrOptions};
use crate::services::preference::{build_seed_preference_vector, top_preference_tags};
use crate::services::profile::{
    top_disliked_tags, top_liked_tags, update_exposure_history, update_profile_from_feedback,
};
use crate::services::scoring::{score_candidates, ScoringContext};
use crate::services::semantic::build_semantic_similarity_map;

const PREFERENCE_TAG_LIMIT: usize = 8;

/// Inputs of one final recommendation request
pub struct RecommendRequest<'a> {
    pub seeds: &'a [Candidate],
    pub candidates: Vec<Candidate>,
    pub category_id: Option<&'a str>,
    pub profile: Option<&'a UserProfile>,
    pub settings: &'a EngineSettings,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationOutcome {
    pub recommendations: Vec<FinalRecommendation>,
    pub mmr_debug: Vec<MmrDebugRow>,
    /// Strongest tags of the seed preference vector
    pub preference_tags: Vec<String>,
    /// Candidates left after seed removal, category guard and franchise collapse
    pub pool_size: usize,
}

fn dedupe_by_id(pool: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    pool.into_iter().filter(|candidate| seen.insert(candidate.id)).collect()
}

fn guard_category(category_id: Option<&str>, pool: Vec<Candidate>) -> Vec<Candidate> {
    match category_id {
        Some(category_id) => filter_by_category(category_id, pool),
        None => pool,
    }
}

/// Diverse browse batch from a discovery pool
pub fn browse(
    category_id: Option<&str>,
    pool: Vec<Candidate>,
    total: usize,
    exposure_history: &[u64],
) -> Step2SelectionResult {
    let incoming = pool.len();
    let pool = guard_category(category_id, dedupe_by_id(pool));
    let options = Step2Options {
        total,
        franchise_key: &franchise_key,
        exposure_history,
    };
    let result = select_step2_diverse_candidates(&pool, &options);

    tracing::info!(
        category = category_id.unwrap_or("any"),
        incoming,
        eligible = pool.len(),
        selected = result.selected.len(),
        "Browse batch selected"
    );

    result
}

/// Final explained recommendations for a set of liked seeds
pub fn recommend(request: RecommendRequest<'_>) -> RecommendationOutcome {
    let seed_ids: HashSet<u64> = request.seeds.iter().map(|seed| seed.id).collect();
    let pool: Vec<Candidate> = dedupe_by_id(request.candidates)
        .into_iter()
        .filter(|candidate| !seed_ids.contains(&candidate.id))
        .collect();
    let pool = guard_category(request.category_id, pool);
    let pool = dedupe_by_franchise(pool, franchise_key);

    let preference = build_seed_preference_vector(request.seeds);
    let semantic = build_semantic_similarity_map(request.seeds, &pool);
    let mut context = ScoringContext::new(&preference).with_semantic(&semantic);
    if let Some(profile) = request.profile {
        context = context.with_profile(profile);
    }

    let scored = score_candidates(&pool, &context);
    let options = MmrOptions {
        lambda: request.settings.mmr_lambda,
        top_n: request.settings.mmr_top_n,
        ..MmrOptions::new(&franchise_key)
    };
    let mmr = select_final_with_mmr(&scored, &options);
    let finals = pick_final_recommendations(&scored, &mmr, &franchise_key, request.settings.final_count);

    tracing::info!(
        seeds = request.seeds.len(),
        pool = pool.len(),
        mmr_picks = mmr.selected.len(),
        recommended = finals.len(),
        with_profile = request.profile.is_some(),
        "Final recommendations selected"
    );

    RecommendationOutcome {
        recommendations: finals.into_iter().map(FinalRecommendation::from).collect(),
        mmr_debug: mmr.debug_rows,
        preference_tags: top_preference_tags(&preference, PREFERENCE_TAG_LIMIT),
        pool_size: pool.len(),
    }
}

fn require_user_id(user_id: &str) -> AppResult<&str> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput("user id must not be empty".to_string()));
    }
    Ok(trimmed)
}

/// Stored profile, or an empty one for unknown users
pub async fn load_profile(store: &dyn ProfileStore, user_id: &str) -> AppResult<UserProfile> {
    let user_id = require_user_id(user_id)?;
    Ok(store.read_profile(user_id).await?.unwrap_or_default())
}

/// Applies a like/dislike and persists the tag maps
pub async fn record_feedback(
    store: &dyn ProfileStore,
    user_id: &str,
    candidate: &Candidate,
    signal: FeedbackSignal,
) -> AppResult<UserProfile> {
    let current = load_profile(store, user_id).await?;
    let updated = update_profile_from_feedback(&current, candidate, signal);
    let stored = store
        .write_profile(user_id.trim(), ProfileUpdate::tags_of(&updated))
        .await?;

    tracing::info!(
        user_id = %user_id,
        candidate_id = candidate.id,
        signal = ?signal,
        top_liked = ?top_liked_tags(&stored, 3),
        top_disliked = ?top_disliked_tags(&stored, 3),
        "Feedback recorded"
    );

    Ok(stored)
}

/// Appends shown ids to the exposure history and persists it
pub async fn record_exposure(
    store: &dyn ProfileStore,
    user_id: &str,
    shown_ids: &[u64],
) -> AppResult<UserProfile> {
    let current = load_profile(store, user_id).await?;
    if shown_ids.is_empty() {
        return Ok(current);
    }
    let updated = update_exposure_history(&current, shown_ids);
    let stored = store
        .write_profile(user_id.trim(), ProfileUpdate::exposure_of(&updated))
        .await?;

    tracing::debug!(
        user_id = %user_id,
        shown = shown_ids.len(),
        history = stored.exposure_history.len(),
        "Exposure recorded"
    );

    Ok(stored)
}

/// Records one browsing session step
pub async fn record_session_step(
    store: &dyn ProfileStore,
    user_id: &str,
    session_id: &str,
    category: &str,
    step: SessionStep,
) -> AppResult<SessionRecord> {
    let user_id = require_user_id(user_id)?;
    if session_id.trim().is_empty() {
        return Err(AppError::InvalidInput("session id must not be empty".to_string()));
    }
    store
        .append_session_step(user_id, session_id.trim(), category, step)
        .await
}
