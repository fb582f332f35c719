use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::models::{Candidate, FeedbackSignal, SessionRecord, SessionStep, Step2SelectionResult, UserProfile};
use crate::services::category::DiscoveryPlan;
use crate::services::recommendations::{
    self, load_profile, record_exposure, record_feedback, record_session_step, RecommendRequest,
    RecommendationOutcome,
};

use super::AppState;

// Request types

#[derive(Debug, Deserialize)]
pub struct PresetQuery {
    /// Comma separated genres used when the category is unknown
    pub genres: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BrowseRequest {
    pub user_id: Option<String>,
    pub category_id: Option<String>,
    pub total: Option<usize>,
    pub pool: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub user_id: Option<String>,
    pub category_id: Option<String>,
    pub seeds: Vec<Candidate>,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub candidate: Candidate,
    pub signal: FeedbackSignal,
}

#[derive(Debug, Deserialize)]
pub struct SessionStepRequest {
    pub category: String,
    pub step: SessionStep,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Discovery presets and pool thresholds for a category
pub async fn get_category_presets(
    Path(category_id): Path<String>,
    Query(query): Query<PresetQuery>,
) -> Json<DiscoveryPlan> {
    let fallback_genres: Vec<String> = query
        .genres
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|genre| !genre.is_empty())
        .map(str::to_string)
        .collect();

    Json(DiscoveryPlan::for_category(&category_id, &fallback_genres))
}

/// Selects a diverse browse batch and records it as shown
pub async fn browse(
    State(state): State<AppState>,
    Json(request): Json<BrowseRequest>,
) -> AppResult<Json<Step2SelectionResult>> {
    let total = request.total.unwrap_or(state.settings.browse_total);
    if total == 0 {
        return Err(AppError::InvalidInput("total must be positive".to_string()));
    }

    let exposure = match request.user_id.as_deref() {
        Some(user_id) => load_profile(state.store.as_ref(), user_id).await?.exposure_history,
        None => Vec::new(),
    };

    let result = recommendations::browse(request.category_id.as_deref(), request.pool, total, &exposure);

    if let Some(user_id) = request.user_id.as_deref() {
        let shown: Vec<u64> = result.selected.iter().map(|candidate| candidate.id).collect();
        record_exposure(state.store.as_ref(), user_id, &shown).await?;
    }

    Ok(Json(result))
}

/// Final explained recommendations, recorded as shown
pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationOutcome>> {
    if request.seeds.is_empty() {
        return Err(AppError::InvalidInput("at least one seed is required".to_string()));
    }

    let profile = match request.user_id.as_deref() {
        Some(user_id) => Some(load_profile(state.store.as_ref(), user_id).await?),
        None => None,
    };

    let outcome = recommendations::recommend(RecommendRequest {
        seeds: &request.seeds,
        candidates: request.candidates,
        category_id: request.category_id.as_deref(),
        profile: profile.as_ref(),
        settings: &state.settings,
    });

    if let Some(user_id) = request.user_id.as_deref() {
        let shown: Vec<u64> = outcome
            .recommendations
            .iter()
            .map(|item| item.candidate.id)
            .collect();
        record_exposure(state.store.as_ref(), user_id, &shown).await?;
    }

    Ok(Json(outcome))
}

/// Applies a like/dislike to the user's profile
pub async fn submit_feedback(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<FeedbackRequest>,
) -> AppResult<Json<UserProfile>> {
    let profile = record_feedback(state.store.as_ref(), &user_id, &request.candidate, request.signal).await?;
    Ok(Json(profile))
}

/// Get a user's profile, empty when unknown
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(load_profile(state.store.as_ref(), &user_id).await?))
}

/// Records one step of a browsing session
pub async fn append_session_step(
    State(state): State<AppState>,
    Path((user_id, session_id)): Path<(String, String)>,
    Json(request): Json<SessionStepRequest>,
) -> AppResult<StatusCode> {
    record_session_step(
        state.store.as_ref(),
        &user_id,
        &session_id,
        &request.category,
        request.step,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get a stored browsing session
pub async fn get_session(
    State(state): State<AppState>,
    Path((user_id, session_id)): Path<(String, String)>,
) -> AppResult<Json<SessionRecord>> {
    state
        .store
        .read_session(&user_id, &session_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("session {} of user {}", session_id, user_id)))
}
