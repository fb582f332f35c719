//! Recommendation engine
//!
//! Everything below `recommendations` is pure and synchronous: candidates in,
//! scored and selected candidates out. `recommendations` wires the steps
//! together and talks to the profile store.

pub mod category;
pub mod diversity;
pub mod franchise;
pub mod mmr;
pub mod preference;
pub mod profile;
pub mod quality;
pub mod recommendations;
pub mod scoring;
pub mod semantic;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use category::{discovery_presets, filter_by_category, is_category_aligned, Category, DiscoveryPlan};
pub use diversity::{select_step2_diverse_candidates, Step2Options};
pub use franchise::{dedupe_by_franchise, franchise_key};
pub use mmr::{pick_final_recommendations, select_final_with_mmr, MmrOptions};
pub use preference::build_seed_preference_vector;
pub use profile::{score_with_profile, update_exposure_history, update_profile_from_feedback};
pub use recommendations::{browse, recommend, RecommendRequest, RecommendationOutcome};
pub use scoring::{score_final_candidate, ScoringContext};
pub use semantic::build_semantic_similarity_map;
