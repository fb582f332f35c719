pub mod candidate;
pub mod profile;
pub mod recommendation;

pub use candidate::{
    normalize_tag_name, Candidate, CandidateTitle, FormatBucket, MediaFormat, RankedTag, YearBucket,
};
pub(crate) use candidate::{clamp, clamp01};
pub use profile::{
    FeedbackSignal, ProfileScore, ProfileUpdate, SessionRecord, SessionStep, UserProfile,
    PROFILE_EXPOSURE_LIMIT,
};
pub use recommendation::{
    FinalRecommendation, MmrDebugRow, MmrSelectionResult, ScoreBreakdown, ScoredFinalCandidate,
    SeedPreferenceVector, Step2DebugRow, Step2SelectionResult, TagVector,
};
