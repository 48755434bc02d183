pub mod decimal;
pub mod logger;
pub mod monitoring;
pub mod recommendations;
pub mod scorer;

pub use logger::{LogSummary, LogWriteFailure, RecommendationLogger};
pub use recommendations::{serve_recommendations, RequestPhase};
pub use scorer::{ScoredRecommendations, Scorer};
