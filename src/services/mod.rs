pub mod aggregator;
pub mod genre_index;
pub mod matches;
pub mod recommender;
pub mod reviews;
pub mod scoring;
pub mod session;

pub use aggregator::CandidateAggregator;
pub use genre_index::GenreIndex;
pub use matches::MatchService;
pub use recommender::{NextBatch, Recommender, DEFAULT_PAGE_SIZE};
pub use reviews::{MovieReview, ReviewService};
pub use session::{Session, SessionKey, SessionManager};
