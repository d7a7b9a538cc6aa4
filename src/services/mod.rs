//! Service layer
//!
//! Each service receives its store/cache handles at construction; none of
//! them reads process-wide state.

pub mod click_recorder;
pub mod link_service;
pub mod profile;
pub mod rate_limiter;
pub mod resolver;
pub mod stats;

pub use click_recorder::{ClickJob, ClickRecorder, ClickRecorderStats};
pub use link_service::{CreateLinkRequest, LinkService, UpdateLinkRequest};
pub use profile::ProfileCache;
pub use rate_limiter::{Admission, RateLimiter};
pub use resolver::Resolver;
pub use stats::StatsAggregator;
