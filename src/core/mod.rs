//! Core utilities: errors, rate limiting, sessions, validation, formatting

pub mod error;
pub mod format;
pub mod rate_limiter;
pub mod session;
pub mod validation;

pub use error::{AppError, AppResult};
pub use rate_limiter::{RateDecision, RateLimiter};
pub use session::{DownloadKind, SessionStore, UserSession, WorkflowState};
