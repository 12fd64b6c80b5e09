//! Request middleware.

pub mod ai_rate_limit;

pub use ai_rate_limit::ai_rate_limit;
