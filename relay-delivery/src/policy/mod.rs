//! Policy abstractions for delivery operations.
//!
//! ## Policies
//!
//! - [`retry::RetryPlan`] / [`retry::get_retry_plan`]: fixed per-priority retry table

pub mod retry;

pub use retry::{get_retry_plan, RetryPlan};
