//! Shared types for the order fulfillment pipeline.

mod types;

pub use types::{OrderId, ParseOrderIdError};
