//! External service traits and their implementations.

pub mod rates;

pub use rates::{
    HttpRateProvider, InMemoryRateProvider, RateItem, RateProvider, RateRequest, quote,
};
