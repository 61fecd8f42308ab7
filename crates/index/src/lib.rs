//! Queries against the log analytics index.
//!
//! Log records are also shipped to an Elasticsearch-compatible index. This
//! crate builds the aggregation and search bodies the reports need
//! ([`query`]), sends them ([`IndexClient`]), and reads the answers back
//! into typed buckets and hits ([`response`]). Large result sets are walked
//! with [`search_all`].

mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod paginate;
pub mod query;
pub mod response;

pub use crate::client::{IndexClient, Search};
pub use crate::paginate::search_all;
pub use crate::query::TimeRange;
