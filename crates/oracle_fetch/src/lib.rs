pub mod aggregate;
pub mod bills;
pub mod cache;
pub mod ckan;
pub mod connector;
pub mod error;
pub mod http;
pub mod rss;

pub use aggregate::{Aggregator, SnapshotSource};
pub use cache::SnapshotCache;
pub use connector::{Connector, Fetched};
pub use error::FetchError;
