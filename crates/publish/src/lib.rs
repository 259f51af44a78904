pub mod communities;
pub mod issues;
pub mod paths;
pub mod posts;
pub mod report;
pub mod store;

pub use paths::DataPaths;
