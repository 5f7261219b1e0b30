pub mod fetch;
pub mod web;

pub use fetch::{FetchCoordinator, FetchTimeouts, WaitOutcome};
pub use web::{CrawlOptions, CrawlState, crawl};
