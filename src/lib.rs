// Re-export modules
pub mod aggregate;
pub mod config;
pub mod crawlers;
pub mod error;
pub mod filter;
pub mod parsers;
pub mod renderer;
pub mod results;
pub mod service;
pub mod summarize;

// Re-export commonly used types for convenience
pub use config::ServiceConfig;
pub use crawlers::FetchCoordinator;
pub use error::{FetchError, RenderError, ServiceError};
pub use renderer::{Renderer, WebDriverRenderer};
pub use results::{CrawledPage, FetchRequest, FetchResult};
pub use service::MarkdownService;
