pub mod api;
pub mod database;
pub mod error;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod transform;


pub use error::{FetchError, LoadError, PipelineError, TransformError};
pub use models::{Config, DailyRecord, RawResponse, ResultSet};
