pub mod feed;
pub mod filter;
pub mod pipeline;

pub use feed::run_feed_listener;
pub use filter::should_admit;
pub use pipeline::{run_pipeline, Pipeline};
