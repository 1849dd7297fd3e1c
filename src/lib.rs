pub mod capture;
pub mod config;
pub mod extractor;
pub mod media;
pub mod pipeline;
pub mod ratelimit;
pub mod sink;
