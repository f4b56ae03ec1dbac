pub mod app;
pub mod concurrency;
pub mod config;
pub mod engine;
pub mod jobs;
pub mod permissions;
pub mod safe_outputs;
pub mod shared;
pub mod toolsets;
