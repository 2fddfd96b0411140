pub mod config;
pub mod dedup;
pub mod error;
pub mod io;
pub mod keywords;
pub mod paths;
pub mod pipeline;
pub mod platform;
pub mod present;
pub mod recent;
pub mod review;
pub mod score;
pub mod search;
pub mod sources;
pub mod task;
pub mod types;
pub mod validate;

pub use error::{Result, TriageError};
