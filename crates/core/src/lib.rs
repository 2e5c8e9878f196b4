#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod scoring;
pub mod time;

pub use error::Error;
pub use scoring::{build_result, format_clock, score_answers, time_spent};
pub use time::Clock;
