//! Data types carried in property payloads

pub mod time_value;

pub use time_value::{TimeValue, TIME_VALUE_LENGTH};
