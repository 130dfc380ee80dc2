pub mod config;
pub mod customer_api;
pub mod error;
pub mod model;
pub mod parser;
pub mod schedule_api;
pub mod storage;

pub use parser::{parse_schedule, parse_schedule_on};
