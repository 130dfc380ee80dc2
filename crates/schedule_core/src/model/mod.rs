mod customer;
mod schedule;

pub use customer::Customer;
pub use schedule::{ParsedSchedule, Schedule, ScheduleStatus};
