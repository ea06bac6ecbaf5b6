pub mod analyze;
pub mod process;
pub mod schedule;
pub mod worker;
