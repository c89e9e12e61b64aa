pub mod attendance;
pub mod backup;
pub mod core;
pub mod reports;
pub mod students;
