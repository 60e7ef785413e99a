pub mod backup;
pub mod core;
pub mod exchange;
pub mod grades;
pub mod report;
pub mod students;
