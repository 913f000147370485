pub mod backup;
pub mod core;
pub mod curriculum;
pub mod marks;
pub mod policy;
pub mod results;
pub mod students;
