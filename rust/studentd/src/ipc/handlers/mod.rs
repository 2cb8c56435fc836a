pub mod backup;
pub mod core;
pub mod exchange;
pub mod settings;
pub mod students;
