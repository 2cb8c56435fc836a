//! Student records store: SQLite-backed CRUD, CSV exchange, settings and
//! backups, plus the JSON-lines request router used by the `studentd` sidecar.

pub mod backup;
pub mod config;
pub mod db;
pub mod error;
pub mod exchange;
pub mod ipc;
pub mod logging;
pub mod model;
pub mod students;

pub use chrono::NaiveDate;
pub use error::{Result, StoreError};
pub use model::{Student, StudentInput, StudentPatch};
