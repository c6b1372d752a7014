//! Bulk upload orchestration.
//!
//! Each orchestrator reads stored spreadsheet files, turns rows into upload
//! tasks, and keeps the bulk record's status, progress and log current while
//! it works. Input problems end the job as FAILED; they never bubble up as
//! errors to the worker.

pub mod gar;
pub mod gld;
pub mod gmn;
pub mod table;

pub use gar::GarBulkUploader;
pub use gld::GldBulkUploader;
pub use gmn::GmnBulkUploader;
pub use table::Table;
