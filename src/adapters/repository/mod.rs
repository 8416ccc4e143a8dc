//! Export record persistence

pub mod json_file;
pub mod memory;
pub mod traits;

pub use json_file::JsonFileExportRepository;
pub use memory::MemoryExportRepository;
pub use traits::{update_export, ExportMutation, ExportRepository};
