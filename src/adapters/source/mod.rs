//! Row sources
//!
//! Trait-based access to the query an export reads from, with an in-memory
//! implementation and a JSON-lines file implementation.

pub mod jsonl;
pub mod memory;
pub mod traits;

pub use jsonl::JsonLinesSource;
pub use memory::MemorySource;
pub use traits::RowSource;
