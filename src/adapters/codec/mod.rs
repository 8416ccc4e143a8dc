//! Row codecs
//!
//! Streaming writers and lazy readers for chunk and merged files.

pub mod csv;
pub mod traits;

pub use self::csv::CsvCodec;
pub use traits::{RowCodec, RowReader, RowWriter};
