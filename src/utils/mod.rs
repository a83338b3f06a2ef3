//! Utility functions for file I/O, logging and progress tracking

pub mod io;
pub mod logging;

pub use io::{read_csv, read_parquet, validate_file, write_parquet};
pub use logging::{create_progress_bar, log_operation_complete, log_operation_start};
