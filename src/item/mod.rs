/// This module provides a CSV item reader.
pub mod csv;

/// This module provides an RDBC (SQLite) item writer.
pub mod rdbc;
