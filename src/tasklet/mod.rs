//! # Tasklet Module
//!
//! Tasklets are single-task operations that don't follow the chunk-oriented
//! processing pattern.

pub mod create_table;
